use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub echo: String,
}

/// One body chunk, written after `delay`.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub delay: Duration,
    pub chunk: String,
}

/// What the streaming endpoints write, chunk by chunk.
#[derive(Debug, Clone, Default)]
pub struct StreamScript {
    pub steps: Vec<ScriptStep>,
    /// Keep the response open after the last chunk instead of ending it.
    pub hold_open: bool,
}

impl StreamScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk(mut self, delay: Duration, chunk: impl Into<String>) -> Self {
        self.steps.push(ScriptStep {
            delay,
            chunk: chunk.into(),
        });
        self
    }

    /// Each line as its own immediate chunk, newline-terminated.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .fold(Self::new(), |script, line| script.chunk(Duration::ZERO, format!("{}\n", line.as_ref())))
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// A status event, three message events one second apart, then a
    /// completion event.
    pub fn sse_demo() -> Self {
        let mut script = Self::new().chunk(
            Duration::ZERO,
            "event: status\ndata: {\"status\": \"success\", \"message\": \"Stream started\"}\n\n",
        );
        for part in 1..=3 {
            script = script.chunk(
                Duration::from_secs(1),
                format!("event: message\ndata: {{\"content\": \"Stream response part {part}\"}}\n\n"),
            );
        }
        script.chunk(
            Duration::ZERO,
            "event: complete\ndata: {\"status\": \"success\", \"message\": \"Stream completed\"}\n\n",
        )
    }
}

pub fn app() -> Router {
    app_with(StreamScript::sse_demo())
}

pub fn app_with(script: StreamScript) -> Router {
    Router::new()
        .route("/health/chat/physical", post(physical_chat))
        .route("/health/chat/text", post(text_chat))
        .route("/health/chat/physical/stream", post(chat_stream))
        .route("/health/chat/text/stream", post(chat_stream))
        .with_state(Arc::new(script))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, StreamScript::sse_demo()).await
}

pub async fn run_with(listener: TcpListener, script: StreamScript) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(script)).await
}

async fn physical_chat(Json(input): Json<ChatRequest>) -> Json<ChatReply> {
    tracing::debug!(message = %input.message, "physical chat");
    Json(ChatReply {
        reply: "ok".to_string(),
        echo: input.message,
    })
}

async fn text_chat(Json(input): Json<ChatRequest>) -> String {
    tracing::debug!(message = %input.message, "text chat");
    format!("Processing text chat request: {}", input.message)
}

async fn chat_stream(State(script): State<Arc<StreamScript>>, Json(input): Json<ChatRequest>) -> Response {
    tracing::debug!(message = %input.message, chunks = script.steps.len(), "chat stream");
    let chunks = stream::iter(script.steps.clone()).then(|step| async move {
        tokio::time::sleep(step.delay).await;
        Ok::<_, Infallible>(Bytes::from(step.chunk))
    });
    let body = if script.hold_open {
        chunks.chain(stream::pending()).boxed()
    } else {
        chunks.boxed()
    };
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
