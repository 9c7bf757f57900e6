//! The HTTP capability both components depend on.
//!
//! # Design
//! `Transport::send` resolves once the response head has arrived and hands
//! back an `Exchange`. The exchange delivers the body as chunks in arrival
//! order; end of stream and errors come through the same `next_chunk` call.
//! Cancelling drops the body stream, which releases the connection. It is a
//! request, not a guarantee that no bytes were in flight, so the streaming
//! engine gates on its own terminal state rather than on the transport.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::TransportError;
use crate::http::{HttpRequest, ResponseEnvelope};

/// Response body as delivered by the transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Issues a JSON `POST` and returns the in-flight exchange.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<Exchange, TransportError>> + Send;
}

/// One in-flight request/response cycle after the response head arrived.
pub struct Exchange {
    envelope: ResponseEnvelope,
    // `None` once the body ended, failed, or was cancelled.
    body: Option<BodyStream>,
}

impl Exchange {
    pub fn new(envelope: ResponseEnvelope, body: BodyStream) -> Self {
        Self {
            envelope,
            body: Some(body),
        }
    }

    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    pub fn is_open(&self) -> bool {
        self.body.is_some()
    }

    /// Next body chunk; `None` once the stream is finished or cancelled.
    ///
    /// Cancel-safe: dropping the returned future loses no chunk.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, TransportError>> {
        let body = self.body.as_mut()?;
        let item = body.next().await;
        if !matches!(item, Some(Ok(_))) {
            self.body = None;
        }
        item
    }

    /// Abandon the exchange. Returns `false` if it had already finished or
    /// been cancelled, in which case nothing happens.
    pub fn cancel(&mut self) -> bool {
        self.body.take().is_some()
    }

    /// Buffer the remaining body.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("envelope", &self.envelope)
            .field("open", &self.is_open())
            .finish()
    }
}

/// `Transport` over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::build(reqwest::Client::builder())
    }

    /// Bound only the connect phase; a whole-request timeout would cut
    /// streaming bodies short.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::build(reqwest::Client::builder().connect_timeout(timeout))
    }

    fn build(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Exchange, TransportError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.body(request.body).send().await?;

        let envelope = ResponseEnvelope::new(
            response.status().as_u16(),
            response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned())),
        );
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string())));
        Ok(Exchange::new(envelope, Box::pin(body)))
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! Channel-fed transport for driving the components in unit tests.

    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    pub(crate) type ChunkSender = mpsc::UnboundedSender<Result<Bytes, TransportError>>;

    pub(crate) struct ScriptedTransport {
        outcome: Mutex<Option<Result<Exchange, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
        connect_delay: Option<Duration>,
    }

    impl ScriptedTransport {
        /// A transport whose body is fed through the returned sender. The
        /// sender reports `is_closed()` once the exchange is cancelled.
        pub(crate) fn streaming(status: u16) -> (Self, ChunkSender) {
            let (tx, rx) = mpsc::unbounded_channel();
            let body = futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            let envelope = ResponseEnvelope::new(status, [("content-type", "text/event-stream")]);
            let exchange = Exchange::new(envelope, Box::pin(body));
            (Self::with_outcome(Ok(exchange)), tx)
        }

        pub(crate) fn failing(err: TransportError) -> Self {
            Self::with_outcome(Err(err))
        }

        pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
            self.connect_delay = Some(delay);
            self
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn with_outcome(outcome: Result<Exchange, TransportError>) -> Self {
            Self {
                outcome: Mutex::new(Some(outcome)),
                requests: Mutex::new(Vec::new()),
                connect_delay: None,
            }
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<Exchange, TransportError> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.connect_delay {
                tokio::time::sleep(delay).await;
            }
            let outcome = self.outcome.lock().unwrap().take();
            outcome.unwrap_or_else(|| Err(TransportError::Request("script exhausted".to_string())))
        }
    }
}
