//! Verify line decoding and cutoff behavior against `test-vectors/streams.json`.
//!
//! Each vector lists the chunks a transport delivers, whether the stream then
//! ends or stays open, and the lines and terminal outcome the engine must
//! produce. Every case is checked twice: through `LineDecoder` alone (for
//! cases without a cutoff) and through `StreamingEngine` on a paused clock.

use std::time::Duration;

use bytes::Bytes;
use chat_probe_core::transport::BodyStream;
use chat_probe_core::{
    ChatPayload, CutoffPolicy, Endpoint, Exchange, HttpRequest, LineDecoder, RecordingObserver,
    ResponseEnvelope, StreamOutcome, StreamingEngine, TextEncoding, Transport, TransportError,
};
use futures::{stream, StreamExt};

/// Serves one fixed chunk sequence per request.
struct VectorTransport {
    chunks: Vec<String>,
    hold_open: bool,
}

impl Transport for VectorTransport {
    async fn send(&self, _request: HttpRequest) -> Result<Exchange, TransportError> {
        let chunks = stream::iter(self.chunks.clone()).map(|chunk| Ok::<_, TransportError>(Bytes::from(chunk)));
        let body: BodyStream = if self.hold_open {
            Box::pin(chunks.chain(stream::pending()))
        } else {
            Box::pin(chunks)
        };
        let envelope = ResponseEnvelope::new(200, [("content-type", "text/event-stream")]);
        Ok(Exchange::new(envelope, body))
    }
}

/// Parse the outcome string from test vectors into `StreamOutcome`.
fn parse_outcome(s: &str) -> StreamOutcome {
    match s {
        "completed" => StreamOutcome::CompletedNormally,
        "cutoff_count" => StreamOutcome::CutoffCount,
        "cutoff_timeout" => StreamOutcome::CutoffTimeout,
        other => panic!("unknown outcome: {other}"),
    }
}

fn strings(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn load() -> serde_json::Value {
    let raw = include_str!("../../test-vectors/streams.json");
    serde_json::from_str(raw).unwrap()
}

#[test]
fn decoder_matches_completed_vectors() {
    let vectors = load();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        if parse_outcome(case["expected_outcome"].as_str().unwrap()) != StreamOutcome::CompletedNormally {
            continue;
        }

        let mut decoder = LineDecoder::new(TextEncoding::Utf8);
        let mut lines = Vec::new();
        for chunk in strings(&case["chunks"]) {
            decoder.push(chunk.as_bytes());
            lines.extend(std::iter::from_fn(|| decoder.next_line()));
        }
        decoder.close();
        lines.extend(std::iter::from_fn(|| decoder.next_line()));

        assert_eq!(lines, strings(&case["expected_lines"]), "{name}: lines");
    }
}

#[tokio::test(start_paused = true)]
async fn engine_matches_all_vectors() {
    let vectors = load();
    let endpoint = Endpoint::new("localhost", 5000, "/health/chat/text/stream").unwrap();
    let payload = ChatPayload::new("test");

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let transport = VectorTransport {
            chunks: strings(&case["chunks"]),
            hold_open: case["hold_open"].as_bool().unwrap(),
        };
        let max_lines = case["max_lines"].as_u64().unwrap() as usize;
        let policy = CutoffPolicy::new(max_lines, Duration::from_secs(2)).unwrap();
        let mut engine = StreamingEngine::new(transport, policy);
        let mut observer = RecordingObserver::new();

        let report = engine.execute(&endpoint, &payload, &mut observer).await.unwrap();

        let emitted: Vec<String> = observer
            .lines()
            .iter()
            .filter_map(|line| line.strip_prefix("received: "))
            .map(str::to_string)
            .collect();
        let expected_lines = strings(&case["expected_lines"]);
        assert_eq!(emitted, expected_lines, "{name}: lines");
        assert_eq!(report.lines, expected_lines.len(), "{name}: count");
        assert_eq!(
            report.outcome,
            parse_outcome(case["expected_outcome"].as_str().unwrap()),
            "{name}: outcome"
        );
        assert_eq!(
            report.cancelled,
            report.outcome != StreamOutcome::CompletedNormally,
            "{name}: cancelled"
        );
    }
}
