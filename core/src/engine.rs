//! Streaming consumption of an open-ended chat response.
//!
//! # Design
//! One `execute` call owns one exchange from connect to terminal state:
//!
//! ```text
//! Idle -> Connecting -> Streaming -> CompletedNormally | CutoffCount | CutoffTimeout | Failed
//! ```
//!
//! The deadline is armed when connecting starts and raced against the
//! transport in a single `select!`, so it fires even when no chunk ever
//! arrives. Data is polled first; each chunk is fed through a `LineDecoder`
//! and its lines are emitted until the count limit is hit, then the policy
//! is evaluated (count before time). Once a limit fires the loop stops
//! polling and the exchange is cancelled, so chunks already buffered by the
//! transport are never looked at.
//!
//! `execute` takes `&mut self`: a second exchange on the same engine cannot
//! start until the first has reached a terminal state.

use std::fmt;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::decoder::{LineDecoder, TextEncoding};
use crate::error::{ProbeError, TransportError};
use crate::http::{Endpoint, HttpRequest, ResponseEnvelope};
use crate::observer::{emit_envelope, Observer, SEPARATOR};
use crate::policy::{Cutoff, CutoffPolicy};
use crate::transport::Transport;
use crate::types::ChatPayload;

/// How a streaming exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The service closed the stream before any limit fired.
    CompletedNormally,
    CutoffCount,
    CutoffTimeout,
    Failed(TransportError),
}

impl StreamOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamOutcome::Failed(_))
    }
}

impl From<Cutoff> for StreamOutcome {
    fn from(cutoff: Cutoff) -> Self {
        match cutoff {
            Cutoff::Count => StreamOutcome::CutoffCount,
            Cutoff::Timeout => StreamOutcome::CutoffTimeout,
        }
    }
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOutcome::CompletedNormally => f.write_str("completed"),
            StreamOutcome::CutoffCount => f.write_str("line limit reached"),
            StreamOutcome::CutoffTimeout => f.write_str("time limit reached"),
            StreamOutcome::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Lifecycle state of the engine's current (or last) exchange.
///
/// `execute` borrows the engine mutably for the whole exchange, so callers
/// only ever observe `Idle` or `Finished`; `Connecting` and `Streaming` are
/// visible to the engine itself and in its `debug!` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Connecting,
    Streaming,
    Finished(StreamOutcome),
}

/// Summary of one streaming exchange.
#[derive(Debug, Clone)]
pub struct StreamReport {
    pub exchange_id: Uuid,
    pub outcome: StreamOutcome,
    /// `None` when the exchange ended before the response head arrived.
    pub envelope: Option<ResponseEnvelope>,
    pub lines: usize,
    pub elapsed: Duration,
    /// Whether the engine cancelled a still-open exchange.
    pub cancelled: bool,
}

/// Consumes a streamed response under a `CutoffPolicy`.
pub struct StreamingEngine<T> {
    transport: T,
    policy: CutoffPolicy,
    encoding: TextEncoding,
    state: EngineState,
}

impl<T: Transport> StreamingEngine<T> {
    pub fn new(transport: T, policy: CutoffPolicy) -> Self {
        Self {
            transport,
            policy,
            encoding: TextEncoding::default(),
            state: EngineState::Idle,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// `Idle` before the first exchange, `Finished` after each one.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn policy(&self) -> &CutoffPolicy {
        &self.policy
    }

    /// Run one streaming exchange to a terminal state.
    ///
    /// Transport failures are reported through the observer and returned as
    /// `StreamOutcome::Failed`; only a payload that cannot be serialized is
    /// an `Err`.
    pub async fn execute<O: Observer + ?Sized>(
        &mut self,
        endpoint: &Endpoint,
        payload: &ChatPayload,
        observer: &mut O,
    ) -> Result<StreamReport, ProbeError> {
        let request = HttpRequest::json(endpoint, payload)?;
        let exchange_id = Uuid::new_v4();
        let span = tracing::info_span!("stream_exchange", %exchange_id, url = %endpoint);
        Ok(self.run(exchange_id, request, observer).instrument(span).await)
    }

    async fn run<O: Observer + ?Sized>(
        &mut self,
        exchange_id: Uuid,
        request: HttpRequest,
        observer: &mut O,
    ) -> StreamReport {
        observer.emit(&format!("connecting to stream {}", request.url));
        observer.emit(&format!("request payload: {}", request.body));

        let started = Instant::now();
        let deadline = started + self.policy.timeout();
        self.state = EngineState::Connecting;
        debug!(timeout_ms = millis(self.policy.timeout()), "connecting");

        let connected = tokio::select! {
            biased;
            result = self.transport.send(request) => Some(result),
            () = sleep_until(deadline) => None,
        };
        let mut exchange = match connected {
            Some(Ok(exchange)) => exchange,
            Some(Err(err)) => {
                let tally = Tally::default();
                return self.finish(exchange_id, started, tally, StreamOutcome::Failed(err), observer);
            }
            None => {
                let tally = Tally::default();
                return self.finish(exchange_id, started, tally, StreamOutcome::CutoffTimeout, observer);
            }
        };

        self.state = EngineState::Streaming;
        let envelope = exchange.envelope().clone();
        debug!(status = envelope.status, "streaming");
        emit_envelope(observer, &envelope);
        observer.emit(SEPARATOR);

        let mut decoder = LineDecoder::new(self.encoding);
        let mut lines = 0usize;
        let outcome = loop {
            tokio::select! {
                biased;
                next = exchange.next_chunk() => match next {
                    Some(Ok(chunk)) => {
                        decoder.push(&chunk);
                        if let Some(cutoff) = self.drain(&mut decoder, &mut lines, observer) {
                            break cutoff.into();
                        }
                        if let Some(cutoff) = self.policy.evaluate(lines, started.elapsed()) {
                            break cutoff.into();
                        }
                    }
                    Some(Err(err)) => break StreamOutcome::Failed(err),
                    None => {
                        decoder.close();
                        break self
                            .drain(&mut decoder, &mut lines, observer)
                            .map_or(StreamOutcome::CompletedNormally, Into::into);
                    }
                },
                () = sleep_until(deadline) => break StreamOutcome::CutoffTimeout,
            }
        };

        let cancelled = exchange.cancel();
        let tally = Tally {
            envelope: Some(envelope),
            lines,
            cancelled,
        };
        self.finish(exchange_id, started, tally, outcome, observer)
    }

    /// Emit decoded lines until the decoder is empty or the count limit hits.
    fn drain<O: Observer + ?Sized>(
        &self,
        decoder: &mut LineDecoder,
        lines: &mut usize,
        observer: &mut O,
    ) -> Option<Cutoff> {
        while let Some(line) = decoder.next_line() {
            observer.emit(&format!("received: {line}"));
            *lines += 1;
            if self.policy.count_reached(*lines) {
                return Some(Cutoff::Count);
            }
        }
        None
    }

    fn finish<O: Observer + ?Sized>(
        &mut self,
        exchange_id: Uuid,
        started: Instant,
        tally: Tally,
        outcome: StreamOutcome,
        observer: &mut O,
    ) -> StreamReport {
        let elapsed = started.elapsed();
        match &outcome {
            StreamOutcome::CompletedNormally => observer.emit("stream closed by server"),
            StreamOutcome::CutoffCount => observer.emit(&format!(
                "line limit of {} reached, ending test",
                self.policy.max_lines()
            )),
            StreamOutcome::CutoffTimeout => observer.emit(&format!(
                "time limit of {}ms reached, ending test",
                self.policy.timeout().as_millis()
            )),
            StreamOutcome::Failed(err) => {
                warn!(error = %err, "stream exchange failed");
                observer.emit(&format!("request error: {err}"));
            }
        }
        observer.emit(SEPARATOR);
        observer.emit(&format!("test complete, received {} lines", tally.lines));
        info!(
            outcome = %outcome,
            lines = tally.lines,
            elapsed_ms = millis(elapsed),
            cancelled = tally.cancelled,
            "stream exchange finished"
        );

        self.state = EngineState::Finished(outcome.clone());
        StreamReport {
            exchange_id,
            outcome,
            envelope: tally.envelope,
            lines: tally.lines,
            elapsed,
            cancelled: tally.cancelled,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Default)]
struct Tally {
    envelope: Option<ResponseEnvelope>,
    lines: usize,
    cancelled: bool,
}
