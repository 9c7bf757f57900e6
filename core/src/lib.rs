//! Diagnostic client for a chat-style HTTP service.
//!
//! # Overview
//! Two independent components exercise the service:
//! - `SingleExchangeClient` posts one JSON payload, buffers the response and
//!   reports it, decoded as JSON when possible.
//! - `StreamingEngine` posts one payload and consumes an open-ended response
//!   as newline-delimited lines until the service closes the stream or a
//!   `CutoffPolicy` limit (line count or elapsed time) fires, cancelling the
//!   exchange when it does.
//!
//! # Design
//! - Network access goes through the `Transport` trait; `ReqwestTransport`
//!   is the production implementation.
//! - Human-readable output goes to an `Observer`; operator logs go through
//!   `tracing`.
//! - `DiagnosticPlan` sequences both components as an explicit ordered list
//!   of delayed steps.

pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod http;
pub mod observer;
pub mod plan;
pub mod policy;
pub mod single;
pub mod transport;
pub mod types;

pub use config::ProbeConfig;
pub use decoder::{LineDecoder, TextEncoding};
pub use engine::{EngineState, StreamOutcome, StreamReport, StreamingEngine};
pub use error::{ProbeError, TransportError};
pub use http::{Endpoint, HttpRequest, ResponseEnvelope};
pub use observer::{ConsoleObserver, Observer, RecordingObserver};
pub use plan::{DiagnosticPlan, DiagnosticTask, PlanSummary, StepResult};
pub use policy::{Cutoff, CutoffPolicy};
pub use single::{ExchangeReport, SingleExchangeClient};
pub use transport::{Exchange, ReqwestTransport, Transport};
pub use types::{ChatPayload, DecodedBody};
