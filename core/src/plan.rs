//! Ordered diagnostic run: wait, run a step, wait, run the next.
//!
//! # Design
//! Steps run strictly one after another. Each step's delay starts only once
//! the previous step has finished, so the transcript of one exchange is
//! never interleaved with another's.

use std::time::Duration;

use tracing::info;

use crate::config::ProbeConfig;
use crate::engine::{StreamReport, StreamingEngine};
use crate::error::ProbeError;
use crate::http::Endpoint;
use crate::observer::Observer;
use crate::single::{ExchangeReport, SingleExchangeClient};
use crate::transport::Transport;
use crate::types::ChatPayload;

/// Rule printed before each streaming step and the closing note.
pub const BANNER: &str = "==================================================";

#[derive(Debug, Clone)]
pub enum DiagnosticTask {
    Single { endpoint: Endpoint, payload: ChatPayload },
    Stream { endpoint: Endpoint, payload: ChatPayload },
    Note(String),
}

#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub delay: Duration,
    pub task: DiagnosticTask,
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticPlan {
    steps: Vec<PlannedStep>,
}

#[derive(Debug)]
pub enum StepResult {
    Single(Result<ExchangeReport, ProbeError>),
    Stream(Result<StreamReport, ProbeError>),
    Note,
}

impl StepResult {
    pub fn is_failure(&self) -> bool {
        match self {
            StepResult::Single(result) => result.is_err(),
            StepResult::Stream(Ok(report)) => report.outcome.is_failure(),
            StepResult::Stream(Err(_)) => true,
            StepResult::Note => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct PlanSummary {
    pub results: Vec<StepResult>,
}

impl PlanSummary {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }
}

impl DiagnosticPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, delay: Duration, task: DiagnosticTask) -> Self {
        self.steps.push(PlannedStep { delay, task });
        self
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Single exchange, then streaming exchange, then a closing note, each
    /// preceded by the configured step delay.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let payload = config.payload();
        Ok(Self::new()
            .then(
                config.step_delay,
                DiagnosticTask::Single {
                    endpoint: config.chat_endpoint()?,
                    payload: payload.clone(),
                },
            )
            .then(
                config.step_delay,
                DiagnosticTask::Stream {
                    endpoint: config.stream_endpoint()?,
                    payload,
                },
            )
            .then(config.step_delay, DiagnosticTask::Note("diagnostics complete".to_string())))
    }

    pub async fn run<T, O>(
        &self,
        single: &SingleExchangeClient<T>,
        engine: &mut StreamingEngine<T>,
        observer: &mut O,
    ) -> PlanSummary
    where
        T: Transport,
        O: Observer + ?Sized,
    {
        let mut summary = PlanSummary::default();
        for (index, step) in self.steps.iter().enumerate() {
            tokio::time::sleep(step.delay).await;
            info!(step = index, "running diagnostic step");
            let result = match &step.task {
                DiagnosticTask::Single { endpoint, payload } => {
                    observer.emit(&format!("testing chat endpoint {endpoint}"));
                    StepResult::Single(single.execute(endpoint, payload, observer).await)
                }
                DiagnosticTask::Stream { endpoint, payload } => {
                    observer.emit("");
                    observer.emit(BANNER);
                    observer.emit(&format!("testing streaming endpoint {endpoint}"));
                    StepResult::Stream(engine.execute(endpoint, payload, observer).await)
                }
                DiagnosticTask::Note(text) => {
                    observer.emit("");
                    observer.emit(BANNER);
                    observer.emit(text);
                    StepResult::Note
                }
            };
            summary.results.push(result);
        }
        summary
    }
}
