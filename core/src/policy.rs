//! Count and time limits for a streaming exchange.

use std::time::Duration;

use crate::error::ProbeError;

pub const DEFAULT_MAX_LINES: usize = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Which limit ended an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    Count,
    Timeout,
}

/// Two independent limits; whichever is reached first ends the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffPolicy {
    max_lines: usize,
    timeout: Duration,
}

impl CutoffPolicy {
    pub fn new(max_lines: usize, timeout: Duration) -> Result<Self, ProbeError> {
        if max_lines == 0 {
            return Err(ProbeError::InvalidPolicy("max_lines must be positive".to_string()));
        }
        if timeout.is_zero() {
            return Err(ProbeError::InvalidPolicy("timeout must be positive".to_string()));
        }
        Ok(Self { max_lines, timeout })
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn count_reached(&self, lines: usize) -> bool {
        lines >= self.max_lines
    }

    pub fn time_reached(&self, elapsed: Duration) -> bool {
        elapsed >= self.timeout
    }

    /// Evaluate both limits, count first.
    pub fn evaluate(&self, lines: usize, elapsed: Duration) -> Option<Cutoff> {
        if self.count_reached(lines) {
            Some(Cutoff::Count)
        } else if self.time_reached(elapsed) {
            Some(Cutoff::Timeout)
        } else {
            None
        }
    }
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
