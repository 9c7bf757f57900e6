//! Sinks for the human-readable diagnostic transcript.
//!
//! # Design
//! The components only ever write to an `Observer`. The console observer is
//! what the `chat-probe` binary uses; `RecordingObserver` keeps the lines in
//! memory so tests can assert on the exact transcript.

use std::io::Write;

use crate::http::ResponseEnvelope;

/// Rule printed between sections of a transcript.
pub const SEPARATOR: &str = "--------------------------------------------------";

/// Write-only sink for diagnostic lines.
pub trait Observer {
    fn emit(&mut self, line: &str);
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn emit(&mut self, line: &str) {
        (**self).emit(line);
    }
}

/// Emit the status line and one indented line per header.
pub fn emit_envelope<O: Observer + ?Sized>(observer: &mut O, envelope: &ResponseEnvelope) {
    observer.emit(&format!("status: {}", envelope.status));
    observer.emit("headers:");
    for (name, value) in &envelope.headers {
        observer.emit(&format!("  {name}: {value}"));
    }
}

/// Prints each line to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn emit(&mut self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not abort the exchange in progress.
        let _ = writeln!(out, "{line}");
    }
}

/// Collects lines in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    lines: Vec<String>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

impl Observer for RecordingObserver {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
