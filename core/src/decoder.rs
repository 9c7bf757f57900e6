//! Re-segmentation of body chunks into logical lines.
//!
//! # Design
//! Chunk boundaries carry no meaning: a line may be split across chunks and
//! a chunk may hold many lines. `LineDecoder` keeps the bytes after the last
//! newline as a residual and only decodes a segment once its terminating
//! newline has arrived, so a multi-byte character split between chunks is
//! decoded whole. The trailing unterminated segment is released only after
//! `close`.
//!
//! Lines are pulled one at a time with `next_line` so the caller can stop in
//! the middle of a chunk without decoding the rest.

use std::fmt;
use std::str::FromStr;

/// Text encoding used to decode line bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8; invalid sequences decode to U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1, one byte per code point.
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unsupported encoding {other:?}")),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => f.write_str("utf-8"),
            TextEncoding::Latin1 => f.write_str("latin1"),
        }
    }
}

/// Incremental newline splitter with a residual buffer.
#[derive(Debug, Default)]
pub struct LineDecoder {
    encoding: TextEncoding,
    pending: Vec<u8>,
    // Start of the first unconsumed byte in `pending`.
    cursor: usize,
    closed: bool,
}

impl LineDecoder {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }

    /// Append a chunk. Chunks pushed after `close` are ignored.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.closed {
            return;
        }
        if self.cursor > 0 {
            self.pending.drain(..self.cursor);
            self.cursor = 0;
        }
        self.pending.extend_from_slice(chunk);
    }

    /// Mark end of input; the residual segment becomes a complete line.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.cursor < self.pending.len() {
            self.pending.push(b'\n');
        }
    }

    /// Next non-blank, trimmed line whose newline has arrived.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let rest = &self.pending[self.cursor..];
            let pos = rest.iter().position(|&b| b == b'\n')?;
            let text = self.encoding.decode(&rest[..pos]);
            self.cursor += pos + 1;
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    /// Bytes held back waiting for a newline.
    pub fn residual(&self) -> &[u8] {
        &self.pending[self.cursor..]
    }
}
