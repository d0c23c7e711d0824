//! Inbound line framing
//!
//! The peer writes one JSON object per line, but wrapper scripts may print
//! informational text first and very large objects can arrive split over
//! several reads. [`JsonLineDecoder`] accumulates lines until they form a
//! complete JSON value.

use crate::error::{Result, TransportError};
use serde_json::Value;
use tracing::debug;

/// Default upper bound on a single buffered message
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Accumulating JSON line decoder
#[derive(Debug)]
pub struct JsonLineDecoder {
    buffer: String,
    max_buffer_size: usize,
}

impl JsonLineDecoder {
    /// Create a decoder that fails once a message exceeds `max_buffer_size` bytes
    pub fn new(max_buffer_size: usize) -> Self {
        Self {
            buffer: String::new(),
            max_buffer_size,
        }
    }

    /// Feed one line; returns a value once the buffered text parses
    ///
    /// Blank lines are ignored. While nothing is buffered, text before the
    /// first `{` is skipped. A line that parses on its own replaces any
    /// incomplete text buffered before it.
    pub fn push_line(&mut self, line: &str) -> Result<Option<Value>> {
        let mut line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if self.buffer.is_empty() {
            match line.find('{') {
                Some(start) => line = line[start..].trim(),
                None => return Ok(None),
            }
        } else if line.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(line) {
                debug!(discarded = self.buffer.len(), "dropping incomplete buffered text");
                self.buffer.clear();
                return Ok(Some(value));
            }
        }

        self.buffer.push_str(line);
        if self.buffer.len() > self.max_buffer_size {
            self.buffer.clear();
            return Err(TransportError::BufferOverflow {
                limit: self.max_buffer_size,
            });
        }

        match serde_json::from_str::<Value>(&self.buffer) {
            Ok(value) => {
                self.buffer.clear();
                Ok(Some(value))
            }
            Err(_) => Ok(None),
        }
    }

    /// Bytes currently buffered awaiting completion
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for JsonLineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}
