//! Error types for protocol operations

use std::fmt;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding control envelopes
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// JSON serialization/deserialization error
    Serialization(String),

    /// A control request payload did not match its subtype's shape
    InvalidControlRequest(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::InvalidControlRequest(msg) => write!(f, "Invalid control request: {}", msg),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
