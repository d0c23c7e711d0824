//! Transport error types

use std::fmt;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur in transport operations
#[derive(Debug)]
pub enum TransportError {
    /// Could not establish the connection
    Connection(String),

    /// The transport has not been connected, or its input was already closed
    NotConnected,

    /// I/O error on the underlying stream
    Io(std::io::Error),

    /// Inbound bytes could not be decoded
    Serialization(String),

    /// A buffered JSON message grew past the configured limit
    BufferOverflow {
        /// Configured limit in bytes
        limit: usize,
    },

    /// The peer process failed
    Process(String),

    /// Generic transport error
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "Connection error: {}", msg),
            Self::NotConnected => write!(f, "Transport is not connected"),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::BufferOverflow { limit } => write!(
                f,
                "JSON message exceeded maximum buffer size of {} bytes",
                limit
            ),
            Self::Process(msg) => write!(f, "Process error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
