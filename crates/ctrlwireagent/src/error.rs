//! Error types for the control-protocol engine
//!
//! Errors fall into two groups. Per-message and per-request failures
//! ([`AgentError::Parse`], [`AgentError::UnknownCallback`],
//! [`AgentError::Callback`], [`AgentError::Protocol`]) are contained: they are
//! surfaced for one message or answered on the wire for one request, and the
//! engine keeps running. [`AgentError::Transport`] is fatal to the engine.

use crate::message_parser::MessageParseError;
use ctrlwire_protocol::ProtocolError;
use ctrlwire_transport::TransportError;
use std::fmt;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in agent operations
#[derive(Debug)]
pub enum AgentError {
    /// Read or write failure on the underlying stream (fatal)
    Transport(String),

    /// A content envelope failed validation
    Parse(MessageParseError),

    /// A hook callback id has no registered hook
    UnknownCallback(String),

    /// A permission or hook callback failed or panicked
    Callback(String),

    /// The peer answered our control request with an error response
    ControlRequest(String),

    /// An outbound control request got no response in time
    Timeout(String),

    /// The caller cancelled an outbound control request
    Cancelled(String),

    /// Malformed control envelope
    Protocol(String),

    /// The engine has stopped
    Closed,

    /// Invalid or missing configuration
    Config(String),
}

impl AgentError {
    /// Whether the engine can keep running after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Closed)
    }

    /// Text written into an error control response
    pub(crate) fn response_message(&self) -> String {
        match self {
            Self::Callback(msg) | Self::Protocol(msg) | Self::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for AgentError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Transport(a), Self::Transport(b)) => a == b,
            (Self::Parse(a), Self::Parse(b)) => a.to_string() == b.to_string(),
            (Self::UnknownCallback(a), Self::UnknownCallback(b)) => a == b,
            (Self::Callback(a), Self::Callback(b)) => a == b,
            (Self::ControlRequest(a), Self::ControlRequest(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Cancelled(a), Self::Cancelled(b)) => a == b,
            (Self::Protocol(a), Self::Protocol(b)) => a == b,
            (Self::Closed, Self::Closed) => true,
            (Self::Config(a), Self::Config(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::Parse(err) => write!(f, "{}", err),
            Self::UnknownCallback(id) => write!(f, "no hook callback found for ID: {}", id),
            Self::Callback(msg) => write!(f, "Callback error: {}", msg),
            Self::ControlRequest(msg) => write!(f, "Control request failed: {}", msg),
            Self::Timeout(subtype) => write!(f, "control request timeout: {}", subtype),
            Self::Cancelled(subtype) => write!(f, "control request cancelled: {}", subtype),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::Closed => write!(f, "Control protocol is closed"),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MessageParseError> for AgentError {
    fn from(err: MessageParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<ProtocolError> for AgentError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
