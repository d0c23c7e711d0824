//! Message types for the protocol
//!
//! Defines the typed content messages the peer streams to the consumer:
//! conversation turns, system notices, and final results. These are produced
//! by the message parser; the types themselves carry no validation logic.

use crate::content::ContentBlock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A typed content message received from the peer
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A user turn (prompt or tool results)
    User(UserMessage),

    /// An assistant turn
    Assistant(AssistantMessage),

    /// A system notice
    System(SystemMessage),

    /// The final result of a query
    Result(ResultMessage),
}

impl Message {
    /// Get the wire `type` of this message
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Assistant(_) => "assistant",
            Self::System(_) => "system",
            Self::Result(_) => "result",
        }
    }

    /// Check if this is a result message
    pub fn is_result(&self) -> bool {
        matches!(self, Self::Result(_))
    }
}

/// Content of a user message: raw text or ordered content blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    /// Raw string content, stored verbatim
    Text(String),

    /// Ordered content blocks
    Blocks(Vec<ContentBlock>),
}

impl UserContent {
    /// Get the raw text, if the content is a plain string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Blocks(_) => None,
        }
    }

    /// Get the content blocks, if the content is structured
    pub fn blocks(&self) -> Option<&[ContentBlock]> {
        match self {
            Self::Text(_) => None,
            Self::Blocks(blocks) => Some(blocks),
        }
    }
}

/// A user message
#[derive(Debug, Clone, PartialEq)]
pub struct UserMessage {
    /// Message content
    pub content: UserContent,

    /// Session-scoped message identifier
    pub uuid: Option<String>,

    /// Tool use this message belongs to, when emitted inside a sub-agent
    pub parent_tool_use_id: Option<String>,

    /// Opaque tool-execution metadata (edit and patch details)
    pub tool_use_result: Option<Value>,
}

/// An assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantMessage {
    /// Ordered content blocks
    pub content: Vec<ContentBlock>,

    /// Model that produced the message
    pub model: String,

    /// Tool use this message belongs to, when emitted inside a sub-agent
    pub parent_tool_use_id: Option<String>,

    /// Error classification reported by the peer
    pub error: Option<AssistantMessageError>,
}

/// Closed set of assistant error classifications
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssistantMessageError {
    /// Credentials were rejected
    AuthenticationFailed,

    /// Account billing problem
    BillingError,

    /// Request was rate limited
    RateLimit,

    /// Request was rejected as invalid
    InvalidRequest,

    /// Upstream server failure
    ServerError,

    /// Unclassified failure
    Unknown,
}

impl AssistantMessageError {
    /// Parse a wire value, returning `None` for anything outside the closed set
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "authentication_failed" => Some(Self::AuthenticationFailed),
            "billing_error" => Some(Self::BillingError),
            "rate_limit" => Some(Self::RateLimit),
            "invalid_request" => Some(Self::InvalidRequest),
            "server_error" => Some(Self::ServerError),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Get the wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::BillingError => "billing_error",
            Self::RateLimit => "rate_limit",
            Self::InvalidRequest => "invalid_request",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }
}

/// A system message
///
/// `data` holds the complete envelope as received, including `type` and
/// `subtype`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMessage {
    /// Subtype discriminator (e.g. `init`)
    pub subtype: String,

    /// The full envelope
    pub data: Map<String, Value>,
}

/// Session capability info carried by the `init` system message
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInit {
    /// Names of available agents
    #[serde(default)]
    pub agents: Vec<String>,

    /// Available slash commands
    #[serde(default)]
    pub slash_commands: Vec<String>,

    /// Active output style
    #[serde(default)]
    pub output_style: Option<String>,
}

impl SystemMessage {
    /// Decode the capability info of an `init` message
    ///
    /// Returns `None` for other subtypes or when the fields have unexpected shapes.
    pub fn init_info(&self) -> Option<SystemInit> {
        if self.subtype != "init" {
            return None;
        }
        serde_json::from_value(Value::Object(self.data.clone())).ok()
    }
}

/// The final result of a query
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMessage {
    /// Result subtype (e.g. `success`, `error_max_turns`)
    pub subtype: String,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Time spent in API calls in milliseconds
    pub duration_api_ms: u64,

    /// Whether the query ended in error
    pub is_error: bool,

    /// Number of conversation turns
    pub num_turns: u64,

    /// Session identifier
    pub session_id: String,

    /// Total cost in USD
    pub total_cost_usd: Option<f64>,

    /// Token usage breakdown
    pub usage: Option<Value>,

    /// Final text result
    pub result: Option<String>,

    /// Structured output, when an output schema was requested
    pub structured_output: Option<Value>,
}
