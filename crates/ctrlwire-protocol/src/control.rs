//! Control envelope wire types
//!
//! Control traffic shares the stream with content messages and is told apart by
//! the envelope `type`:
//!
//! - `control_request`: `{type, request_id, request: {subtype, ...}}`, sent by
//!   either side
//! - `control_response`: `{type, response: {subtype: success|error, request_id, ...}}`
//! - `control_cancel_request`: a peer notice that it gave up on a request

use crate::agent::AgentDefinition;
use crate::error::Result;
use crate::types::PermissionMode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Envelope type of a control request
pub const CONTROL_REQUEST: &str = "control_request";

/// Envelope type of a control response
pub const CONTROL_RESPONSE: &str = "control_response";

/// Envelope type of a peer cancellation notice
pub const CONTROL_CANCEL_REQUEST: &str = "control_cancel_request";

/// Identifier correlating a control request with its response
///
/// Opaque on the wire. Ids the engine allocates look like `req_{counter}_{hex}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Create from raw string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Engine-initiated control requests
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Register hooks and agents for the session
    Initialize {
        /// Hook config keyed by event name
        hooks: Map<String, Value>,
        /// Agent definitions keyed by name
        #[serde(skip_serializing_if = "Option::is_none")]
        agents: Option<BTreeMap<String, AgentDefinition>>,
    },

    /// Interrupt the current turn
    Interrupt,

    /// Change the permission mode
    SetPermissionMode {
        /// New mode
        mode: PermissionMode,
    },

    /// Change the model; `None` restores the default
    SetModel {
        /// Model name
        model: Option<String>,
    },

    /// Restore files to their state at a user message
    RewindFiles {
        /// The user message to rewind to
        user_message_id: String,
    },

    /// Query the status of configured MCP servers
    McpStatus,
}

impl ControlRequest {
    /// Get the wire subtype
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::Interrupt => "interrupt",
            Self::SetPermissionMode { .. } => "set_permission_mode",
            Self::SetModel { .. } => "set_model",
            Self::RewindFiles { .. } => "rewind_files",
            Self::McpStatus => "mcp_status",
        }
    }
}

/// Outbound `control_request` envelope
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename = "control_request")]
pub struct ControlRequestEnvelope {
    /// Correlation id
    pub request_id: RequestId,

    /// Request body
    pub request: ControlRequest,
}

/// Body of a `control_response` envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlResponse {
    /// The request was handled
    Success {
        /// Id of the request being answered
        request_id: RequestId,
        /// Result payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<Value>,
    },

    /// The request failed
    Error {
        /// Id of the request being answered
        request_id: RequestId,
        /// Human-readable failure
        #[serde(default)]
        error: String,
    },
}

impl ControlResponse {
    /// Successful response carrying `payload`
    pub fn success(request_id: RequestId, payload: Value) -> Self {
        Self::Success {
            request_id,
            response: Some(payload),
        }
    }

    /// Error response carrying `message`
    pub fn error(request_id: RequestId, message: impl Into<String>) -> Self {
        Self::Error {
            request_id,
            error: message.into(),
        }
    }

    /// Get the id of the request being answered
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::Success { request_id, .. } | Self::Error { request_id, .. } => request_id,
        }
    }
}

/// Outbound `control_response` envelope
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename = "control_response")]
pub struct ControlResponseEnvelope {
    /// Response body
    pub response: ControlResponse,
}

/// Payload of an inbound `can_use_tool` request
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CanUseToolRequest {
    /// Tool the peer wants to run
    pub tool_name: String,

    /// Tool input; null decodes as an empty object
    #[serde(default = "empty_object", deserialize_with = "object_or_empty")]
    pub input: Value,

    /// Suggested permission updates, undecoded; anything but a list is ignored
    #[serde(default, deserialize_with = "list_or_empty")]
    pub permission_suggestions: Vec<Value>,

    /// Path that triggered the check
    #[serde(default)]
    pub blocked_path: Option<String>,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of an inbound `hook_callback` request
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HookCallbackRequest {
    /// Registered callback id
    pub callback_id: String,

    /// Hook input, passed to the callback as-is; null decodes as an empty object
    #[serde(default = "empty_object", deserialize_with = "object_or_empty")]
    pub input: Value,

    /// Tool use the hook fired for
    #[serde(default)]
    pub tool_use_id: Option<String>,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn object_or_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Value, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(empty_object()),
        value => Ok(value),
    }
}

fn list_or_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<Value>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

/// Serialize an envelope as one newline-terminated line
pub fn encode_line<T: Serialize>(envelope: &T) -> Result<String> {
    let mut line = serde_json::to_string(envelope)?;
    line.push('\n');
    Ok(line)
}
