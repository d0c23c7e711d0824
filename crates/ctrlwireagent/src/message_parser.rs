//! Message parsing for the content half of the protocol.
//!
//! Turns one decoded JSON object into a typed [`Message`]. Every message type
//! has a closed set of required fields: a missing or mistyped field is an
//! error, never a partially filled message.
//!
//! # Message Types
//!
//! - `user`: requires `message.content` (string or block list)
//! - `assistant`: requires `message.content` (block list) and `message.model`
//! - `system`: requires `subtype`; the whole envelope is kept as data
//! - `result`: requires `subtype`, `duration_ms`, `duration_api_ms`,
//!   `is_error`, `num_turns` and `session_id`
//!
//! # Example
//!
//! ```ignore
//! use ctrlwireagent::message_parser::parse_message;
//! use serde_json::json;
//!
//! let msg = parse_message(json!({
//!     "type": "user",
//!     "message": {"content": "Hello"}
//! }))?;
//! ```

use ctrlwire_protocol::content::{ContentBlock, ToolResultContent};
use ctrlwire_protocol::message::{
    AssistantMessage, AssistantMessageError, Message, ResultMessage, SystemMessage, UserContent,
    UserMessage,
};
use serde_json::{Map, Value};

/// Errors that can occur during message parsing
///
/// Variants that carry `data` hold the raw envelope for diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MessageParseError {
    /// The input was not a JSON object
    #[error("Invalid message data type (expected mapping, got {actual})")]
    InvalidType {
        /// JSON type name of the input
        actual: &'static str,
    },

    /// The object has no `type` key
    #[error("Message missing 'type' field")]
    MissingType {
        /// The raw envelope
        data: Value,
    },

    /// The `type` is not one of `user`, `assistant`, `system`, `result`
    #[error("Unknown message type: {message_type}")]
    UnknownType {
        /// The unrecognized type
        message_type: String,
        /// The raw envelope
        data: Value,
    },

    /// A required field is absent
    #[error("Missing required field in {message_type} message: {field}")]
    MissingRequiredField {
        /// Message type being parsed
        message_type: &'static str,
        /// Path of the missing field
        field: String,
        /// The raw envelope
        data: Value,
    },

    /// A field is present but has the wrong shape
    #[error("Invalid field in {message_type} message: {field} ({reason})")]
    InvalidField {
        /// Message type being parsed
        message_type: &'static str,
        /// Path of the offending field
        field: String,
        /// What was wrong with it
        reason: String,
        /// The raw envelope
        data: Value,
    },

    /// A content block has an unrecognized `type`
    #[error("Unknown content block type in {message_type} message: {block_type} (content[{index}])")]
    UnknownContentBlock {
        /// Message type being parsed
        message_type: &'static str,
        /// Position of the block
        index: usize,
        /// The unrecognized block type
        block_type: String,
        /// The raw envelope
        data: Value,
    },
}

/// Coarse classification of a [`MessageParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was not a mapping
    InvalidType,
    /// No `type` key
    MissingType,
    /// Unrecognized `type`
    UnknownType,
    /// Required-field violation, including malformed fields and unknown block types
    MissingRequiredField,
}

impl MessageParseError {
    /// Get the error class
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            Self::InvalidType { .. } => ParseErrorKind::InvalidType,
            Self::MissingType { .. } => ParseErrorKind::MissingType,
            Self::UnknownType { .. } => ParseErrorKind::UnknownType,
            Self::MissingRequiredField { .. }
            | Self::InvalidField { .. }
            | Self::UnknownContentBlock { .. } => ParseErrorKind::MissingRequiredField,
        }
    }

    /// Get the message type the error is scoped to, when known
    pub fn message_type(&self) -> Option<&str> {
        match self {
            Self::InvalidType { .. } | Self::MissingType { .. } => None,
            Self::UnknownType { message_type, .. } => Some(message_type),
            Self::MissingRequiredField { message_type, .. }
            | Self::InvalidField { message_type, .. }
            | Self::UnknownContentBlock { message_type, .. } => Some(message_type),
        }
    }

    /// Get the raw envelope, when available
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::InvalidType { .. } => None,
            Self::MissingType { data }
            | Self::UnknownType { data, .. }
            | Self::MissingRequiredField { data, .. }
            | Self::InvalidField { data, .. }
            | Self::UnknownContentBlock { data, .. } => Some(data),
        }
    }
}

/// Parse a JSON value into a typed Message
///
/// # Errors
///
/// Returns `MessageParseError` if:
/// - The value is not an object
/// - The object is missing the "type" field
/// - The message type is unknown
/// - A required field is missing or malformed
pub fn parse_message(data: Value) -> Result<Message, MessageParseError> {
    let Some(obj) = data.as_object() else {
        return Err(MessageParseError::InvalidType {
            actual: json_type_name(&data),
        });
    };

    let message_type = match obj.get("type") {
        None => return Err(MessageParseError::MissingType { data }),
        Some(Value::String(t)) => t.as_str(),
        Some(other) => {
            return Err(MessageParseError::UnknownType {
                message_type: other.to_string(),
                data,
            });
        }
    };

    match message_type {
        "user" => parse_user_message(Fields::new("user", obj, &data)),
        "assistant" => parse_assistant_message(Fields::new("assistant", obj, &data)),
        "system" => parse_system_message(Fields::new("system", obj, &data)),
        "result" => parse_result_message(Fields::new("result", obj, &data)),
        other => Err(MessageParseError::UnknownType {
            message_type: other.to_string(),
            data: data.clone(),
        }),
    }
}

/// Parse a user message
fn parse_user_message(f: Fields<'_>) -> Result<Message, MessageParseError> {
    let message = f.require_object(f.obj, "message", "message")?;
    let content = f.require(message, "content", "message.content")?;

    let content = match content {
        Value::String(text) => UserContent::Text(text.clone()),
        Value::Array(blocks) => UserContent::Blocks(f.content_blocks(blocks)?),
        _ => return Err(f.invalid("message.content", "expected string or array")),
    };

    Ok(Message::User(UserMessage {
        content,
        uuid: f.optional_str(f.obj, "uuid")?,
        parent_tool_use_id: f.optional_str(f.obj, "parent_tool_use_id")?,
        tool_use_result: f.optional_value(f.obj, "tool_use_result"),
    }))
}

/// Parse an assistant message
fn parse_assistant_message(f: Fields<'_>) -> Result<Message, MessageParseError> {
    let message = f.require_object(f.obj, "message", "message")?;
    let content = match f.require(message, "content", "message.content")? {
        Value::Array(blocks) => f.content_blocks(blocks)?,
        _ => return Err(f.invalid("message.content", "expected array")),
    };
    let model = f.require_str(message, "model", "message.model")?;

    let error = match f.optional_str(f.obj, "error")? {
        Some(raw) => Some(
            AssistantMessageError::from_wire(&raw)
                .ok_or_else(|| f.invalid("error", &format!("unknown error kind '{}'", raw)))?,
        ),
        None => None,
    };

    Ok(Message::Assistant(AssistantMessage {
        content,
        model,
        parent_tool_use_id: f.optional_str(f.obj, "parent_tool_use_id")?,
        error,
    }))
}

/// Parse a system message
fn parse_system_message(f: Fields<'_>) -> Result<Message, MessageParseError> {
    let subtype = f.require_str(f.obj, "subtype", "subtype")?;

    Ok(Message::System(SystemMessage {
        subtype,
        data: f.obj.clone(),
    }))
}

/// Parse a result message
fn parse_result_message(f: Fields<'_>) -> Result<Message, MessageParseError> {
    let subtype = f.require_str(f.obj, "subtype", "subtype")?;
    let duration_ms = f.require_u64(f.obj, "duration_ms")?;
    let duration_api_ms = f.require_u64(f.obj, "duration_api_ms")?;
    let is_error = f.require_bool(f.obj, "is_error", "is_error")?;
    let num_turns = f.require_u64(f.obj, "num_turns")?;
    let session_id = f.require_str(f.obj, "session_id", "session_id")?;

    let total_cost_usd = match f.optional_value(f.obj, "total_cost_usd") {
        Some(cost) => Some(
            cost.as_f64()
                .ok_or_else(|| f.invalid("total_cost_usd", "expected number"))?,
        ),
        None => None,
    };

    Ok(Message::Result(ResultMessage {
        subtype,
        duration_ms,
        duration_api_ms,
        is_error,
        num_turns,
        session_id,
        total_cost_usd,
        usage: f.optional_value(f.obj, "usage"),
        result: f.optional_str(f.obj, "result")?,
        structured_output: f.optional_value(f.obj, "structured_output"),
    }))
}

/// Field access scoped to one message, building errors that name the message type
struct Fields<'a> {
    message_type: &'static str,
    obj: &'a Map<String, Value>,
    data: &'a Value,
}

impl<'a> Fields<'a> {
    fn new(message_type: &'static str, obj: &'a Map<String, Value>, data: &'a Value) -> Self {
        Self {
            message_type,
            obj,
            data,
        }
    }

    fn missing(&self, field: &str) -> MessageParseError {
        MessageParseError::MissingRequiredField {
            message_type: self.message_type,
            field: field.to_string(),
            data: self.data.clone(),
        }
    }

    fn invalid(&self, field: &str, reason: &str) -> MessageParseError {
        MessageParseError::InvalidField {
            message_type: self.message_type,
            field: field.to_string(),
            reason: reason.to_string(),
            data: self.data.clone(),
        }
    }

    fn require<'v>(
        &self,
        obj: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'v Value, MessageParseError> {
        obj.get(key).ok_or_else(|| self.missing(path))
    }

    fn require_object<'v>(
        &self,
        obj: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'v Map<String, Value>, MessageParseError> {
        self.require(obj, key, path)?
            .as_object()
            .ok_or_else(|| self.invalid(path, "expected object"))
    }

    fn require_str(
        &self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<String, MessageParseError> {
        self.require(obj, key, path)?
            .as_str()
            .map(String::from)
            .ok_or_else(|| self.invalid(path, "expected string"))
    }

    fn require_bool(
        &self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<bool, MessageParseError> {
        self.require(obj, key, path)?
            .as_bool()
            .ok_or_else(|| self.invalid(path, "expected boolean"))
    }

    fn require_u64(&self, obj: &Map<String, Value>, key: &str) -> Result<u64, MessageParseError> {
        let value = self.require(obj, key, key)?;
        value
            .as_u64()
            .or_else(|| {
                // Some producers emit integral floats (e.g. 500.0)
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| self.invalid(key, "expected non-negative integer"))
    }

    /// Absent and null both read as `None`
    fn optional_str(
        &self,
        obj: &Map<String, Value>,
        key: &str,
    ) -> Result<Option<String>, MessageParseError> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(key, "expected string")),
        }
    }

    fn optional_value(&self, obj: &Map<String, Value>, key: &str) -> Option<Value> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    /// Decode content blocks in order
    fn content_blocks(&self, blocks: &[Value]) -> Result<Vec<ContentBlock>, MessageParseError> {
        blocks
            .iter()
            .enumerate()
            .map(|(index, block)| self.content_block(index, block))
            .collect()
    }

    fn content_block(&self, index: usize, block: &Value) -> Result<ContentBlock, MessageParseError> {
        let path = |field: &str| format!("message.content[{}].{}", index, field);
        let block = block
            .as_object()
            .ok_or_else(|| self.invalid(&format!("message.content[{}]", index), "expected object"))?;
        let block_type = self.require_str(block, "type", &path("type"))?;

        match block_type.as_str() {
            "text" => Ok(ContentBlock::Text {
                text: self.require_str(block, "text", &path("text"))?,
            }),
            "thinking" => Ok(ContentBlock::Thinking {
                thinking: self.require_str(block, "thinking", &path("thinking"))?,
                signature: self.require_str(block, "signature", &path("signature"))?,
            }),
            "tool_use" => Ok(ContentBlock::ToolUse {
                id: self.require_str(block, "id", &path("id"))?,
                name: self.require_str(block, "name", &path("name"))?,
                input: self.require(block, "input", &path("input"))?.clone(),
            }),
            "tool_result" => {
                let is_error = match block.get("is_error") {
                    None | Some(Value::Null) => None,
                    Some(Value::Bool(flag)) => Some(*flag),
                    Some(_) => return Err(self.invalid(&path("is_error"), "expected boolean")),
                };
                Ok(ContentBlock::ToolResult {
                    tool_use_id: self.require_str(block, "tool_use_id", &path("tool_use_id"))?,
                    content: self
                        .optional_value(block, "content")
                        .map(ToolResultContent::from),
                    is_error,
                })
            }
            _ => Err(MessageParseError::UnknownContentBlock {
                message_type: self.message_type,
                index,
                block_type,
                data: self.data.clone(),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
