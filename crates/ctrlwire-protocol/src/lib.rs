//! Wire types for the ctrlwire control protocol
//!
//! The peer process and the client exchange newline-delimited JSON objects
//! over a duplex stream. This crate defines those objects as plain data:
//!
//! - **Content types**: [`content`] - text, thinking, tool use and tool result blocks
//! - **Message types**: [`message`] - user, assistant, system and result messages
//! - **Control envelopes**: [`control`] - control requests and responses
//! - **Permissions**: [`permissions`] - permission decisions and updates
//! - **Hooks**: [`hooks`] - hook events, hook output and hook context
//! - **Agents**: [`agent`] - agent definitions sent at initialization
//!
//! Nothing here performs I/O or validation beyond what serde derives.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod content;
pub mod control;
pub mod error;
pub mod hooks;
pub mod message;
pub mod permissions;
pub mod types;

// Re-export commonly used types at crate level
pub use agent::AgentDefinition;
pub use content::{ContentBlock, ToolResultContent};
pub use control::{
    CanUseToolRequest, ControlRequest, ControlRequestEnvelope, ControlResponse,
    ControlResponseEnvelope, HookCallbackRequest, RequestId,
};
pub use error::{ProtocolError, Result};
pub use hooks::{HookContext, HookEvent, HookOutput, PermissionDecision};
pub use message::{
    AssistantMessage, AssistantMessageError, Message, ResultMessage, SystemInit, SystemMessage,
    UserContent, UserMessage,
};
pub use permissions::{
    PermissionBehavior, PermissionResult, PermissionRuleValue, PermissionUpdate,
    PermissionUpdateDestination, ToolPermissionContext,
};
pub use types::PermissionMode;
