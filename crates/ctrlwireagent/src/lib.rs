//! Control-protocol engine for driving an agent process
//!
//! The peer process and this library exchange newline-delimited JSON over a
//! duplex stream. Two kinds of traffic share that stream: content messages,
//! which are parsed into typed [`Message`]s for the consumer, and control
//! envelopes, which carry request/response exchanges in both directions.
//!
//! # Key Features
//!
//! - **Message Parsing**: Typed user, assistant, system and result messages
//! - **Permission Callbacks**: Decide whether the peer may run a tool
//! - **Hook Callbacks**: React to lifecycle events (PreToolUse, PostToolUse, etc.)
//! - **Outbound Control**: Initialize, interrupt, change model or permission mode
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`ctrlwire-protocol`): Wire types
//! 2. **Transport Layer** (`ctrlwire-transport`): Line transport and subprocess hosting
//! 3. **Engine Layer** (this crate): Routing, callbacks, and the session API
//!
//! # Usage Example
//!
//! ```ignore
//! use ctrlwireagent::{AgentSession, SessionConfig, permission_callback};
//! use ctrlwireagent::{PermissionResult, ProcessConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::new().with_permission_callback(permission_callback(
//!         |tool, _input, _ctx| async move {
//!             if tool == "Bash" {
//!                 return Ok(PermissionResult::deny("no shell access"));
//!             }
//!             Ok(PermissionResult::allow())
//!         },
//!     ));
//!
//!     let session = AgentSession::spawn(ProcessConfig::default(), config).await?;
//!     session.send_user_message("List the files here").await?;
//!     for message in session.receive_response().await? {
//!         println!("{:?}", message);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hooks;
pub mod message_parser;
pub mod permissions;
pub mod registry;
pub mod routing;

mod envelope;
mod pending;


pub mod session;

pub mod testing;

// Re-export commonly used types
pub use config::{EngineConfig, STREAM_CLOSE_TIMEOUT_ENV, SessionConfig};
pub use error::{AgentError, Result};
pub use hooks::{HookCallback, HookMatcher, hook_callback};
pub use message_parser::{MessageParseError, ParseErrorKind, parse_message};
pub use permissions::{MissingPermissionPolicy, PermissionCallback, permission_callback};
pub use registry::CallbackRegistry;
pub use routing::{MessageRouter, MessageStream};
pub use session::{AgentSession, SessionState};

pub use ctrlwire_protocol::{
    AgentDefinition, AssistantMessage, AssistantMessageError, ContentBlock, ControlRequest,
    HookContext, HookEvent, HookOutput, Message, PermissionDecision, PermissionMode,
    PermissionResult, PermissionUpdate, ResultMessage, SystemMessage, ToolPermissionContext,
    UserContent, UserMessage,
};
pub use ctrlwire_transport::{CliTransport, ProcessConfig, Transport, TransportError};
