//! Session state management
//!
//! Tracks what the session last told the peer: model, permission mode, and
//! the initialize response.

use ctrlwire_protocol::PermissionMode;
use serde_json::Value;

/// Current state of the agent session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Whether the session is connected to the peer
    pub is_connected: bool,

    /// Model set through `set_model`; `None` means the peer's default
    pub current_model: Option<String>,

    /// Permission mode set through `set_permission_mode`
    pub permission_mode: PermissionMode,

    /// Payload of the initialize response
    pub server_info: Option<Value>,

    /// Whether the outbound direction was closed
    pub input_ended: bool,
}

impl SessionState {
    /// Create the state of a freshly initialized session
    pub(crate) fn connected(server_info: Value) -> Self {
        Self {
            is_connected: true,
            server_info: Some(server_info),
            ..Self::default()
        }
    }
}
