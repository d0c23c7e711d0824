//! Common scalar types shared across the protocol

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission mode governing how the peer asks for tool permissions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Ask for permission for each tool use
    #[default]
    Default,

    /// Automatically accept file edits
    AcceptEdits,

    /// Plan only, do not execute tools
    Plan,

    /// Bypass permission checks entirely
    BypassPermissions,
}

impl PermissionMode {
    /// Get the wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::Plan => "plan",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
