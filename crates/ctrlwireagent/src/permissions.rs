//! Permission callbacks for tool execution
//!
//! The peer asks before running a tool by sending a `can_use_tool` control
//! request. A registered [`PermissionCallback`] decides; without one the
//! engine falls back to [`MissingPermissionPolicy`].

use ctrlwire_protocol::{PermissionResult, ToolPermissionContext};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for async permission callbacks
///
/// Callbacks take the tool name, the tool input, and a
/// [`ToolPermissionContext`], and resolve to a [`PermissionResult`].
pub type PermissionCallback = Arc<
    dyn Fn(String, Value, ToolPermissionContext) -> Pin<Box<dyn Future<Output = anyhow::Result<PermissionResult>> + Send>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`PermissionCallback`]
///
/// # Example
///
/// ```ignore
/// let cb = permission_callback(|tool, _input, _ctx| async move {
///     if tool == "Bash" {
///         return Ok(PermissionResult::deny("Security policy violation"));
///     }
///     Ok(PermissionResult::allow())
/// });
/// ```
pub fn permission_callback<F, Fut>(f: F) -> PermissionCallback
where
    F: Fn(String, Value, ToolPermissionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<PermissionResult>> + Send + 'static,
{
    Arc::new(move |tool_name, input, ctx| Box::pin(f(tool_name, input, ctx)))
}

/// What to answer a `can_use_tool` request with when no callback is registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPermissionPolicy {
    /// Answer `{"behavior": "allow"}`
    #[default]
    Allow,

    /// Answer a deny decision
    Deny,

    /// Answer an error response
    Error,
}

/// Message used when a request is refused for lack of a callback
pub(crate) const NO_PERMISSION_CALLBACK: &str = "no permission callback configured";

impl MissingPermissionPolicy {
    /// Resolve the policy into a decision, or `None` for an error response
    pub(crate) fn decision(self) -> Option<PermissionResult> {
        match self {
            Self::Allow => Some(PermissionResult::allow()),
            Self::Deny => Some(PermissionResult::deny(NO_PERMISSION_CALLBACK)),
            Self::Error => None,
        }
    }
}
