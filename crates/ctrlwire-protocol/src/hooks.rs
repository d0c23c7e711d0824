//! Hook event names, hook output, and hook context types
//!
//! A hook returns an open mapping of directives. The control fields
//! `continue` and `async` are reserved words in many languages, so
//! [`HookOutput`] stores them under the suffixed keys `continue_` and
//! `async_`; the response codec rewrites them to their wire names before
//! anything is written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Internal key for the `continue` control field
pub const CONTINUE_KEY: &str = "continue_";

/// Internal key for the `async` control field
pub const ASYNC_KEY: &str = "async_";

/// Lifecycle events a hook can be registered for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookEvent {
    /// Before a tool runs
    PreToolUse,
    /// After a tool succeeded
    PostToolUse,
    /// After a tool failed
    PostToolUseFailure,
    /// When the user submits a prompt
    UserPromptSubmit,
    /// When the main agent stops
    Stop,
    /// When a sub-agent stops
    SubagentStop,
    /// Before the transcript is compacted
    PreCompact,
    /// When the peer emits a notification
    Notification,
    /// When a sub-agent starts
    SubagentStart,
    /// When the peer is about to show a permission prompt
    PermissionRequest,
}

impl HookEvent {
    /// Get the wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::PostToolUseFailure => "PostToolUseFailure",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::PreCompact => "PreCompact",
            Self::Notification => "Notification",
            Self::SubagentStart => "SubagentStart",
            Self::PermissionRequest => "PermissionRequest",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission decision carried in `PreToolUse` hook-specific output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Allow the tool to execute
    Allow,
    /// Deny the tool execution
    Deny,
    /// Ask the user for permission
    Ask,
}

/// Directives returned by a hook callback
///
/// An empty output means "no directives". Arbitrary keys may be added with
/// [`HookOutput::with_field`]; `hookSpecificOutput` is passed to the peer
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookOutput(Map<String, Value>);

impl HookOutput {
    /// Create an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the peer should continue after the hook
    pub fn with_continue(self, cont: bool) -> Self {
        self.with_field(CONTINUE_KEY, cont)
    }

    /// Run the hook asynchronously, optionally bounded in milliseconds
    pub fn with_async(self, timeout_ms: Option<u64>) -> Self {
        let out = self.with_field(ASYNC_KEY, true);
        match timeout_ms {
            Some(ms) => out.with_field("asyncTimeout", ms),
            None => out,
        }
    }

    /// Hide the hook's stdout from the transcript
    pub fn with_suppress_output(self, suppress: bool) -> Self {
        self.with_field("suppressOutput", suppress)
    }

    /// Message shown when `continue` is false
    pub fn with_stop_reason(self, reason: impl Into<String>) -> Self {
        self.with_field("stopReason", reason.into())
    }

    /// Set the top-level decision (`block`)
    pub fn with_decision(self, decision: impl Into<String>) -> Self {
        self.with_field("decision", decision.into())
    }

    /// Explanation for the decision
    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        self.with_field("reason", reason.into())
    }

    /// Warning message shown to the user
    pub fn with_system_message(self, message: impl Into<String>) -> Self {
        self.with_field("systemMessage", message.into())
    }

    /// Set the event-specific payload
    pub fn with_hook_specific_output(self, output: Value) -> Self {
        self.with_field("hookSpecificOutput", output)
    }

    /// Set a `PreToolUse` permission decision
    pub fn with_permission_decision(
        self,
        decision: PermissionDecision,
        reason: impl Into<String>,
    ) -> Self {
        let mut specific = Map::new();
        specific.insert("hookEventName".into(), HookEvent::PreToolUse.as_str().into());
        specific.insert(
            "permissionDecision".into(),
            serde_json::to_value(decision).unwrap_or(Value::Null),
        );
        specific.insert("permissionDecisionReason".into(), reason.into().into());
        self.with_hook_specific_output(Value::Object(specific))
    }

    /// Add context for the model after an event
    pub fn with_additional_context(self, event: HookEvent, context: impl Into<String>) -> Self {
        let mut specific = Map::new();
        specific.insert("hookEventName".into(), event.as_str().into());
        specific.insert("additionalContext".into(), context.into().into());
        self.with_hook_specific_output(Value::Object(specific))
    }

    /// Set an arbitrary field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Check if the output carries no directives
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying mapping
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying mapping
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for HookOutput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Ancillary metadata passed to a hook callback
///
/// Open record: request fields without a typed slot land in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookContext {
    /// The callback id the peer invoked
    pub callback_id: String,

    /// Remaining request fields
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_uses_internal_keys() {
        let output = HookOutput::new().with_continue(false).with_async(Some(5000));
        let map = output.as_map();
        assert_eq!(map.get(CONTINUE_KEY), Some(&json!(false)));
        assert_eq!(map.get(ASYNC_KEY), Some(&json!(true)));
        assert_eq!(map.get("asyncTimeout"), Some(&json!(5000)));
        assert!(!map.contains_key("continue"));
    }

    #[test]
    fn test_permission_decision_output() {
        let output = HookOutput::new()
            .with_permission_decision(PermissionDecision::Deny, "Security policy violation");
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "deny",
                    "permissionDecisionReason": "Security policy violation"
                }
            })
        );
    }

    #[test]
    fn test_additional_context_output() {
        let output = HookOutput::new()
            .with_system_message("checked")
            .with_additional_context(HookEvent::PostToolUse, "exit code 0");
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["systemMessage"], "checked");
        assert_eq!(value["hookSpecificOutput"]["hookEventName"], "PostToolUse");
        assert_eq!(value["hookSpecificOutput"]["additionalContext"], "exit code 0");
    }

    #[test]
    fn test_hook_event_wire_names() {
        assert_eq!(serde_json::to_value(HookEvent::PreToolUse).unwrap(), "PreToolUse");
        assert_eq!(HookEvent::PostToolUseFailure.to_string(), "PostToolUseFailure");
        let parsed: HookEvent = serde_json::from_value(json!("SubagentStart")).unwrap();
        assert_eq!(parsed, HookEvent::SubagentStart);
    }

    #[test]
    fn test_empty_output() {
        assert!(HookOutput::new().is_empty());
        assert!(!HookOutput::new().with_reason("r").is_empty());
    }
}
