//! Hook callbacks and matchers
//!
//! Hooks are registered per [`HookEvent`] as a list of [`HookMatcher`]s. During
//! initialization every callback gets an engine-assigned id (`hook_{n}`) and the
//! peer later invokes it by that id through a `hook_callback` request.

use ctrlwire_protocol::{HookContext, HookOutput};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for async hook callbacks
///
/// Callbacks take the hook input, the optional tool use id, and a
/// [`HookContext`], and resolve to the hook's directives.
pub type HookCallback = Arc<
    dyn Fn(Value, Option<String>, HookContext) -> Pin<Box<dyn Future<Output = anyhow::Result<HookOutput>> + Send>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`HookCallback`]
///
/// # Example
///
/// ```ignore
/// let cb = hook_callback(|input, _tool_use_id, _ctx| async move {
///     if input["tool_name"] == "Bash" {
///         return Ok(HookOutput::new().with_continue(false));
///     }
///     Ok(HookOutput::new())
/// });
/// ```
pub fn hook_callback<F, Fut>(f: F) -> HookCallback
where
    F: Fn(Value, Option<String>, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
{
    Arc::new(move |input, tool_use_id, ctx| Box::pin(f(input, tool_use_id, ctx)))
}

/// A group of callbacks sharing one tool-name matcher
#[derive(Clone, Default)]
pub struct HookMatcher {
    /// Tool-name pattern; `None` matches every tool
    pub matcher: Option<String>,

    /// Callbacks to run when the matcher fires
    pub hooks: Vec<HookCallback>,

    /// Per-matcher timeout in seconds, forwarded to the peer
    pub timeout: Option<f64>,
}

impl HookMatcher {
    /// Create a matcher for a tool-name pattern
    pub fn new(matcher: impl Into<String>) -> Self {
        Self {
            matcher: Some(matcher.into()),
            ..Self::default()
        }
    }

    /// Create a matcher that fires for every tool
    pub fn any() -> Self {
        Self::default()
    }

    /// Add a callback
    pub fn with_hook(mut self, hook: HookCallback) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set the timeout in seconds
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

impl fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("hooks", &self.hooks.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_hook_callback_wraps_closure() {
        let cb = hook_callback(|input, tool_use_id, ctx| async move {
            Ok(HookOutput::new()
                .with_field("tool", input["tool_name"].clone())
                .with_field("tool_use_id", tool_use_id.unwrap_or_default())
                .with_field("callback", ctx.callback_id))
        });

        let ctx = HookContext {
            callback_id: "hook_0".into(),
            ..HookContext::default()
        };
        let output = cb(json!({"tool_name": "Bash"}), Some("toolu_1".into()), ctx)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(output).unwrap(),
            json!({"tool": "Bash", "tool_use_id": "toolu_1", "callback": "hook_0"})
        );
    }

    #[test]
    fn test_matcher_builder() {
        let matcher = HookMatcher::new("Bash")
            .with_hook(hook_callback(|_, _, _| async { Ok(HookOutput::new()) }))
            .with_timeout(5.0);

        assert_eq!(matcher.matcher.as_deref(), Some("Bash"));
        assert_eq!(matcher.hooks.len(), 1);
        assert_eq!(matcher.timeout, Some(5.0));
        assert!(HookMatcher::any().matcher.is_none());
        assert!(format!("{:?}", matcher).contains("hooks: 1"));
    }
}
