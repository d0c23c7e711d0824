//! Engine and session configuration

use crate::error::{AgentError, Result};
use crate::hooks::HookMatcher;
use crate::permissions::{MissingPermissionPolicy, PermissionCallback};
use ctrlwire_protocol::{AgentDefinition, HookEvent};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Environment variable overriding the stream-close timeout, in milliseconds
pub const STREAM_CLOSE_TIMEOUT_ENV: &str = "CLAUDE_CODE_STREAM_CLOSE_TIMEOUT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the control-protocol engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Answer to `can_use_tool` when no permission callback is registered
    pub missing_permission_callback: MissingPermissionPolicy,

    /// Deadline for outbound control requests
    pub control_request_timeout: Duration,

    /// Deadline for the initialize handshake
    pub initialize_timeout: Duration,

    /// How long closing input waits for the first result
    pub stream_close_timeout: Duration,

    /// Capacity of the consumer message channel
    pub message_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            missing_permission_callback: MissingPermissionPolicy::Allow,
            control_request_timeout: DEFAULT_TIMEOUT,
            initialize_timeout: DEFAULT_TIMEOUT,
            stream_close_timeout: DEFAULT_TIMEOUT,
            message_buffer: 100,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with defaults, applying environment overrides
    ///
    /// Reads [`STREAM_CLOSE_TIMEOUT_ENV`] as milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` if the variable is set but is not a
    /// non-negative integer.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(STREAM_CLOSE_TIMEOUT_ENV) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                AgentError::Config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    STREAM_CLOSE_TIMEOUT_ENV, raw
                ))
            })?;
            config.stream_close_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// Set the missing-callback policy
    pub fn with_missing_permission_callback(mut self, policy: MissingPermissionPolicy) -> Self {
        self.missing_permission_callback = policy;
        self
    }

    /// Set the outbound control request timeout
    pub fn with_control_request_timeout(mut self, timeout: Duration) -> Self {
        self.control_request_timeout = timeout;
        self
    }

    /// Set the initialize timeout
    pub fn with_initialize_timeout(mut self, timeout: Duration) -> Self {
        self.initialize_timeout = timeout;
        self
    }

    /// Set the stream-close timeout
    pub fn with_stream_close_timeout(mut self, timeout: Duration) -> Self {
        self.stream_close_timeout = timeout;
        self
    }

    /// Set the consumer channel capacity (minimum 1)
    pub fn with_message_buffer(mut self, capacity: usize) -> Self {
        self.message_buffer = std::cmp::max(capacity, 1);
        self
    }
}

/// Configuration for an agent session
///
/// Engine settings plus the callbacks registered before the session starts.
#[derive(Clone, Default)]
pub struct SessionConfig {
    /// Engine settings
    pub engine: EngineConfig,

    /// Permission callback for `can_use_tool` requests
    pub permission_callback: Option<PermissionCallback>,

    /// Hook matchers per event
    pub hooks: BTreeMap<HookEvent, Vec<HookMatcher>>,

    /// Agent definitions sent at initialization
    pub agents: BTreeMap<String, AgentDefinition>,
}

impl SessionConfig {
    /// Create a session config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set the permission callback
    pub fn with_permission_callback(mut self, callback: PermissionCallback) -> Self {
        self.permission_callback = Some(callback);
        self
    }

    /// Add a hook matcher for an event
    pub fn with_hook(mut self, event: HookEvent, matcher: HookMatcher) -> Self {
        self.hooks.entry(event).or_default().push(matcher);
        self
    }

    /// Add an agent definition
    pub fn with_agent(mut self, name: impl Into<String>, agent: AgentDefinition) -> Self {
        self.agents.insert(name.into(), agent);
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("engine", &self.engine)
            .field("permission_callback", &self.permission_callback.is_some())
            .field("hooks", &self.hooks)
            .field("agents", &self.agents)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::hook_callback;
    use ctrlwire_protocol::HookOutput;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.missing_permission_callback, MissingPermissionPolicy::Allow);
        assert_eq!(config.control_request_timeout, Duration::from_secs(60));
        assert_eq!(config.initialize_timeout, Duration::from_secs(60));
        assert_eq!(config.stream_close_timeout, Duration::from_secs(60));
        assert_eq!(config.message_buffer, 100);
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_missing_permission_callback(MissingPermissionPolicy::Deny)
            .with_control_request_timeout(Duration::from_secs(5))
            .with_initialize_timeout(Duration::from_secs(10))
            .with_stream_close_timeout(Duration::from_millis(250))
            .with_message_buffer(0);

        assert_eq!(config.missing_permission_callback, MissingPermissionPolicy::Deny);
        assert_eq!(config.control_request_timeout, Duration::from_secs(5));
        assert_eq!(config.initialize_timeout, Duration::from_secs(10));
        assert_eq!(config.stream_close_timeout, Duration::from_millis(250));
        assert_eq!(config.message_buffer, 1); // Minimum is 1
    }

    #[test]
    fn test_from_env_override() {
        temp_env::with_var(STREAM_CLOSE_TIMEOUT_ENV, Some("1500"), || {
            let config = EngineConfig::from_env().unwrap();
            assert_eq!(config.stream_close_timeout, Duration::from_millis(1500));
        });
    }

    #[test]
    fn test_from_env_unset() {
        temp_env::with_var_unset(STREAM_CLOSE_TIMEOUT_ENV, || {
            assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::default());
        });
    }

    #[test]
    fn test_from_env_invalid() {
        temp_env::with_var(STREAM_CLOSE_TIMEOUT_ENV, Some("soon"), || {
            assert!(matches!(EngineConfig::from_env(), Err(AgentError::Config(_))));
        });
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .with_hook(
                HookEvent::PreToolUse,
                HookMatcher::new("Bash").with_hook(hook_callback(|_, _, _| async {
                    Ok(HookOutput::new())
                })),
            )
            .with_hook(HookEvent::PreToolUse, HookMatcher::any())
            .with_agent("reviewer", AgentDefinition::new("Reviews code", "You review code"));

        assert_eq!(config.hooks[&HookEvent::PreToolUse].len(), 2);
        assert!(config.agents.contains_key("reviewer"));
        assert!(config.permission_callback.is_none());
        assert!(format!("{:?}", config).contains("permission_callback: false"));
    }
}
