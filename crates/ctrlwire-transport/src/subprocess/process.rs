//! Process configuration and spawning

use super::framing::DEFAULT_MAX_BUFFER_SIZE;
use crate::error::{Result, TransportError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Configuration for spawning the peer process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Path to the executable
    pub cli_path: String,

    /// Arguments to pass
    pub args: Vec<String>,

    /// Environment variables to set
    pub env: HashMap<String, String>,

    /// Working directory
    pub cwd: Option<PathBuf>,

    /// Upper bound on a single inbound JSON message
    pub max_buffer_size: usize,

    /// Forward the child's stderr lines to `tracing` at debug level
    pub log_stderr: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new("claude")
    }
}

impl ProcessConfig {
    /// Create a configuration for the given executable
    pub fn new(cli_path: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            log_stderr: false,
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable
    ///
    /// The child does not inherit the parent's environment: only variables set
    /// here are passed.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the inbound message size limit
    pub fn with_max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    /// Forward stderr to `tracing`
    pub fn with_stderr_logging(mut self) -> Self {
        self.log_stderr = true;
        self
    }

    /// Spawn the process with piped stdio
    pub(crate) fn spawn(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(&self.args);

        // Only explicitly set variables reach the child
        cmd.env_clear();
        cmd.envs(&self.env);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
            cmd.env("PWD", cwd);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(if self.log_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.kill_on_drop(true);

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransportError::Connection(format!("executable not found at: {}", self.cli_path))
            } else {
                TransportError::Connection(format!("failed to start {}: {}", self.cli_path, e))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_config_default() {
        let config = ProcessConfig::default();
        assert_eq!(config.cli_path, "claude");
        assert!(config.args.is_empty());
        assert_eq!(config.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
        assert!(!config.log_stderr);
    }

    #[test]
    fn test_process_config_builder() {
        let config = ProcessConfig::new("my-agent")
            .with_arg("--output-format")
            .with_arg("stream-json")
            .with_env("API_KEY", "sk-123")
            .with_cwd("/tmp")
            .with_max_buffer_size(4096)
            .with_stderr_logging();

        assert_eq!(config.cli_path, "my-agent");
        assert_eq!(config.args, vec!["--output-format", "stream-json"]);
        assert_eq!(config.env.get("API_KEY"), Some(&"sk-123".to_string()));
        assert_eq!(config.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(config.max_buffer_size, 4096);
        assert!(config.log_stderr);
    }

    #[tokio::test]
    async fn test_spawn_missing_executable() {
        let config = ProcessConfig::new("/nonexistent/ctrlwire-peer");
        let err = config.spawn().unwrap_err();
        assert!(matches!(err, TransportError::Connection(msg) if msg.contains("not found")));
    }
}
