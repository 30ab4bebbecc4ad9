use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the terminal channel runs, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Program name or path. Resolved through PATH and nvm installs.
    pub program: String,
    pub args: Vec<String>,
    /// Full command line. Shell-split, and takes precedence over `program`.
    pub command: Option<String>,
    /// Default working directory. `~` is expanded; home is the fallback.
    pub working_directory: Option<String>,
    /// Extra environment for the child.
    pub env: HashMap<String, String>,
    /// Run `fallback_shell` when `program` cannot be found.
    pub allow_shell_fallback: bool,
    pub fallback_shell: String,
    /// Maximum bytes per pty read.
    pub read_chunk: usize,
    pub stop_timeout_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            program: "codex".into(),
            args: Vec::new(),
            command: None,
            working_directory: None,
            env: HashMap::new(),
            allow_shell_fallback: false,
            fallback_shell: "/bin/bash".into(),
            read_chunk: 4096,
            stop_timeout_ms: 2000,
        }
    }
}

impl TerminalConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}
