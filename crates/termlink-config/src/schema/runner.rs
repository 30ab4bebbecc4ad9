use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Project runner (bundler / app / flutter) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Lines of output kept per process.
    pub log_capacity: usize,
    pub stop_timeout_ms: u64,
    /// Default bundler port when a start request omits one.
    pub metro_port: u16,
    /// Default device mode: `adb` or `lan`.
    pub mode: String,
    /// Device automation tool.
    pub device_tool: String,
    pub device_timeout_ms: u64,
    /// Default depth for project scans.
    pub scan_depth: usize,
    /// Extra environment for runner processes.
    pub env: HashMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_capacity: 400,
            stop_timeout_ms: 4000,
            metro_port: 8081,
            mode: "adb".into(),
            device_tool: "adb".into(),
            device_timeout_ms: 30_000,
            scan_depth: 2,
            env: HashMap::new(),
        }
    }
}

impl RunnerConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}
