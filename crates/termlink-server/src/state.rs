use std::path::PathBuf;
use std::sync::Arc;

use termlink_config::TermlinkConfig;
use termlink_runner::{AdbTool, Supervisor, SupervisorSettings};
use termlink_terminal::resolve::expand_user;

/// Shared by every connection.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TermlinkConfig>,
    pub supervisor: Arc<Supervisor>,
    pub home: Option<PathBuf>,
}

impl AppContext {
    pub fn new(config: TermlinkConfig) -> Self {
        let runner = &config.runner;
        let devices = Arc::new(AdbTool::new(&runner.device_tool, runner.device_timeout()));
        let settings = SupervisorSettings {
            log_capacity: runner.log_capacity,
            stop_timeout: runner.stop_timeout(),
            env: runner.env.clone(),
        };
        let supervisor = Arc::new(Supervisor::new(settings, devices));
        Self::with_supervisor(config, supervisor, dirs::home_dir())
    }

    pub fn with_supervisor(
        config: TermlinkConfig,
        supervisor: Arc<Supervisor>,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            supervisor,
            home,
        }
    }

    /// Expand `~` and anchor relative paths at home.
    pub fn expand_path(&self, raw: &str) -> PathBuf {
        let path = expand_user(raw.trim(), self.home.as_deref());
        match &self.home {
            Some(home) if path.is_relative() => home.join(path),
            _ => path,
        }
    }
}
