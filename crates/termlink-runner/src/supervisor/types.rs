//! Supervisor request, status, and plan types.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use termlink_common::ProcessSpec;

use crate::error::RunnerError;
use crate::log_buffer::DEFAULT_LOG_CAPACITY;
use crate::process::ProcessSnapshot;
use crate::project::ProjectKind;

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub log_capacity: usize,
    pub stop_timeout: Duration,
    /// Extra environment for every launched process.
    pub env: HashMap<String, String>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            stop_timeout: Duration::from_secs(4),
            env: HashMap::new(),
        }
    }
}

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

/// How the device reaches the bundler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// USB/adb: the bundler port is reversed onto the device.
    #[default]
    Adb,
    /// Device reaches the host over the network; no port reverse.
    Lan,
}

impl FromStr for DeviceMode {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adb" => Ok(DeviceMode::Adb),
            "lan" => Ok(DeviceMode::Lan),
            _ => Err(RunnerError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceMode::Adb => "adb",
            DeviceMode::Lan => "lan",
        })
    }
}

/// The named process slots a context can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Metro,
    App,
    Flutter,
}

impl Slot {
    pub fn name(self) -> &'static str {
        match self {
            Slot::Metro => "metro",
            Slot::App => "app",
            Slot::Flutter => "flutter",
        }
    }
}

// =============================================================================
// REQUEST / PLAN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub kind: ProjectKind,
    pub cwd: PathBuf,
    pub device_id: Option<String>,
    pub mode: DeviceMode,
    pub metro_port: u16,
}

/// One process to launch into a slot.
#[derive(Debug, Clone)]
pub struct SlotLaunch {
    pub slot: Slot,
    pub spec: ProcessSpec,
}

/// Decides which processes a start request launches.
pub trait LaunchPlanner: Send + Sync {
    fn plan(&self, request: &StartRequest) -> Vec<SlotLaunch>;
}

/// Launches the real framework tooling: `npx react-native` and `flutter`.
#[derive(Debug, Clone, Default)]
pub struct FrameworkPlanner {
    env: HashMap<String, String>,
}

impl FrameworkPlanner {
    pub fn new(env: HashMap<String, String>) -> Self {
        Self { env }
    }

    fn spec(&self, program: &str, request: &StartRequest) -> ProcessSpec {
        ProcessSpec::new(program, &request.cwd).envs(self.env.clone())
    }
}

impl LaunchPlanner for FrameworkPlanner {
    fn plan(&self, request: &StartRequest) -> Vec<SlotLaunch> {
        let port = request.metro_port.to_string();
        match request.kind {
            ProjectKind::ReactNative => {
                let metro = self
                    .spec("npx", request)
                    .args(["react-native", "start", "--port", port.as_str()]);
                let mut app = self.spec("npx", request).args([
                    "react-native",
                    "run-android",
                    "--no-packager",
                    "--port",
                    port.as_str(),
                ]);
                if let Some(device) = &request.device_id {
                    app = app.args(["--deviceId", device.as_str()]);
                }
                vec![
                    SlotLaunch {
                        slot: Slot::Metro,
                        spec: metro,
                    },
                    SlotLaunch {
                        slot: Slot::App,
                        spec: app,
                    },
                ]
            }
            ProjectKind::Flutter => {
                let mut flutter = self.spec("flutter", request).arg("run");
                if let Some(device) = &request.device_id {
                    flutter = flutter.args(["-d", device.as_str()]);
                }
                vec![SlotLaunch {
                    slot: Slot::Flutter,
                    spec: flutter,
                }]
            }
        }
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerStatus {
    pub phase: Phase,
    pub project_type: Option<ProjectKind>,
    pub cwd: Option<PathBuf>,
    pub device_id: Option<String>,
    pub mode: Option<DeviceMode>,
    pub metro_port: Option<u16>,
    pub metro_running: bool,
    pub app_running: bool,
    pub flutter_running: bool,
    pub slots: Vec<ProcessSnapshot>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunnerLogs {
    pub metro: Vec<String>,
    pub app: Vec<String>,
    pub flutter: Vec<String>,
}
