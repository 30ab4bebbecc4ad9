//! Control channel wire protocol: JSON text frames tagged by `type`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use termlink_runner::{DetectedProject, DeviceInfo, RunnerLogs, RunnerStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    #[default]
    Hot,
    Restart,
}

/// Messages a control client sends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    Start {
        path: String,
        project_type: Option<String>,
        device_id: Option<String>,
        mode: Option<String>,
        metro_port: Option<u16>,
    },
    Stop,
    Status,
    Logs,
    Reload {
        #[serde(default)]
        kind: ReloadKind,
    },
    Detect {
        path: String,
    },
    Scan {
        path: Option<String>,
        depth: Option<usize>,
    },
    Devices,
    DevMenu {
        device_id: Option<String>,
    },
    RnReload {
        device_id: Option<String>,
    },
    OpenApp {
        device_id: Option<String>,
        package: Option<String>,
        path: Option<String>,
    },
    /// Point a LAN-mode app at the bundler.
    RnHost {
        host: String,
        port: Option<u16>,
        device_id: Option<String>,
        package: Option<String>,
        path: Option<String>,
    },
    Ping,
}

/// Exactly one is sent per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    Status {
        status: RunnerStatus,
    },
    Logs {
        logs: RunnerLogs,
    },
    Ack {
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Detect {
        path: PathBuf,
        project: Option<DetectedProject>,
    },
    Scan {
        base: PathBuf,
        projects: Vec<DetectedProject>,
    },
    Devices {
        devices: Vec<DeviceInfo>,
    },
    Pong,
    Error {
        message: String,
    },
}

impl ControlResponse {
    pub fn error(message: impl ToString) -> Self {
        ControlResponse::Error {
            message: message.to_string(),
        }
    }

    pub fn ack(action: &str, detail: Option<String>) -> Self {
        ControlResponse::Ack {
            action: action.to_string(),
            detail,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"type":"error","message":"serialize failed: {e}"}}"#))
    }
}
