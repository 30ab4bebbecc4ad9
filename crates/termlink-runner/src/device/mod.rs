//! Android device automation through an external tool (`adb`).
//!
//! The tool is opaque: it is invoked with an argument list and returns its
//! combined output. [`DeviceTool`] is the seam; [`AdbTool`] is the real
//! implementation.

mod adb;
#[cfg(test)]
pub(crate) mod fake;

pub use adb::AdbTool;

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::Serialize;

/// React Native dev-support preferences, relative to the app's data dir.
const DEV_SETTINGS_PREFS: &str = "shared_prefs/com.facebook.react.devsupport.DevInternalSettings.xml";

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("{0} not found in PATH")]
    NotInstalled(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{program} timed out after {}ms", after.as_millis())]
    Timeout { program: String, after: Duration },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Runs device-tool commands.
pub trait DeviceTool: Send + Sync {
    /// Run with `args` and return trimmed combined output.
    fn run(&self, args: &[&str]) -> Result<String, DeviceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub model: String,
    pub product: String,
    pub device: String,
    pub transport_id: String,
}

/// Parse `adb devices -l`. Only entries in the `device` state are kept.
pub fn parse_devices(output: &str) -> Vec<DeviceInfo> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?;
            if parts.next()? != "device" {
                return None;
            }
            let mut info = DeviceInfo {
                id: id.to_string(),
                ..DeviceInfo::default()
            };
            for (key, value) in parts.filter_map(|part| part.split_once(':')) {
                let slot = match key {
                    "model" => &mut info.model,
                    "product" => &mut info.product,
                    "device" => &mut info.device,
                    "transport_id" => &mut info.transport_id,
                    _ => continue,
                };
                *slot = value.to_string();
            }
            Some(info)
        })
        .collect()
}

pub fn list_devices(tool: &dyn DeviceTool) -> Result<Vec<DeviceInfo>, DeviceError> {
    Ok(parse_devices(&tool.run(&["devices", "-l"])?))
}

/// The requested device if connected, else the first connected device.
pub fn resolve_device(tool: &dyn DeviceTool, requested: Option<&str>) -> Result<String, DeviceError> {
    let devices = list_devices(tool)?;
    let Some(first) = devices.first() else {
        return Err(DeviceError::NotFound("No adb devices connected".into()));
    };
    match requested.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) if devices.iter().any(|d| d.id == id) => Ok(id.to_string()),
        Some(id) => Err(DeviceError::NotFound(format!("Device not found: {id}"))),
        None => Ok(first.id.clone()),
    }
}

/// Forward the device's `tcp:<port>` to the host's.
pub fn reverse_port(tool: &dyn DeviceTool, device: &str, port: u16) -> Result<(), DeviceError> {
    let spec = format!("tcp:{port}");
    tool.run(&["-s", device, "reverse", spec.as_str(), spec.as_str()]).map(drop)
}

/// Open the React Native developer menu (menu key).
pub fn dev_menu(tool: &dyn DeviceTool, device: &str) -> Result<(), DeviceError> {
    tool.run(&["-s", device, "shell", "input", "keyevent", "82"])
        .map(drop)
}

/// Trigger a React Native reload by typing `RR`.
pub fn rn_reload(tool: &dyn DeviceTool, device: &str) -> Result<(), DeviceError> {
    tool.run(&["-s", device, "shell", "input", "text", "RR"])
        .map(drop)
}

/// Point a React Native debug build at the bundler on `host:port`.
///
/// Rewrites the app's dev-support preferences through `run-as`, so the
/// package must be debuggable. The file travels base64-encoded through
/// both shell layers.
pub fn set_debug_host(
    tool: &dyn DeviceTool,
    device: &str,
    package: &str,
    host: &str,
    port: u16,
) -> Result<(), DeviceError> {
    let xml = format!(
        "<?xml version='1.0' encoding='utf-8' standalone='yes' ?>\n\
         <map>\n    <string name=\"debug_http_host\">{host}:{port}</string>\n</map>\n"
    );
    let script = format!(
        "mkdir -p shared_prefs && echo {} | base64 -d > {DEV_SETTINGS_PREFS}",
        B64.encode(xml)
    );
    tool.run(&["-s", device, "shell", "run-as", package, "sh", "-c", script.as_str()])
        .map(drop)
}

/// Start `package`'s launcher activity.
pub fn launch_app(tool: &dyn DeviceTool, device: &str, package: &str) -> Result<(), DeviceError> {
    tool.run(&[
        "-s",
        device,
        "shell",
        "monkey",
        "-p",
        package,
        "-c",
        "android.intent.category.LAUNCHER",
        "1",
    ])
    .map(drop)
}
