use std::sync::Mutex;

use termlink_common::sync::lock;

use super::{DeviceError, DeviceTool};

/// Records every invocation; answers `devices -l` with a canned listing.
#[derive(Default)]
pub(crate) struct RecordingTool {
    devices: String,
    fail_with: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingTool {
    pub(crate) fn with_devices(listing: &str) -> Self {
        Self {
            devices: listing.to_string(),
            ..Self::default()
        }
    }

    /// Every command other than `devices -l` fails with `message`.
    pub(crate) fn failing(listing: &str, message: &str) -> Self {
        Self {
            devices: listing.to_string(),
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl DeviceTool for RecordingTool {
    fn run(&self, args: &[&str]) -> Result<String, DeviceError> {
        if args == ["devices", "-l"] {
            return Ok(self.devices.clone());
        }
        lock(&self.calls).push(args.join(" "));
        match &self.fail_with {
            Some(message) => Err(DeviceError::Failed(message.clone())),
            None => Ok(String::new()),
        }
    }
}
