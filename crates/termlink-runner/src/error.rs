use std::path::PathBuf;

use termlink_common::ProcessError;

use crate::device::DeviceError;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("unsupported project type: {0}")]
    UnsupportedProject(String),

    #[error("Working directory not found: {}", .0.display())]
    WorkdirNotFound(PathBuf),

    #[error("no react-native or flutter project found in {}", .0.display())]
    ProjectNotDetected(PathBuf),

    #[error("invalid device mode: {0} (expected adb or lan)")]
    InvalidMode(String),

    #[error("no Android package found in {}", .0.display())]
    PackageNotDetected(PathBuf),

    #[error("debug host is required")]
    HostRequired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            RunnerError::WorkdirNotFound(PathBuf::from("/x")).to_string(),
            "Working directory not found: /x"
        );
        assert_eq!(
            RunnerError::InvalidMode("usb".into()).to_string(),
            "invalid device mode: usb (expected adb or lan)"
        );
        let err: RunnerError = DeviceError::Failed("offline".into()).into();
        assert_eq!(err.to_string(), "offline");
    }
}
