//! Framework project supervision for termlink.
//!
//! Runs React Native (bundler + app) or Flutter projects as named child
//! processes with bounded log capture, detects projects on disk, and
//! drives Android devices through `adb`.

pub mod device;
pub mod error;
pub mod log_buffer;
pub mod process;
pub mod project;
pub mod supervisor;

pub use device::{AdbTool, DeviceError, DeviceInfo, DeviceTool};
pub use error::RunnerError;
pub use log_buffer::{LogBuffer, DEFAULT_LOG_CAPACITY};
pub use process::{NamedProcess, ProcessSnapshot};
pub use project::{scan_projects, DetectedProject, ProjectKind};
pub use supervisor::{
    DeviceMode, FrameworkPlanner, LaunchPlanner, Phase, RunnerLogs, RunnerStatus, Slot,
    SlotLaunch, StartRequest, Supervisor, SupervisorSettings,
};
