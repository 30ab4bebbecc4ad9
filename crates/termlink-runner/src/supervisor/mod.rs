//! Runs at most one framework project context at a time.
//!
//! A context is a project type, a directory, and up to three named process
//! slots (`metro`, `app`, `flutter`). Starting a new context always tears
//! the previous one down first, so no process from an older context
//! survives a start. Lifecycle operations are serialized; status and log
//! queries only take the short-lived state lock and never wait on a start.

mod types;


pub use types::{
    DeviceMode, FrameworkPlanner, LaunchPlanner, Phase, RunnerLogs, RunnerStatus, Slot,
    SlotLaunch, StartRequest, SupervisorSettings,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use termlink_common::sync::lock;

use crate::device::{self, DeviceTool};
use crate::error::RunnerError;
use crate::process::NamedProcess;
use crate::project::{detect_android_package, detect_project_kind, ProjectKind};

// =============================================================================
// CONTEXT
// =============================================================================

#[derive(Default)]
struct Context {
    phase: Phase,
    kind: Option<ProjectKind>,
    cwd: Option<PathBuf>,
    device_id: Option<String>,
    mode: Option<DeviceMode>,
    metro_port: Option<u16>,
    slots: BTreeMap<Slot, Arc<NamedProcess>>,
    last_error: Option<String>,
}

impl Context {
    fn is_empty(&self) -> bool {
        self.kind.is_none() && self.slots.is_empty()
    }

    fn slot_running(&self, slot: Slot) -> bool {
        self.slots.get(&slot).is_some_and(|p| p.is_running())
    }

    fn slot_logs(&self, slot: Slot) -> Vec<String> {
        self.slots.get(&slot).map(|p| p.logs()).unwrap_or_default()
    }
}

impl StartRequest {
    /// Build a request for `cwd`, detecting the project type when
    /// `project_type` is not given.
    pub fn resolve(
        cwd: PathBuf,
        project_type: Option<&str>,
        device_id: Option<String>,
        mode: DeviceMode,
        metro_port: u16,
    ) -> Result<Self, RunnerError> {
        if !cwd.is_dir() {
            return Err(RunnerError::WorkdirNotFound(cwd));
        }
        let kind = match project_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t
                .parse::<ProjectKind>()
                .map_err(|_| RunnerError::UnsupportedProject(t.to_string()))?,
            None => detect_project_kind(&cwd)
                .ok_or_else(|| RunnerError::ProjectNotDetected(cwd.clone()))?,
        };
        Ok(Self {
            kind,
            cwd,
            device_id: device_id.filter(|d| !d.trim().is_empty()),
            mode,
            metro_port,
        })
    }
}

// =============================================================================
// SUPERVISOR
// =============================================================================

pub struct Supervisor {
    settings: SupervisorSettings,
    planner: Box<dyn LaunchPlanner>,
    devices: Arc<dyn DeviceTool>,
    /// Serializes start and stop.
    lifecycle: Mutex<()>,
    state: Mutex<Context>,
}

impl Supervisor {
    pub fn new(settings: SupervisorSettings, devices: Arc<dyn DeviceTool>) -> Self {
        let planner = Box::new(FrameworkPlanner::new(settings.env.clone()));
        Self::with_planner(settings, devices, planner)
    }

    pub fn with_planner(
        settings: SupervisorSettings,
        devices: Arc<dyn DeviceTool>,
        planner: Box<dyn LaunchPlanner>,
    ) -> Self {
        Self {
            settings,
            planner,
            devices,
            lifecycle: Mutex::new(()),
            state: Mutex::new(Context::default()),
        }
    }

    pub fn devices(&self) -> &dyn DeviceTool {
        self.devices.as_ref()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Tear down the active context and start `request`.
    ///
    /// On failure every process this call started is stopped, the
    /// supervisor returns to idle, and the message is kept as
    /// `last_error`.
    pub fn start(&self, request: StartRequest) -> Result<RunnerStatus, RunnerError> {
        let _op = lock(&self.lifecycle);
        self.teardown();

        tracing::info!(
            kind = %request.kind,
            cwd = %request.cwd.display(),
            mode = %request.mode,
            "starting project"
        );
        {
            let mut ctx = lock(&self.state);
            ctx.phase = Phase::Starting;
            ctx.kind = Some(request.kind);
            ctx.cwd = Some(request.cwd.clone());
            ctx.device_id = request.device_id.clone();
            ctx.mode = Some(request.mode);
            ctx.metro_port = Some(request.metro_port);
        }

        match self.launch(request) {
            Ok(()) => {
                lock(&self.state).phase = Phase::Running;
                Ok(self.status())
            }
            Err(e) => {
                tracing::error!(error = %e, "project start failed");
                self.teardown();
                lock(&self.state).last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn launch(&self, mut request: StartRequest) -> Result<(), RunnerError> {
        if !request.cwd.is_dir() {
            return Err(RunnerError::WorkdirNotFound(request.cwd));
        }

        if request.mode == DeviceMode::Adb {
            let device = device::resolve_device(self.devices(), request.device_id.as_deref())?;
            if request.kind == ProjectKind::ReactNative {
                device::reverse_port(self.devices(), &device, request.metro_port)?;
            }
            lock(&self.state).device_id = Some(device.clone());
            request.device_id = Some(device);
        }

        for launch in self.planner.plan(&request) {
            let process = Arc::new(NamedProcess::new(
                launch.slot.name(),
                launch.spec,
                self.settings.log_capacity,
            ));
            // Registered before starting so a failed start is torn down too.
            lock(&self.state).slots.insert(launch.slot, Arc::clone(&process));
            process.start()?;
        }
        Ok(())
    }

    /// Stop every process and clear the context. Idempotent.
    pub fn stop(&self) {
        let _op = lock(&self.lifecycle);
        self.teardown();
    }

    fn teardown(&self) {
        let slots = {
            let mut ctx = lock(&self.state);
            if ctx.is_empty() {
                *ctx = Context::default();
                return;
            }
            ctx.phase = Phase::Stopping;
            std::mem::take(&mut ctx.slots)
        };

        let timeout = self.settings.stop_timeout;
        thread::scope(|scope| {
            for process in slots.values() {
                scope.spawn(move || {
                    let code = process.stop(timeout);
                    tracing::debug!(name = process.name(), ?code, "slot stopped");
                });
            }
        });

        *lock(&self.state) = Context::default();
        tracing::info!("project stopped");
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn status(&self) -> RunnerStatus {
        let ctx = lock(&self.state);
        RunnerStatus {
            phase: ctx.phase,
            project_type: ctx.kind,
            cwd: ctx.cwd.clone(),
            device_id: ctx.device_id.clone(),
            mode: ctx.mode,
            metro_port: ctx.metro_port,
            metro_running: ctx.slot_running(Slot::Metro),
            app_running: ctx.slot_running(Slot::App),
            flutter_running: ctx.slot_running(Slot::Flutter),
            slots: ctx.slots.values().map(|p| p.snapshot()).collect(),
            last_error: ctx.last_error.clone(),
        }
    }

    pub fn logs(&self) -> RunnerLogs {
        let ctx = lock(&self.state);
        RunnerLogs {
            metro: ctx.slot_logs(Slot::Metro),
            app: ctx.slot_logs(Slot::App),
            flutter: ctx.slot_logs(Slot::Flutter),
        }
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Send `r` to the flutter tool. False unless a flutter context is active.
    pub fn hot_reload(&self) -> bool {
        self.flutter_key("r\n")
    }

    /// Send `R` to the flutter tool. False unless a flutter context is active.
    pub fn hot_restart(&self) -> bool {
        self.flutter_key("R\n")
    }

    fn flutter_key(&self, key: &str) -> bool {
        let process = {
            let ctx = lock(&self.state);
            if ctx.kind != Some(ProjectKind::Flutter) {
                return false;
            }
            match ctx.slots.get(&Slot::Flutter) {
                Some(p) if p.is_running() => Arc::clone(p),
                _ => return false,
            }
        };
        process.write(key);
        true
    }

    /// The requested device, else the context's device, else the first
    /// connected one.
    fn target_device(&self, requested: Option<&str>) -> Result<String, RunnerError> {
        let remembered = lock(&self.state).device_id.clone();
        let wanted = requested
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string)
            .or(remembered);
        Ok(device::resolve_device(self.devices(), wanted.as_deref())?)
    }

    /// Open the React Native developer menu; returns the device used.
    pub fn dev_menu(&self, requested: Option<&str>) -> Result<String, RunnerError> {
        let device = self.target_device(requested)?;
        device::dev_menu(self.devices(), &device)?;
        Ok(device)
    }

    /// Reload the React Native bundle; returns the device used.
    pub fn rn_reload(&self, requested: Option<&str>) -> Result<String, RunnerError> {
        let device = self.target_device(requested)?;
        device::rn_reload(self.devices(), &device)?;
        Ok(device)
    }

    /// Launch the app. The package is taken from `package`, else detected
    /// in `path`, else in the active context's directory.
    pub fn open_app(
        &self,
        requested: Option<&str>,
        package: Option<&str>,
        path: Option<&Path>,
    ) -> Result<(String, String), RunnerError> {
        let package = self.target_package(package, path)?;
        let device = self.target_device(requested)?;
        device::launch_app(self.devices(), &device, &package)?;
        Ok((device, package))
    }

    /// Point the app's debug build at the bundler on `host:port`; the LAN
    /// mode counterpart of the adb port reverse. The package resolves as in
    /// [`Supervisor::open_app`].
    pub fn set_debug_host(
        &self,
        requested: Option<&str>,
        package: Option<&str>,
        path: Option<&Path>,
        host: &str,
        port: u16,
    ) -> Result<(String, String), RunnerError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(RunnerError::HostRequired);
        }
        let package = self.target_package(package, path)?;
        let device = self.target_device(requested)?;
        device::set_debug_host(self.devices(), &device, &package, host, port)?;
        tracing::info!(device = %device, package = %package, host = %host, port, "debug host set");
        Ok((device, package))
    }

    fn target_package(&self, package: Option<&str>, path: Option<&Path>) -> Result<String, RunnerError> {
        if let Some(p) = package.map(str::trim).filter(|p| !p.is_empty()) {
            return Ok(p.to_string());
        }
        let dir = match path {
            Some(p) => p.to_path_buf(),
            None => lock(&self.state)
                .cwd
                .clone()
                .ok_or_else(|| RunnerError::PackageNotDetected(PathBuf::new()))?,
        };
        detect_android_package(&dir).ok_or(RunnerError::PackageNotDetected(dir))
    }
}
