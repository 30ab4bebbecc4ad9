use termlink_runner::device::list_devices;
use termlink_runner::{scan_projects, DetectedProject, DeviceMode, RunnerError, StartRequest};

use super::protocol::{ControlRequest, ControlResponse, ReloadKind};
use crate::state::AppContext;

/// Run `request` off the async executor; supervisor calls block.
pub async fn dispatch(request: ControlRequest, ctx: &AppContext) -> ControlResponse {
    let ctx = ctx.clone();
    match tokio::task::spawn_blocking(move || handle(request, &ctx)).await {
        Ok(response) => response,
        Err(e) => ControlResponse::error(format!("control request failed: {e}")),
    }
}

pub fn handle(request: ControlRequest, ctx: &AppContext) -> ControlResponse {
    let supervisor = &ctx.supervisor;
    let outcome = match request {
        ControlRequest::Start {
            path,
            project_type,
            device_id,
            mode,
            metro_port,
        } => start(ctx, &path, project_type.as_deref(), device_id, mode.as_deref(), metro_port),
        ControlRequest::Stop => {
            supervisor.stop();
            Ok(ControlResponse::Status {
                status: supervisor.status(),
            })
        }
        ControlRequest::Status => Ok(ControlResponse::Status {
            status: supervisor.status(),
        }),
        ControlRequest::Logs => Ok(ControlResponse::Logs {
            logs: supervisor.logs(),
        }),
        ControlRequest::Reload { kind } => Ok(reload(ctx, kind)),
        ControlRequest::Detect { path } => Ok(detect(ctx, &path)),
        ControlRequest::Scan { path, depth } => Ok(scan(ctx, path.as_deref(), depth)),
        ControlRequest::Devices => list_devices(supervisor.devices())
            .map(|devices| ControlResponse::Devices { devices })
            .map_err(RunnerError::from),
        ControlRequest::DevMenu { device_id } => supervisor
            .dev_menu(device_id.as_deref())
            .map(|device| ControlResponse::ack("dev_menu", Some(device))),
        ControlRequest::RnReload { device_id } => supervisor
            .rn_reload(device_id.as_deref())
            .map(|device| ControlResponse::ack("rn_reload", Some(device))),
        ControlRequest::OpenApp {
            device_id,
            package,
            path,
        } => {
            let dir = path.as_deref().map(|p| ctx.expand_path(p));
            supervisor
                .open_app(device_id.as_deref(), package.as_deref(), dir.as_deref())
                .map(|(device, package)| {
                    ControlResponse::ack("open_app", Some(format!("{package} on {device}")))
                })
        }
        ControlRequest::RnHost {
            host,
            port,
            device_id,
            package,
            path,
        } => {
            let port = port
                .or(supervisor.status().metro_port)
                .unwrap_or(ctx.config.runner.metro_port);
            let dir = path.as_deref().map(|p| ctx.expand_path(p));
            supervisor
                .set_debug_host(device_id.as_deref(), package.as_deref(), dir.as_deref(), &host, port)
                .map(|(device, package)| {
                    let detail = format!("{package} on {device} -> {}:{port}", host.trim());
                    ControlResponse::ack("rn_host", Some(detail))
                })
        }
        ControlRequest::Ping => Ok(ControlResponse::Pong),
    };

    outcome.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "control request failed");
        ControlResponse::error(e)
    })
}

fn start(
    ctx: &AppContext,
    path: &str,
    project_type: Option<&str>,
    device_id: Option<String>,
    mode: Option<&str>,
    metro_port: Option<u16>,
) -> Result<ControlResponse, RunnerError> {
    let runner = &ctx.config.runner;
    let mode: DeviceMode = mode.unwrap_or(runner.mode.as_str()).parse()?;
    let request = StartRequest::resolve(
        ctx.expand_path(path),
        project_type,
        device_id,
        mode,
        metro_port.unwrap_or(runner.metro_port),
    )?;
    let status = ctx.supervisor.start(request)?;
    Ok(ControlResponse::Status { status })
}

fn reload(ctx: &AppContext, kind: ReloadKind) -> ControlResponse {
    let (applied, action) = match kind {
        ReloadKind::Hot => (ctx.supervisor.hot_reload(), "hot_reload"),
        ReloadKind::Restart => (ctx.supervisor.hot_restart(), "hot_restart"),
    };
    if applied {
        ControlResponse::ack(action, None)
    } else {
        ControlResponse::error("no running flutter project")
    }
}

fn detect(ctx: &AppContext, raw: &str) -> ControlResponse {
    let path = ctx.expand_path(raw);
    if !path.is_dir() {
        return ControlResponse::error(RunnerError::WorkdirNotFound(path));
    }
    ControlResponse::Detect {
        project: DetectedProject::detect(&path),
        path,
    }
}

fn scan(ctx: &AppContext, raw: Option<&str>, depth: Option<usize>) -> ControlResponse {
    let base = match raw {
        Some(raw) => ctx.expand_path(raw),
        None => match &ctx.home {
            Some(home) => home.clone(),
            None => return ControlResponse::error("no scan path and home directory is unknown"),
        },
    };
    if !base.is_dir() {
        return ControlResponse::error(RunnerError::WorkdirNotFound(base));
    }
    let depth = depth.unwrap_or(ctx.config.runner.scan_depth);
    ControlResponse::Scan {
        projects: scan_projects(&base, depth),
        base,
    }
}
