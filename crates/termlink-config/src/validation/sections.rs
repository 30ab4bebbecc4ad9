//! Per-section validators.

use super::helpers::{validate_non_empty, validate_range};
use crate::schema::TermlinkConfig;

pub(crate) fn validate_server(errors: &mut Vec<String>, config: &TermlinkConfig) {
    validate_non_empty(errors, "server.host", &config.server.host);
    validate_range(errors, "server.port", config.server.port, 1, u16::MAX);
}

pub(crate) fn validate_terminal(errors: &mut Vec<String>, config: &TermlinkConfig) {
    let terminal = &config.terminal;
    if terminal.command.is_none() {
        validate_non_empty(errors, "terminal.program", &terminal.program);
    }
    if let Some(command) = &terminal.command {
        if shlex::split(command).is_none_or(|parts| parts.is_empty()) {
            errors.push(format!("terminal.command = {command:?} is not a valid command line"));
        }
    }
    if terminal.allow_shell_fallback {
        validate_non_empty(errors, "terminal.fallback_shell", &terminal.fallback_shell);
    }
    validate_range(errors, "terminal.read_chunk", terminal.read_chunk, 256, 65_536);
    validate_range(
        errors,
        "terminal.stop_timeout_ms",
        terminal.stop_timeout_ms,
        100,
        60_000,
    );
}

pub(crate) fn validate_runner(errors: &mut Vec<String>, config: &TermlinkConfig) {
    let runner = &config.runner;
    validate_range(errors, "runner.log_capacity", runner.log_capacity, 1, 100_000);
    validate_range(
        errors,
        "runner.stop_timeout_ms",
        runner.stop_timeout_ms,
        100,
        120_000,
    );
    validate_range(errors, "runner.metro_port", runner.metro_port, 1024, u16::MAX);
    validate_range(
        errors,
        "runner.device_timeout_ms",
        runner.device_timeout_ms,
        1000,
        600_000,
    );
    validate_range(errors, "runner.scan_depth", runner.scan_depth, 0, 8);
    validate_non_empty(errors, "runner.device_tool", &runner.device_tool);
    if !matches!(runner.mode.as_str(), "adb" | "lan") {
        errors.push(format!("runner.mode = {:?} must be \"adb\" or \"lan\"", runner.mode));
    }
}
