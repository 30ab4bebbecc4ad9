//! Environment variable overrides for the terminal command.
//!
//! | variable | effect |
//! |---|---|
//! | `TERMLINK_WORKDIR` | `terminal.working_directory` |
//! | `TERMLINK_CMD` | `terminal.command` (full command line) |
//! | `TERMLINK_PROGRAM` | `terminal.program` |
//! | `TERMLINK_ARGS` | `terminal.args`, shell-split |
//! | `TERMLINK_SHELL_FALLBACK` | `terminal.allow_shell_fallback` when `1` |

use tracing::{debug, warn};

use crate::schema::TermlinkConfig;

pub const ENV_WORKDIR: &str = "TERMLINK_WORKDIR";
pub const ENV_CMD: &str = "TERMLINK_CMD";
pub const ENV_PROGRAM: &str = "TERMLINK_PROGRAM";
pub const ENV_ARGS: &str = "TERMLINK_ARGS";
pub const ENV_SHELL_FALLBACK: &str = "TERMLINK_SHELL_FALLBACK";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut TermlinkConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` as the environment.
pub fn apply_overrides_from<F>(config: &mut TermlinkConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(dir) = get(ENV_WORKDIR) {
        debug!(key = ENV_WORKDIR, value = %dir, "env override");
        config.terminal.working_directory = Some(dir);
    }
    if let Some(cmd) = get(ENV_CMD) {
        debug!(key = ENV_CMD, value = %cmd, "env override");
        config.terminal.command = Some(cmd);
    }
    if let Some(program) = get(ENV_PROGRAM) {
        debug!(key = ENV_PROGRAM, value = %program, "env override");
        config.terminal.program = program;
    }
    if let Some(args) = get(ENV_ARGS) {
        match shlex::split(&args) {
            Some(args) => config.terminal.args = args,
            None => warn!(key = ENV_ARGS, value = %args, "unbalanced quoting, ignored"),
        }
    }
    if let Some(flag) = get(ENV_SHELL_FALLBACK) {
        config.terminal.allow_shell_fallback = flag == "1";
    }
}
