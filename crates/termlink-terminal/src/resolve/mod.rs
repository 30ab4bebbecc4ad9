//! Command resolution for terminal sessions.
//!
//! Turns the `[terminal]` config plus an optional per-request working
//! directory into a concrete [`ProcessSpec`]:
//!
//! 1. working directory: request `cwd`, then config, then home
//! 2. command line: `terminal.command` (shell-split) or `program` + `args`
//! 3. program: absolute path, `PATH`, newest nvm install, shell fallback
//! 4. environment: inherited, `TERM`, program dir on `PATH`, config extras

mod env;
mod program;
mod workdir;

#[cfg(test)]
mod tests;

pub use env::build_env;
pub use program::{pick_latest_nvm, resolve_program};
pub use workdir::{expand_user, resolve_workdir};

use std::collections::HashMap;
use std::path::PathBuf;

use termlink_common::ProcessSpec;
use termlink_config::TerminalConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Working directory not found: {0}")]
    WorkdirNotFound(String),

    #[error(
        "{program} not found. Install it, point TERMLINK_PROGRAM at the binary, \
         or set TERMLINK_SHELL_FALLBACK=1 to open a shell instead."
    )]
    ProgramNotFound { program: String },

    #[error("Invalid command line: {0}")]
    InvalidCommand(String),

    #[error("No working directory: home directory is unknown")]
    NoHome,
}

/// The parts of the server's environment resolution depends on.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub home: Option<PathBuf>,
    pub base_env: HashMap<String, String>,
}

impl ResolveContext {
    pub fn from_env() -> Self {
        let base_env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            home: dirs::home_dir(),
            base_env,
        }
    }
}

/// Resolve against the live process environment.
pub fn resolve_command(
    config: &TerminalConfig,
    cwd: Option<&str>,
) -> Result<ProcessSpec, ResolveError> {
    resolve_command_with(config, cwd, &ResolveContext::from_env())
}

pub fn resolve_command_with(
    config: &TerminalConfig,
    cwd: Option<&str>,
    ctx: &ResolveContext,
) -> Result<ProcessSpec, ResolveError> {
    let home = ctx.home.as_deref();
    let cwd = resolve_workdir(cwd, config.working_directory.as_deref(), home)?;

    let (program, mut args) = match config.command.as_deref() {
        Some(line) => {
            let mut parts = shlex::split(line)
                .filter(|parts| !parts.is_empty())
                .ok_or_else(|| ResolveError::InvalidCommand(line.to_string()))?;
            let program = parts.remove(0);
            (program, parts)
        }
        None => (config.program.clone(), config.args.clone()),
    };

    let path_var = ctx.base_env.get("PATH").map(String::as_str);
    let resolved = match resolve_program(&program, path_var, home) {
        Some(path) => path,
        None if config.allow_shell_fallback => {
            tracing::warn!(
                program = %program,
                shell = %config.fallback_shell,
                "program not found, falling back to shell"
            );
            args.clear();
            PathBuf::from(&config.fallback_shell)
        }
        None => return Err(ResolveError::ProgramNotFound { program }),
    };

    let env = build_env(&ctx.base_env, &resolved, &config.env);
    Ok(ProcessSpec {
        program: resolved.to_string_lossy().into_owned(),
        args,
        cwd,
        env,
    })
}
