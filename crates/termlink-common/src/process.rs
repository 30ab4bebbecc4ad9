//! OS process ownership shared by the pty bridge and the project runner.
//!
//! A [`ProcessHandle`] wraps anything implementing [`ChildControl`] (a plain
//! `std::process::Child` or a pty child) and records its exit status exactly
//! once. Waiting never holds the child lock across a sleep: every wait is a
//! `try_wait` poll loop.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::sync::lock;

/// Interval between `try_wait` polls while waiting for exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for a process to disappear after a forced kill.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

/// Exit code recorded when the status of a child could not be queried.
pub const UNKNOWN_EXIT: i32 = -1;

// ---------------------------------------------------------------------------
// ProcessSpec
// ---------------------------------------------------------------------------

/// Everything needed to launch a process.
///
/// `env` is the complete child environment, not a set of additions. It is
/// seeded from the current process environment by [`ProcessSpec::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Human-readable command line, for logs and status output.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A `std::process::Command` with program, args, cwd and the full env.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .env_clear()
            .envs(&self.env);
        cmd
    }
}

// ---------------------------------------------------------------------------
// ChildControl
// ---------------------------------------------------------------------------

/// The minimal surface [`ProcessHandle`] needs from a spawned child.
///
/// Exit codes follow one convention: normal exits report their status code,
/// signal deaths report the negated signal number.
pub trait ChildControl: Send {
    fn pid(&self) -> Option<u32>;
    fn try_wait(&mut self) -> io::Result<Option<i32>>;
    fn kill(&mut self) -> io::Result<()>;
}

impl ChildControl for std::process::Child {
    fn pid(&self) -> Option<u32> {
        Some(self.id())
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(std::process::Child::try_wait(self)?.map(exit_code_of))
    }

    fn kill(&mut self) -> io::Result<()> {
        std::process::Child::kill(self)
    }
}

/// Map an `ExitStatus` to the exit-code convention used across termlink.
pub fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(UNKNOWN_EXIT)
}

// ---------------------------------------------------------------------------
// ProcessHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRecord {
    pub code: i32,
    pub at: DateTime<Utc>,
}

pub struct ProcessHandle {
    spec: ProcessSpec,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    child: Mutex<Box<dyn ChildControl>>,
    exit: OnceLock<ExitRecord>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("program", &self.spec.program)
            .field("pid", &self.pid)
            .field("exit", &self.exit.get())
            .finish()
    }
}

impl ProcessHandle {
    pub fn new(spec: ProcessSpec, child: Box<dyn ChildControl>) -> Self {
        let pid = child.pid();
        Self {
            spec,
            pid,
            started_at: Utc::now(),
            child: Mutex::new(child),
            exit: OnceLock::new(),
        }
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Check the child without blocking. Returns the exit code once exited.
    pub fn poll(&self) -> Option<i32> {
        if let Some(record) = self.exit.get() {
            return Some(record.code);
        }
        let status = lock(&self.child).try_wait();
        match status {
            Ok(Some(code)) => Some(self.record(code)),
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(
                    program = %self.spec.program,
                    pid = ?self.pid,
                    error = %err,
                    "try_wait failed, treating process as gone"
                );
                Some(self.record(UNKNOWN_EXIT))
            }
        }
    }

    fn record(&self, code: i32) -> i32 {
        self.exit
            .get_or_init(|| ExitRecord {
                code,
                at: Utc::now(),
            })
            .code
    }

    pub fn is_running(&self) -> bool {
        self.poll().is_none()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.poll()
    }

    pub fn exit(&self) -> Option<ExitRecord> {
        self.poll();
        self.exit.get().copied()
    }

    /// Poll until the child exits or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<i32> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = self.poll() {
                return Some(code);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    pub fn wait(&self) -> i32 {
        loop {
            if let Some(code) = self.poll() {
                return code;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Ask the child to exit (SIGTERM on Unix). No-op once exited.
    pub fn terminate(&self) -> io::Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        #[cfg(unix)]
        {
            self.signal(nix::sys::signal::Signal::SIGTERM)
        }
        #[cfg(not(unix))]
        {
            lock(&self.child).kill()
        }
    }

    /// Force the child down (SIGKILL on Unix). No-op once exited.
    pub fn kill(&self) -> io::Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        #[cfg(unix)]
        {
            self.signal(nix::sys::signal::Signal::SIGKILL)
        }
        #[cfg(not(unix))]
        {
            lock(&self.child).kill()
        }
    }

    #[cfg(unix)]
    fn signal(&self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        let Some(pid) = self.pid else {
            return lock(&self.child).kill();
        };
        let pid = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), signal).map_err(io::Error::from)
    }

    /// Terminate, wait up to `timeout`, then kill.
    ///
    /// Returns the recorded exit code, or `None` if the child is still
    /// present [`KILL_GRACE`] after the forced kill.
    pub fn stop(&self, timeout: Duration) -> Option<i32> {
        if let Some(code) = self.poll() {
            return Some(code);
        }
        if let Err(err) = self.terminate() {
            tracing::debug!(program = %self.spec.program, error = %err, "terminate failed");
        }
        if let Some(code) = self.wait_timeout(timeout) {
            return Some(code);
        }

        tracing::warn!(
            program = %self.spec.program,
            pid = ?self.pid,
            timeout_ms = timeout.as_millis() as u64,
            "process ignored termination signal, killing"
        );
        if let Err(err) = self.kill() {
            tracing::warn!(program = %self.spec.program, error = %err, "kill failed");
        }
        self.wait_timeout(KILL_GRACE)
    }
}
