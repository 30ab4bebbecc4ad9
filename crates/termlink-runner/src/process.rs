//! Long-lived named processes with a bounded output log.
//!
//! A [`NamedProcess`] runs with stdin piped and stdout/stderr merged into a
//! single pipe. One collector thread per run reads that pipe line by line
//! into a [`LogBuffer`] and records the exit once the pipe closes.

use std::io::{BufRead, BufReader, PipeReader, Write};
use std::process::{ChildStdin, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use termlink_common::sync::lock;
use termlink_common::{ProcessError, ProcessHandle, ProcessSpec};

use crate::log_buffer::LogBuffer;

/// How long the collector waits for an exit status after end of output.
const EXIT_SETTLE: Duration = Duration::from_secs(1);

#[derive(Default)]
struct RunState {
    handle: Option<Arc<ProcessHandle>>,
    started_at: Option<DateTime<Utc>>,
    exited_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of a [`NamedProcess`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSnapshot {
    pub name: String,
    pub command: String,
    pub running: bool,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub exited_at: Option<DateTime<Utc>>,
}

pub struct NamedProcess {
    name: String,
    spec: ProcessSpec,
    log: Arc<LogBuffer>,
    state: Arc<Mutex<RunState>>,
    /// Shared so a write can run outside the lock.
    stdin: Mutex<Option<Arc<ChildStdin>>>,
}

impl NamedProcess {
    pub fn new(name: impl Into<String>, spec: ProcessSpec, log_capacity: usize) -> Self {
        Self {
            name: name.into(),
            spec,
            log: Arc::new(LogBuffer::new(log_capacity)),
            state: Arc::new(Mutex::new(RunState::default())),
            stdin: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn handle(&self) -> Option<Arc<ProcessHandle>> {
        lock(&self.state).handle.clone()
    }

    /// Spawn the process unless it is already running.
    pub fn start(&self) -> Result<(), ProcessError> {
        let mut state = lock(&self.state);
        if state.handle.as_ref().is_some_and(|h| h.is_running()) {
            return Ok(());
        }
        if !self.spec.cwd.is_dir() {
            return Err(ProcessError::WorkdirMissing(self.spec.cwd.clone()));
        }

        let (reader, writer) = std::io::pipe()?;
        let writer_err = writer.try_clone()?;
        let mut cmd = self.spec.command();
        cmd.stdin(Stdio::piped()).stdout(writer).stderr(writer_err);
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: self.spec.program.clone(),
            source,
        })?;
        // The command holds our copies of the write end; EOF needs them gone.
        drop(cmd);

        let stdin = child.stdin.take().map(Arc::new);
        let handle = Arc::new(ProcessHandle::new(self.spec.clone(), Box::new(child)));

        let collector = {
            let log = Arc::clone(&self.log);
            let state = Arc::clone(&self.state);
            let handle = Arc::clone(&handle);
            let name = self.name.clone();
            thread::Builder::new()
                .name(format!("collect-{}", self.name))
                .spawn(move || collect(name, reader, log, handle, state))
        };
        if let Err(e) = collector {
            let _ = handle.kill();
            handle.wait_timeout(Duration::from_secs(1));
            return Err(ProcessError::Io(e));
        }

        *lock(&self.stdin) = stdin;
        state.started_at = Some(handle.started_at());
        state.exited_at = None;
        state.handle = Some(Arc::clone(&handle));

        tracing::info!(
            name = %self.name,
            pid = ?handle.pid(),
            command = %self.spec.command_line(),
            cwd = %self.spec.cwd.display(),
            "process started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle().is_some_and(|h| h.is_running())
    }

    /// Send `text` to the process's stdin. Ignored when not running;
    /// write errors are swallowed.
    ///
    /// The pipe write itself happens outside the lock, so a child that has
    /// stopped reading never holds up [`NamedProcess::stop`].
    pub fn write(&self, text: &str) {
        if !self.is_running() {
            return;
        }
        let Some(pipe) = lock(&self.stdin).clone() else {
            return;
        };
        let mut pipe = &*pipe;
        if let Err(e) = pipe.write_all(text.as_bytes()).and_then(|_| pipe.flush()) {
            tracing::debug!(name = %self.name, error = %e, "stdin write failed");
        }
    }

    /// Terminate, wait up to `timeout`, then kill. Returns the exit code.
    pub fn stop(&self, timeout: Duration) -> Option<i32> {
        let handle = self.handle()?;
        drop(lock(&self.stdin).take());

        let code = handle.stop(timeout);
        let exited_at = handle.exit().map_or_else(Utc::now, |record| record.at);
        let mut state = lock(&self.state);
        if state.exited_at.is_none() {
            state.exited_at = Some(exited_at);
        }
        drop(state);

        tracing::info!(name = %self.name, exit_code = ?code, "process stopped");
        code
    }

    pub fn logs(&self) -> Vec<String> {
        self.log.snapshot()
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        let (handle, started_at, exited_at) = {
            let state = lock(&self.state);
            (state.handle.clone(), state.started_at, state.exited_at)
        };
        ProcessSnapshot {
            name: self.name.clone(),
            command: self.spec.command_line(),
            running: handle.as_ref().is_some_and(|h| h.is_running()),
            pid: handle.as_ref().and_then(|h| h.pid()),
            exit_code: handle.as_ref().and_then(|h| h.exit_code()),
            started_at,
            exited_at,
        }
    }
}

impl Drop for NamedProcess {
    fn drop(&mut self) {
        if let Some(handle) = self.handle() {
            if handle.is_running() {
                let _ = handle.kill();
                handle.wait_timeout(Duration::from_millis(200));
            }
        }
    }
}

fn collect(
    name: String,
    reader: PipeReader,
    log: Arc<LogBuffer>,
    handle: Arc<ProcessHandle>,
    state: Arc<Mutex<RunState>>,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => log.push(String::from_utf8_lossy(&buf).trim_end()),
            Err(e) => {
                tracing::debug!(name = %name, error = %e, "output read failed");
                break;
            }
        }
    }

    // Output closed. The child is normally gone too, but a descendant may
    // have been holding the pipe, or the child closed it early.
    let Some(code) = handle.wait_timeout(EXIT_SETTLE) else {
        tracing::debug!(name = %name, "output closed while process still running");
        return;
    };
    let exited_at = handle.exit().map_or_else(Utc::now, |record| record.at);

    let mut state = lock(&state);
    let current = state.handle.as_ref().is_some_and(|h| Arc::ptr_eq(h, &handle));
    if current && state.exited_at.is_none() {
        state.exited_at = Some(exited_at);
    }
    drop(state);

    tracing::info!(name = %name, exit_code = code, "process exited");
}
