//! PTY spawn, I/O and teardown.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use termlink_common::process::UNKNOWN_EXIT;
use termlink_common::sync::lock;
use termlink_common::{ChildControl, ProcessHandle, ProcessSpec};

use super::types::{PtyError, DEFAULT_COLS, DEFAULT_ROWS};

// =============================================================================
// CHILD ADAPTER
// =============================================================================

/// Adapts a portable-pty child to [`ChildControl`].
struct PtyChild(Box<dyn portable_pty::Child + Send + Sync>);

impl ChildControl for PtyChild {
    fn pid(&self) -> Option<u32> {
        self.0.process_id()
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.0.try_wait()?.map(|status| match status.signal() {
            Some(description) => signal_number(description).map_or(UNKNOWN_EXIT, |n| -n),
            None => i32::try_from(status.exit_code()).unwrap_or(UNKNOWN_EXIT),
        }))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.0.kill()
    }
}

/// portable-pty reports signal deaths by description (`strsignal`), not
/// number. Recover the number for the common ones.
fn signal_number(description: &str) -> Option<i32> {
    const NAMES: &[(&str, i32)] = &[
        ("Hangup", 1),
        ("Interrupt", 2),
        ("Quit", 3),
        ("Abort", 6),
        ("Killed", 9),
        ("Segmentation fault", 11),
        ("Broken pipe", 13),
        ("Alarm clock", 14),
        ("Terminated", 15),
    ];
    let trailing = description
        .rsplit(|c: char| !c.is_ascii_digit())
        .next()
        .and_then(|digits| digits.parse().ok());
    trailing.or_else(|| {
        NAMES
            .iter()
            .find(|(name, _)| description.starts_with(name))
            .map(|(_, n)| *n)
    })
}

// =============================================================================
// SESSION
// =============================================================================

struct SessionInner {
    handle: ProcessHandle,
    /// Feeds the `pty-writer` thread; `None` once stopped.
    input: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    running: AtomicBool,
    stop_timeout: Duration,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Last owner gone without stop(): make sure the child does not outlive us.
        if self.running.load(Ordering::SeqCst) && self.handle.is_running() {
            let _ = self.handle.kill();
            self.handle.wait_timeout(Duration::from_millis(200));
        }
    }
}

/// A program running inside a 24x80 pseudoterminal.
///
/// Cheap to clone; all clones refer to the same child. Input is queued to a
/// dedicated writer thread, so [`PtySession::write`] never blocks on the pty.
#[derive(Clone)]
pub struct PtySession {
    inner: Arc<SessionInner>,
}

/// Blocking reader over the controlling side of a [`PtySession`].
pub struct PtyReader {
    reader: Box<dyn Read + Send>,
}

impl PtySession {
    /// Spawn `spec` inside a new pty.
    ///
    /// The child gets the pty as stdin/stdout/stderr and its own session.
    /// `spec.env` replaces the inherited environment.
    pub fn start(spec: &ProcessSpec, stop_timeout: Duration) -> Result<(Self, PtyReader), PtyError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: DEFAULT_ROWS,
                cols: DEFAULT_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&spec.program);
        cmd.args(&spec.args);
        cmd.cwd(&spec.cwd);
        cmd.env_clear();
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn {
                program: spec.program.clone(),
                message: e.to_string(),
            })?;

        // Only the child keeps the subordinate side open.
        drop(pair.slave);

        let handle = ProcessHandle::new(spec.clone(), Box::new(PtyChild(child)));

        // Built before the fallible steps below so an error still kills the child.
        let reader = pair.master.try_clone_reader();
        let writer = pair.master.take_writer();
        let inner = Arc::new(SessionInner {
            handle,
            input: Mutex::new(None),
            master: Mutex::new(None),
            running: AtomicBool::new(true),
            stop_timeout,
        });

        let reader = reader.map_err(|e| PtyError::Open(format!("clone reader: {e}")))?;
        let writer = writer.map_err(|e| PtyError::Open(format!("take writer: {e}")))?;
        let (input_tx, input_rx) = mpsc::channel();
        thread::Builder::new()
            .name("pty-writer".into())
            .spawn(move || drain_input(writer, input_rx))
            .map_err(|e| PtyError::Open(format!("spawn writer thread: {e}")))?;
        *lock(&inner.input) = Some(input_tx);
        *lock(&inner.master) = Some(pair.master);

        tracing::info!(
            program = %spec.program,
            pid = ?inner.handle.pid(),
            cwd = %spec.cwd.display(),
            "pty session started"
        );

        Ok((Self { inner }, PtyReader { reader }))
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.handle.pid()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst) && self.inner.handle.is_running()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.inner.handle.exit_code()
    }

    /// Queue bytes for the child's terminal input, in call order.
    ///
    /// Returns at once; a no-op once stopped. Fails with `BrokenPipe` when
    /// the writer thread has given up on the pty.
    pub fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() || !self.inner.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        match lock(&self.inner.input).as_ref() {
            Some(tx) => tx
                .send(bytes.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pty input closed")),
            None => Ok(()),
        }
    }

    /// Terminate the child and release the controlling side.
    ///
    /// SIGTERM first, SIGKILL after the session's stop timeout. Only the
    /// first call does anything; later calls return the recorded exit code.
    pub fn stop(&self) -> Option<i32> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return self.inner.handle.exit_code();
        }

        let code = self.inner.handle.stop(self.inner.stop_timeout);
        drop(lock(&self.inner.input).take());
        drop(lock(&self.inner.master).take());

        tracing::info!(
            program = %self.inner.handle.spec().program,
            pid = ?self.inner.handle.pid(),
            exit_code = ?code,
            "pty session stopped"
        );
        code
    }
}

/// Body of the `pty-writer` thread: write queued input until the queue
/// closes or the pty stops accepting it.
fn drain_input(mut writer: Box<dyn Write + Send>, input: mpsc::Receiver<Vec<u8>>) {
    for bytes in input {
        if let Err(e) = writer.write_all(&bytes).and_then(|()| writer.flush()) {
            tracing::debug!(error = %e, "pty write ended");
            return;
        }
    }
}

impl PtyReader {
    /// One blocking read of up to `max` bytes.
    ///
    /// Empty on end of stream and on any error, including the EIO Linux
    /// returns once the subordinate side has closed.
    pub fn read(&mut self, max: usize) -> Vec<u8> {
        let mut buf = vec![0u8; max.max(1)];
        match self.reader.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                buf
            }
            Err(e) => {
                tracing::debug!(error = %e, "pty read ended");
                Vec::new()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
