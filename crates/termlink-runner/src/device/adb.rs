use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use termlink_common::sync::lock;
use termlink_common::{ProcessHandle, ProcessSpec};

use super::{DeviceError, DeviceTool};

/// Time allowed for output to drain after the tool exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// [`DeviceTool`] backed by an `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbTool {
    program: String,
    timeout: Duration,
    cwd: PathBuf,
}

impl AdbTool {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            cwd: std::env::temp_dir(),
        }
    }
}

impl DeviceTool for AdbTool {
    fn run(&self, args: &[&str]) -> Result<String, DeviceError> {
        let spec = ProcessSpec::new(&self.program, &self.cwd).args(args.iter().copied());
        tracing::debug!(command = %spec.command_line(), "device tool");

        let (mut reader, writer) = std::io::pipe()?;
        let writer_err = writer.try_clone()?;
        let mut cmd = spec.command();
        cmd.stdin(Stdio::null()).stdout(writer).stderr(writer_err);
        let child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => DeviceError::NotInstalled(self.program.clone()),
            _ => DeviceError::Io(e),
        })?;
        drop(cmd);
        let handle = ProcessHandle::new(spec, Box::new(child));

        // Drain on a thread so a chatty tool cannot fill the pipe and stall.
        let output = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();
        let drain = {
            let output = Arc::clone(&output);
            thread::Builder::new()
                .name("device-tool-output".into())
                .spawn(move || {
                    let mut buf = [0u8; 4096];
                    loop {
                        match reader.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => lock(&output).extend_from_slice(&buf[..n]),
                        }
                    }
                    let _ = done_tx.send(());
                })
        };
        if let Err(e) = drain {
            let _ = handle.kill();
            return Err(e.into());
        }

        let Some(code) = handle.wait_timeout(self.timeout) else {
            let _ = handle.kill();
            handle.wait_timeout(DRAIN_TIMEOUT);
            tracing::warn!(program = %self.program, ?args, "device tool timed out");
            return Err(DeviceError::Timeout {
                program: self.program.clone(),
                after: self.timeout,
            });
        };

        // A daemon forked by the tool may keep the pipe open; don't wait on it.
        let _ = done_rx.recv_timeout(DRAIN_TIMEOUT);
        let bytes = std::mem::take(&mut *lock(&output));
        let text = String::from_utf8_lossy(&bytes).trim().to_string();

        if code == 0 {
            Ok(text)
        } else if text.is_empty() {
            Err(DeviceError::Failed(format!("{} command failed", self.program)))
        } else {
            Err(DeviceError::Failed(text))
        }
    }
}
