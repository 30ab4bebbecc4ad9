//! Terminal channel: one WebSocket connection drives one pty session.
//!
//! Output runs on a dedicated OS thread (pty reads block) and reaches the
//! socket through a bounded channel. Input frames are queued to the
//! session's writer thread in arrival order, so a pty that is slow to take
//! input never stalls the loop that drains its output. Whichever side ends
//! first ends both, and the session is stopped exactly once by
//! [`SessionGuard`].

use std::net::SocketAddr;
use std::thread;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use termlink_config::TerminalConfig;
use termlink_terminal::{pump_output, resolve_command, PtySession, Utf8Decoder};

/// Output chunks buffered between the reader thread and the socket.
const OUTPUT_CHANNEL_DEPTH: usize = 64;

// =============================================================================
// SESSION GUARD
// =============================================================================

/// Stops the session when the bridge ends, on every path out.
struct SessionGuard {
    session: Option<PtySession>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let stop = move || {
            let code = session.stop();
            tracing::debug!(?code, "terminal session stopped");
        };
        // Stopping may wait out the grace period; keep it off the executor.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(stop);
            }
            Err(_) => stop(),
        }
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

/// Serve a terminal session on `ws` until either side goes away.
pub async fn run_terminal<S>(
    ws: WebSocketStream<S>,
    cwd: Option<String>,
    config: &TerminalConfig,
    peer: SocketAddr,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    let started = resolve_command(config, cwd.as_deref())
        .map_err(|e| e.to_string())
        .and_then(|spec| {
            tracing::info!(peer = %peer, command = %spec.command_line(), cwd = %spec.cwd.display(), "starting terminal");
            PtySession::start(&spec, config.stop_timeout()).map_err(|e| e.to_string())
        });
    let (session, mut reader) = match started {
        Ok(pair) => pair,
        Err(message) => {
            tracing::warn!(peer = %peer, error = %message, "terminal setup failed");
            reject(&mut sink, &message).await;
            return;
        }
    };
    let _guard = SessionGuard {
        session: Some(session.clone()),
    };

    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(OUTPUT_CHANNEL_DEPTH);
    let read_chunk = config.read_chunk;
    let pump_session = session.clone();
    let spawned = thread::Builder::new()
        .name("pty-reader".into())
        .spawn(move || {
            let summary = pump_output(
                || reader.read(read_chunk),
                &pump_session,
                |chunk| tx.blocking_send(chunk).is_ok(),
            );
            tracing::debug!(
                bytes = summary.bytes_read,
                replies = summary.replies,
                receiver_gone = summary.receiver_gone,
                "pty reader finished"
            );
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to spawn pty reader thread");
        return;
    }

    let mut decoder = Utf8Decoder::new();
    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(bytes) => {
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() && sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    // Child exited or the pty closed.
                    let tail = decoder.finish();
                    if !tail.is_empty() {
                        let _ = sink.send(Message::Text(tail.into())).await;
                    }
                    let _ = sink.close().await;
                    break;
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = session.write(text.as_bytes()) {
                        tracing::debug!(peer = %peer, error = %e, "pty write failed");
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if let Err(e) = session.write(&data) {
                        tracing::debug!(peer = %peer, error = %e, "pty write failed");
                        break;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(peer = %peer, error = %e, "WS error");
                    break;
                }
                _ => {}
            }
        }
    }

    tracing::info!(peer = %peer, exit_code = ?session.exit_code(), "terminal closed");
}

/// Report a setup failure and close with 1011.
async fn reject<S>(sink: &mut SplitSink<WebSocketStream<S>, Message>, message: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = sink
        .send(Message::Text(format!("Error: {message}\r\n").into()))
        .await;
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Error,
            reason: "terminal setup failed".into(),
        })))
        .await;
    let _ = sink.close().await;
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    async fn pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (server, client)
    }

    fn config(command: &str) -> TerminalConfig {
        TerminalConfig {
            command: Some(command.into()),
            stop_timeout_ms: 500,
            ..TerminalConfig::default()
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    /// Collect text frames until `done` holds or the stream ends.
    async fn read_until(
        client: &mut WebSocketStream<DuplexStream>,
        done: impl Fn(&str) -> bool,
    ) -> String {
        let mut text = String::new();
        let _ = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(Ok(frame)) = client.next().await {
                match frame {
                    Message::Text(t) => {
                        text.push_str(t.as_str());
                        if done(&text) {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        })
        .await;
        text
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_cwd_reports_and_closes_with_1011() {
        let (server, mut client) = pair().await;
        let cfg = config("/bin/cat");
        let bridge = tokio::spawn(async move {
            run_terminal(server, Some("/definitely/not/here".into()), &cfg, peer()).await
        });

        let first = client.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            Message::Text("Error: Working directory not found: /definitely/not/here\r\n".into())
        );
        match client.next().await.unwrap().unwrap() {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Error),
            other => panic!("expected close frame, got {other:?}"),
        }
        bridge.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_program_reports_error() {
        let (server, mut client) = pair().await;
        let cfg = TerminalConfig {
            program: "termlink-no-such-program".into(),
            ..TerminalConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_string_lossy().into_owned();
        tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        match client.next().await.unwrap().unwrap() {
            Message::Text(t) => {
                assert!(t.starts_with("Error: termlink-no-such-program not found"));
                assert!(t.ends_with("\r\n"));
            }
            other => panic!("expected error text, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spawn_failure_reports_and_closes_with_1011() {
        use std::os::unix::fs::PermissionsExt;

        let (server, mut client) = pair().await;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken.sh");
        std::fs::write(&script, "#!/definitely/not/an/interpreter\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let cfg = config(&script.to_string_lossy());
        let cwd = dir.path().to_string_lossy().into_owned();
        let bridge = tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        match client.next().await.unwrap().unwrap() {
            Message::Text(t) => {
                assert!(t.starts_with("Error: failed to spawn "), "got {t:?}");
                assert!(t.contains("broken.sh"));
                assert!(t.ends_with("\r\n"));
            }
            other => panic!("expected error text, got {other:?}"),
        }
        match client.next().await.unwrap().unwrap() {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Error),
            other => panic!("expected close frame, got {other:?}"),
        }
        bridge.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn echoes_input_through_the_pty() {
        let (server, mut client) = pair().await;
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_string_lossy().into_owned();
        let cfg = config("/bin/cat");
        tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        client.send(Message::Text("hello\n".into())).await.unwrap();
        let text = read_until(&mut client, |t| t.matches("hello").count() >= 2).await;
        assert!(text.matches("hello").count() >= 2, "got {text:?}");
        client.close(None).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn multi_megabyte_paste_reaches_the_pty() {
        let (server, client) = pair().await;
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_string_lossy().into_owned();
        let cfg = config("/bin/cat");
        tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        let mut paste = "the quick brown fox jumps over the lazy dog\n".repeat(64 * 1024);
        paste.push_str("paste-done\n");
        assert!(paste.len() > 2 * 1024 * 1024);

        let (mut tx, mut rx) = client.split();
        let send = tokio::spawn(async move { tx.send(Message::Text(paste.into())).await });

        let marker = "paste-done";
        let received = tokio::time::timeout(Duration::from_secs(60), async {
            let mut carry = String::new();
            while let Some(Ok(frame)) = rx.next().await {
                let Message::Text(t) = frame else { continue };
                carry.push_str(t.as_str());
                if carry.contains(marker) {
                    return true;
                }
                let mut keep = carry.len().saturating_sub(marker.len() - 1);
                while !carry.is_char_boundary(keep) {
                    keep += 1;
                }
                carry.drain(..keep);
            }
            false
        })
        .await;
        assert_eq!(received.ok(), Some(true), "paste never made it through the pty");
        assert!(send.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cursor_queries_are_answered_not_forwarded() {
        let (server, mut client) = pair().await;
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_string_lossy().into_owned();
        let cfg = config(r"/bin/sh -c 'printf ab\\033[6ncd; sleep 1'");
        tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        let text = read_until(&mut client, |t| t.contains("cd")).await;
        assert!(text.contains("ab"), "got {text:?}");
        assert!(text.contains("cd"), "got {text:?}");
        assert!(!text.contains("\x1b[6n"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn child_exit_closes_the_socket() {
        let (server, mut client) = pair().await;
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_string_lossy().into_owned();
        let cfg = config("/bin/sh -c 'echo bye'");
        let bridge = tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        let text = read_until(&mut client, |_| false).await;
        assert!(text.contains("bye"));
        tokio::time::timeout(Duration::from_secs(10), bridge)
            .await
            .expect("bridge should end when the child exits")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn client_disconnect_stops_the_child() {
        let (server, mut client) = pair().await;
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("pid");
        let cwd = dir.path().to_string_lossy().into_owned();
        let cfg = config("/bin/sh -c 'echo $$ > pid; exec sleep 30'");
        let bridge = tokio::spawn(async move { run_terminal(server, Some(cwd), &cfg, peer()).await });

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        let pid = loop {
            if let Ok(raw) = std::fs::read_to_string(&marker) {
                if let Ok(pid) = raw.trim().parse::<u32>() {
                    break pid;
                }
            }
            assert!(std::time::Instant::now() < deadline, "child never started");
            tokio::time::sleep(Duration::from_millis(20)).await;
        };

        drop(client);
        tokio::time::timeout(Duration::from_secs(10), bridge)
            .await
            .expect("bridge should end on disconnect")
            .unwrap();

        let gone = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let alive = std::process::Command::new("kill")
                    .args(["-0".to_string(), pid.to_string()])
                    .status()
                    .map(|s| s.success())
                    .unwrap_or(false);
                if !alive {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        assert!(gone.is_ok(), "child {pid} survived the disconnect");
    }
}
