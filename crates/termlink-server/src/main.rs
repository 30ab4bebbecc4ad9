//! termlink: WebSocket server bridging a pty and a mobile project runner.
//!
//! `/ws` attaches a client to a fresh pseudoterminal running the configured
//! program; `/control` drives the React Native / Flutter supervisor.

mod bridge;
mod cli;
mod connection;
mod control;
mod route;
mod state;

use std::sync::Arc;

use termlink_common::TermlinkError;
use termlink_config::TermlinkConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::connection::handle_connection;
use crate::state::AppContext;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let loaded = termlink_config::load_config(args.config.as_deref());
    let filter = match &args.log_level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match &loaded {
                Ok(config) => config.logging.directive(),
                Err(_) => "termlink=info".to_string(),
            };
            EnvFilter::new(directive)
        }),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("termlink v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        let mut config = TermlinkConfig::default();
        termlink_config::env_overrides::apply_env_overrides(&mut config);
        config
    });
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::debug!("Effective config: {}", termlink_config::config_to_json(&config));

    if let Err(e) = run(config).await {
        tracing::error!("termlink failed: {e}");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}

async fn run(config: TermlinkConfig) -> Result<(), TermlinkError> {
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| TermlinkError::Network(format!("failed to bind {addr}: {e}")))?;
    tracing::info!("termlink listening on {}", addr);

    let ctx = AppContext::new(config);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    // Accept loop.
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move { handle_connection(stream, peer, ctx).await });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            },
        }
    }

    tracing::info!("Stopping project processes");
    let supervisor = Arc::clone(&ctx.supervisor);
    if let Err(e) = tokio::task::spawn_blocking(move || supervisor.stop()).await {
        tracing::warn!(error = %e, "supervisor shutdown failed");
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}
