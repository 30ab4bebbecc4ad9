//! Per-connection handler: route the upgrade, then hand off to a channel.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::bridge::run_terminal;
use crate::control::run_control;
use crate::route::Route;
use crate::state::AppContext;

pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: AppContext) {
    let mut route = None;
    let callback = |request: &Request, response: Response| match Route::from_uri(request.uri()) {
        Some(found) => {
            route = Some(found);
            Ok(response)
        }
        None => {
            tracing::debug!(peer = %peer, path = %request.uri().path(), "unknown path");
            Err(not_found())
        }
    };

    let ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "WS handshake failed");
            return;
        }
    };

    match route {
        Some(Route::Terminal { cwd }) => run_terminal(ws, cwd, &ctx.config.terminal, peer).await,
        Some(Route::Control) => run_control(ws, ctx, peer).await,
        None => {}
    }
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Not Found".into()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
