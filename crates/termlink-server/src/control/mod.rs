//! Control channel: JSON requests in, one JSON response out per request.

mod dispatch;
pub mod protocol;

use dispatch::dispatch;

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::state::AppContext;
use protocol::{ControlRequest, ControlResponse};

/// Serve control requests on `ws` until the client goes away.
pub async fn run_control<S>(ws: WebSocketStream<S>, ctx: AppContext, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    tracing::info!(peer = %peer, "control client connected");

    while let Some(frame) = stream.next().await {
        let response = match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ControlRequest>(&text) {
                Ok(request) => {
                    tracing::debug!(peer = %peer, ?request, "control request");
                    dispatch(request, &ctx).await
                }
                Err(e) => ControlResponse::error(format!("invalid request: {e}")),
            },
            Ok(Message::Binary(_)) => ControlResponse::error("binary frames are not supported"),
            Ok(Message::Ping(data)) => {
                let _ = sink.send(Message::Pong(data)).await;
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "WS error");
                break;
            }
        };

        if sink.send(Message::Text(response.to_json().into())).await.is_err() {
            break;
        }
    }

    tracing::info!(peer = %peer, "control client disconnected");
}
