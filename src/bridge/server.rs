//! WebSocket Server
//!
//! Accepts UI connections, greets them, and feeds their text frames to the
//! controller. Each connection has a writer task draining its bounded
//! outbound channel; the hub holds the sending half.

use super::controller::Controller;
use super::hub::{ClientId, Frame};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared state for WebSocket handlers
pub struct BridgeState {
    pub controller: Arc<Controller>,
    pub client_buffer: usize,
}

impl BridgeState {
    pub fn new(controller: Arc<Controller>, client_buffer: usize) -> Self {
        Self {
            controller,
            client_buffer: client_buffer.max(1),
        }
    }
}

/// Upgrade endpoint on both `/` and `/ws`
pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<BridgeState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<BridgeState>) {
    let controller = Arc::clone(&state.controller);
    let hub = Arc::clone(controller.hub());

    let (tx, rx) = mpsc::channel::<Frame>(state.client_buffer);
    let client = hub.register(tx).await;
    hub.send_to(client, &controller.connection_event()).await;

    let (ws_tx, mut ws_rx) = socket.split();
    let mut writer = tokio::spawn(write_frames(client, ws_tx, rx));

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    controller.handle_raw(client, text.as_str()).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("Ignoring {} byte binary frame from client {}", data.len(), client);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("⚠️ Client {} socket error: {}", client, e);
                    break;
                }
            },
            _ = &mut writer => {
                debug!("Writer for client {} finished", client);
                break;
            }
        }
    }

    hub.unregister(client).await;
    writer.abort();
}

async fn write_frames(
    client: ClientId,
    mut ws_tx: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Frame>,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = ws_tx.send(Message::Text(frame.to_string().into())).await {
            debug!("Send to client {} failed: {}", client, e);
            break;
        }
    }
    let _ = ws_tx.close().await;
    debug!("Connection to client {} closed", client);
}
