//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID, registers an outbound queue with
//! the hub and enters a `select!` loop:
//! - Incoming client frames → parse → forward to the hub
//! - Frames queued by the hub (replies and room broadcasts) → client
//!
//! This task holds no room state. Malformed JSON is the only thing it
//! answers itself; everything else is decided by the hub.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → `Connect` (the hub greets with `connected`)
//! 2. Client sends frames → `Inbound`, in the order they were read
//! 3. Close, socket error, or hub shutdown → `Disconnect`

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{FRAME_CODE, FRAME_MESSAGE, Frame, Status};
use crate::services::session::GatewayError;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();

    // Per-connection queue the hub writes replies and broadcasts into.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_buffer);

    if state.hub.connect(connection_id, client_tx).await.is_err() {
        warn!(%connection_id, "ws: hub unavailable, dropping connection");
        return;
    }
    info!(%connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        if !forward_text(&mut socket, &state, connection_id, &text).await {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            frame = client_rx.recv() => {
                let Some(frame) = frame else { break };
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = state.hub.disconnect(connection_id).await;
    info!(%connection_id, "ws: client disconnected");
}

/// Parse one text message and hand it to the hub. Returns false when the
/// connection should be torn down.
async fn forward_text(socket: &mut WebSocket, state: &AppState, connection_id: Uuid, text: &str) -> bool {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", serde_json::Value::Null)
                .error_from(&GatewayError::InvalidFrame(e.to_string()));
            return send_frame(socket, &err).await.is_ok();
        }
    };

    state.hub.inbound(connection_id, req).await.is_ok()
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.data_str(FRAME_CODE).unwrap_or("-");
        let message = frame.data_str(FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, event = %frame.event, code, message, "ws: send frame status=Error");
    } else {
        debug!(id = %frame.id, event = %frame.event, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
