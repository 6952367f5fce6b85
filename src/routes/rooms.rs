//! Read-only room inspection over HTTP.
//!
//! These mirror the websocket `getCurrentElements` / `getUsers` queries and
//! go through the same hub, so they never create a room.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::error;

use crate::hub::{HubError, HubStats, RoomSnapshot};
use crate::state::{AppState, User};

fn hub_error_to_status(err: HubError) -> StatusCode {
    error!(error = %err, "rooms: hub unavailable");
    match err {
        HubError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// `GET /api/rooms/{room_id}/elements` — current canvas of a room.
pub async fn get_elements(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, StatusCode> {
    let snapshot = state.hub.snapshot(room_id).await.map_err(hub_error_to_status)?;
    Ok(Json(snapshot))
}

/// `GET /api/rooms/{room_id}/users` — users present in a room.
pub async fn get_users(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<User>>, StatusCode> {
    let users = state.hub.users(room_id).await.map_err(hub_error_to_status)?;
    Ok(Json(users))
}

/// `GET /api/stats` — connection, room and user counters.
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<HubStats>, StatusCode> {
    state.hub.stats().await.map(Json).map_err(hub_error_to_status)
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
