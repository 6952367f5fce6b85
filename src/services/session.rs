//! Session gateway — per-connection protocol state machine.
//!
//! DESIGN
//! ======
//! A connection moves `Unbound -> Joined(room) -> Closed`. Every inbound
//! frame is dispatched by event name to a handler that validates the
//! payload, mutates presence and/or room state, and returns the list of
//! deliveries it wants made. Handlers never send frames themselves: the
//! dispatch layer owns all outbound traffic, which keeps the
//! private-reply vs room-broadcast split explicit and testable.
//!
//! ROOM KEYS
//! =========
//! Payloads name their room as `roomid`, `roomId`, or (for `getUsers`) a
//! bare string. A payload that names no room is not rejected; it lands in
//! the shared [`UNSPECIFIED_ROOM`] bucket.
//!
//! MEMBERSHIP
//! ==========
//! A connection holds at most one presence record. A repeated `userJoined`
//! replaces the previous record. Broadcast-group subscriptions accumulate:
//! `joinRoom` and `userJoined` both subscribe, nothing unsubscribes short of
//! disconnect.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{ErrorCode, Frame};
use crate::hub::Engine;
use crate::state::{ChatMessage, Element, User};

/// Room key used when a payload does not name one.
pub const UNSPECIFIED_ROOM: &str = "undefined";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no room yet.
    Unbound,
    /// Most recent room joined via `userJoined` or `joinRoom`.
    Joined { room_id: String },
    /// Disconnected. Terminal.
    Closed,
}

/// One outbound effect requested by a handler.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Private frame to the requesting connection.
    Reply(Frame),
    /// Every member of the room, requester included.
    Room { room_id: String, frame: Frame },
    /// Every member of the room except the requester.
    RoomExceptSender { room_id: String, frame: Frame },
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid {event} payload: {reason}")]
    InvalidPayload { event: String, reason: String },
    #[error("{0} requires joining a room first")]
    NotJoined(String),
}

impl ErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFrame(_) => "E_INVALID_FRAME",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::InvalidPayload { .. } => "E_INVALID_PAYLOAD",
            Self::NotJoined(_) => "E_NOT_JOINED",
        }
    }
}

type Outcome = Result<Vec<Delivery>, GatewayError>;

#[derive(Debug, Default, Deserialize)]
struct UserJoinedPayload {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct DrawPayload {
    element: Element,
}

#[derive(Debug, Deserialize)]
struct SyncPayload {
    elements: Vec<Element>,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Register a freshly upgraded connection and greet it with its id.
pub fn connect(engine: &mut Engine, connection_id: Uuid, tx: mpsc::Sender<Frame>) {
    if engine.router.is_registered(connection_id) {
        warn!(%connection_id, "session: connection id reused, replacing sender");
    }
    engine.router.register(connection_id, tx);
    engine.sessions.insert(connection_id, SessionState::Unbound);
    let welcome = Frame::request("connected", json!({ "connectionId": connection_id }));
    engine.router.send_to(connection_id, welcome);
    info!(%connection_id, connections = engine.router.connection_count(), "session: connected");
}

/// Tear down a connection. Remaining room members hear about the departure
/// only if the connection had registered presence.
pub fn disconnect(engine: &mut Engine, connection_id: Uuid) {
    engine.router.unregister(connection_id);
    engine.sessions.remove(&connection_id);

    let Some(user) = engine.presence.remove(connection_id) else {
        info!(%connection_id, "session: disconnected");
        return;
    };
    info!(%connection_id, room_id = %user.room_id, name = %user.name, "session: user left room");

    let mut deliveries = vec![Delivery::RoomExceptSender {
        room_id: user.room_id.clone(),
        frame: Frame::request("userLeftNotification", format!("{} left the room", user.name)),
    }];
    deliveries.extend(presence_refresh(engine, &user.room_id));
    apply(engine, connection_id, None, deliveries);
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Process one inbound frame for `connection_id`. Frames from closed or
/// unknown connections are dropped.
pub fn handle_frame(engine: &mut Engine, connection_id: Uuid, mut req: Frame) {
    let state = engine.session_state(connection_id);
    if state == SessionState::Closed {
        debug!(%connection_id, event = %req.event, "session: frame after close dropped");
        return;
    }

    req.from = Some(connection_id.to_string());
    debug!(%connection_id, id = %req.id, event = %req.event, "session: recv frame");

    let result = match req.event.as_str() {
        "userJoined" => user_joined(engine, connection_id, &req),
        "joinRoom" => join_room(engine, connection_id, &req),
        "draw" => draw(engine, connection_id, &state, &req),
        "syncElements" => sync_elements(engine, connection_id, &state, &req),
        "clearCanvas" => clear_canvas(engine, connection_id, &state, &req),
        "getCurrentElements" => Ok(get_current_elements(engine, &req)),
        "sendMessage" => send_message(connection_id, &state, &req),
        "getUsers" => Ok(get_users(engine, &req)),
        other => Err(GatewayError::UnknownEvent(other.to_owned())),
    };

    match result {
        Ok(deliveries) => apply(engine, connection_id, Some(&req), deliveries),
        Err(e) => {
            warn!(%connection_id, event = %req.event, error = %e, "session: event rejected");
            engine.router.send_to(connection_id, req.error_from(&e));
        }
    }
}

/// Carry out handler deliveries. Room frames are stamped with the
/// originating request's `from` when there is one.
fn apply(engine: &Engine, connection_id: Uuid, req: Option<&Frame>, deliveries: Vec<Delivery>) {
    for delivery in deliveries {
        match delivery {
            Delivery::Reply(frame) => {
                engine.router.send_to(connection_id, frame);
            }
            Delivery::Room { room_id, frame } => {
                let frame = stamp_origin(frame, req);
                let delivered = engine.router.to_room(&room_id, &frame);
                debug!(%room_id, event = %frame.event, delivered, "session: room broadcast");
            }
            Delivery::RoomExceptSender { room_id, frame } => {
                let frame = stamp_origin(frame, req);
                let delivered = engine.router.to_room_except(connection_id, &room_id, &frame);
                debug!(%room_id, event = %frame.event, delivered, "session: peer broadcast");
            }
        }
    }
}

fn stamp_origin(frame: Frame, req: Option<&Frame>) -> Frame {
    match req.and_then(|r| r.from.clone()) {
        Some(from) => frame.with_from(from),
        None => frame,
    }
}

// =============================================================================
// PRESENCE HANDLERS
// =============================================================================

fn user_joined(engine: &mut Engine, connection_id: Uuid, req: &Frame) -> Outcome {
    let room_id = room_key(req);
    let payload: UserJoinedPayload = req.payload().unwrap_or_default();

    let mut deliveries = Vec::new();
    if let Some(previous) = engine.presence.remove(connection_id) {
        if previous.room_id != room_id {
            deliveries.extend(presence_refresh(engine, &previous.room_id));
        }
    }

    engine.router.join(connection_id, &room_id);
    let user = engine.presence.add(connection_id, payload.name, room_id.clone());
    engine
        .sessions
        .insert(connection_id, SessionState::Joined { room_id: room_id.clone() });
    info!(%connection_id, %room_id, name = %user.name, "session: user joined room");

    let elements = engine.rooms.get_elements(&room_id);
    deliveries.push(Delivery::Reply(req.reply("userIsJoined", json!({ "success": true, "user": req.data }))));
    deliveries.push(Delivery::Reply(req.reply("initialElements", to_json(&elements))));
    deliveries.push(Delivery::Room {
        room_id: room_id.clone(),
        frame: Frame::request("userJoinedNotification", format!("{} joined the room", user.name)),
    });
    deliveries.extend(presence_refresh(engine, &room_id));
    Ok(deliveries)
}

fn join_room(engine: &mut Engine, connection_id: Uuid, req: &Frame) -> Outcome {
    let room_id = room_key(req);
    engine.router.join(connection_id, &room_id);
    engine
        .sessions
        .insert(connection_id, SessionState::Joined { room_id: room_id.clone() });

    let elements = engine.rooms.get_elements(&room_id);
    info!(%connection_id, %room_id, elements = elements.len(), "session: subscribed to room");

    let joined = json!({
        "roomId": room_id,
        "elements": elements,
        "message": format!("Joined room {room_id} with {} existing elements", elements.len()),
    });
    Ok(vec![
        Delivery::Reply(req.reply("initialElements", to_json(&elements))),
        Delivery::Reply(req.reply("roomJoined", joined)),
    ])
}

fn get_users(engine: &Engine, req: &Frame) -> Vec<Delivery> {
    let users = engine.presence.list_by_room(&room_key(req));
    vec![Delivery::Reply(req.reply("users", to_json(&users)))]
}

/// Member count and list, pushed to everyone in the room.
fn presence_refresh(engine: &Engine, room_id: &str) -> [Delivery; 2] {
    let users: Vec<User> = engine.presence.list_by_room(room_id);
    [
        Delivery::Room { room_id: room_id.to_owned(), frame: Frame::request("updateUserCount", users.len()) },
        Delivery::Room { room_id: room_id.to_owned(), frame: Frame::request("updateUserList", to_json(&users)) },
    ]
}

// =============================================================================
// CANVAS HANDLERS
// =============================================================================

fn draw(engine: &mut Engine, connection_id: Uuid, state: &SessionState, req: &Frame) -> Outcome {
    require_joined(state, req)?;
    let room_id = room_key(req);
    let DrawPayload { element } = decode(req)?;

    let frame = Frame::request("draw", to_json(&element));
    engine.rooms.append_element(&room_id, element);
    debug!(%connection_id, %room_id, "session: element appended");

    Ok(vec![Delivery::RoomExceptSender { room_id, frame }])
}

fn sync_elements(engine: &mut Engine, connection_id: Uuid, state: &SessionState, req: &Frame) -> Outcome {
    require_joined(state, req)?;
    let room_id = room_key(req);
    let SyncPayload { elements } = decode(req)?;

    debug!(%connection_id, %room_id, count = elements.len(), "session: elements replaced");
    let frame = Frame::request("syncElements", to_json(&elements));
    engine.rooms.replace_elements(&room_id, elements);

    Ok(vec![Delivery::RoomExceptSender { room_id, frame }])
}

fn clear_canvas(engine: &mut Engine, connection_id: Uuid, state: &SessionState, req: &Frame) -> Outcome {
    require_joined(state, req)?;
    let room_id = room_key(req);
    engine.rooms.clear(&room_id);
    info!(%connection_id, %room_id, "session: canvas cleared");

    Ok(vec![Delivery::Room { room_id, frame: Frame::request("canvasCleared", Value::Null) }])
}

fn get_current_elements(engine: &Engine, req: &Frame) -> Vec<Delivery> {
    let elements = engine.rooms.get_elements(&room_key(req));
    vec![Delivery::Reply(req.reply("currentElements", to_json(&elements)))]
}

// =============================================================================
// CHAT HANDLER
// =============================================================================

fn send_message(connection_id: Uuid, state: &SessionState, req: &Frame) -> Outcome {
    require_joined(state, req)?;
    let message: ChatMessage = decode(req)?;
    let room_id = message.room_id.clone().unwrap_or_else(|| room_key(req));
    debug!(%connection_id, %room_id, id = %message.id, "session: chat message");

    Ok(vec![Delivery::Room { room_id, frame: Frame::request("newMessage", to_json(&message)) }])
}

// =============================================================================
// HELPERS
// =============================================================================

/// Resolve the room a frame targets: payload `roomid`, payload `roomId`,
/// a bare string payload, the envelope `room_id`, then the sentinel.
#[must_use]
pub fn room_key(req: &Frame) -> String {
    let from_data = match &req.data {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("roomid")
            .or_else(|| map.get("roomId"))
            .and_then(Value::as_str),
        _ => None,
    };
    from_data
        .or(req.room_id.as_deref())
        .unwrap_or(UNSPECIFIED_ROOM)
        .to_owned()
}

fn require_joined(state: &SessionState, req: &Frame) -> Result<(), GatewayError> {
    match state {
        SessionState::Joined { .. } => Ok(()),
        _ => Err(GatewayError::NotJoined(req.event.clone())),
    }
}

fn decode<T: serde::de::DeserializeOwned>(req: &Frame) -> Result<T, GatewayError> {
    req.payload()
        .map_err(|e| GatewayError::InvalidPayload { event: req.event.clone(), reason: e.to_string() })
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
