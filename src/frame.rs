//! Frame — the message envelope exchanged over the room websocket.
//!
//! ARCHITECTURE
//! ============
//! Every inbound client event and every outbound server event is a Frame.
//! The gateway dispatches on `event` and hands `data` to the handler for
//! that event. Responses to a specific request correlate via `parent_id`;
//! room broadcasts carry the `room_id` they were fanned out to.
//!
//! DESIGN
//! ======
//! - `data` is arbitrary JSON: event payloads range from raw strings
//!   (`getUsers`) to arrays of elements (`syncElements`).
//! - Inbound frames only need `event` and `data`. Everything else has a
//!   default so lightweight clients can send `{"event": .., "data": ..}`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

// =============================================================================
// TYPES
// =============================================================================

/// Position of a frame in an exchange.
///
/// Clients send `request` frames. The server answers a specific request
/// with `done` (or `error`), and pushes unsolicited room events as `request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Request,
    Done,
    Error,
}

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    #[serde(default = "now_ms")]
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    pub event: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub data: serde_json::Value,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Used for inbound events and room broadcasts.
    pub fn request(event: impl Into<String>, data: impl Into<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            room_id: None,
            from: None,
            event: event.into(),
            status: Status::Request,
            data: data.into(),
        }
    }

    /// Private answer to this request under a (possibly different) event name.
    #[must_use]
    pub fn reply(&self, event: impl Into<String>, data: impl Into<serde_json::Value>) -> Self {
        let mut frame = self.respond(Status::Done, data.into());
        frame.event = event.into();
        frame
    }

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let data = serde_json::json!({
            FRAME_CODE: err.error_code(),
            FRAME_MESSAGE: err.to_string(),
            FRAME_RETRYABLE: err.retryable(),
        });
        self.respond(Status::Error, data)
    }

    /// Build a response frame. Inherits `parent_id`, `room_id`, and `event`.
    fn respond(&self, status: Status, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            room_id: self.room_id.clone(),
            from: None,
            event: self.event.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

// =============================================================================
// PAYLOAD ACCESS
// =============================================================================

impl Frame {
    /// String field of an object payload, if present.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    /// Decode the whole payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the payload does not match `T`.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
