//! Broadcast router — fan-out of frames to a room's connections.
//!
//! DESIGN
//! ======
//! Each live connection registers one outbound `mpsc::Sender<Frame>`; the
//! websocket task drains the other end. A broadcast group is the list of
//! connections subscribed to a room key. Group membership is independent
//! of presence: `joinRoom` subscribes a connection without registering a
//! user, and one connection may be subscribed to several rooms.
//!
//! Delivery is best-effort `try_send`. A client whose queue is full or
//! already closed is skipped rather than stalling the coordinator.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::frame::Frame;

#[derive(Debug, Default)]
pub struct BroadcastRouter {
    /// Outbound sender per live connection.
    clients: HashMap<Uuid, mpsc::Sender<Frame>>,
    /// Room key -> subscribed connections, in subscription order.
    groups: HashMap<String, Vec<Uuid>>,
}

impl BroadcastRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection_id: Uuid, tx: mpsc::Sender<Frame>) {
        self.clients.insert(connection_id, tx);
    }

    /// Forget a connection and drop it from every group it joined.
    pub fn unregister(&mut self, connection_id: Uuid) {
        self.clients.remove(&connection_id);
        self.groups.retain(|_, members| {
            members.retain(|id| *id != connection_id);
            !members.is_empty()
        });
    }

    #[must_use]
    pub fn is_registered(&self, connection_id: Uuid) -> bool {
        self.clients.contains_key(&connection_id)
    }

    /// Subscribe a connection to a room. Joining twice is a no-op.
    pub fn join(&mut self, connection_id: Uuid, room_id: &str) {
        let members = self.groups.entry(room_id.to_owned()).or_default();
        if !members.contains(&connection_id) {
            members.push(connection_id);
        }
    }

    #[must_use]
    pub fn members(&self, room_id: &str) -> &[Uuid] {
        self.groups.get(room_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// Deliver to every member of `room_id`, the caller included when it is
    /// a member. Returns how many queues accepted the frame.
    pub fn to_room(&self, room_id: &str, frame: &Frame) -> usize {
        self.fan_out(room_id, frame, None)
    }

    /// Deliver to every member of `room_id` except `sender`.
    pub fn to_room_except(&self, sender: Uuid, room_id: &str, frame: &Frame) -> usize {
        self.fan_out(room_id, frame, Some(sender))
    }

    /// Private delivery to one connection.
    pub fn send_to(&self, connection_id: Uuid, frame: Frame) -> bool {
        let Some(tx) = self.clients.get(&connection_id) else {
            return false;
        };
        deliver(connection_id, tx, frame)
    }

    fn fan_out(&self, room_id: &str, frame: &Frame, exclude: Option<Uuid>) -> usize {
        let frame = frame.clone().with_room_id(room_id);
        let mut delivered = 0;
        for connection_id in self.members(room_id) {
            if exclude == Some(*connection_id) {
                continue;
            }
            let Some(tx) = self.clients.get(connection_id) else {
                continue;
            };
            if deliver(*connection_id, tx, frame.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}

fn deliver(connection_id: Uuid, tx: &mpsc::Sender<Frame>, frame: Frame) -> bool {
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(frame)) => {
            warn!(%connection_id, event = %frame.event, "broadcast: client queue full, frame dropped");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
