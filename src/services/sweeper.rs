//! Room lifecycle sweeper — reclaims rooms nobody is present in.
//!
//! DESIGN
//! ======
//! Runs on a fixed interval inside the coordinator loop, so a sweep never
//! interleaves with an event handler. Occupancy is read from the presence
//! registry only: a connection that subscribed with `joinRoom` but never
//! registered presence does not keep a room alive.
//!
//! A room that empties and is swept before anyone rejoins loses its canvas;
//! the next joiner starts from an empty room.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::info;

use crate::services::presence::PresenceRegistry;
use crate::services::room::RoomStore;

/// Ticker for the sweep loop. The first tick fires one full period after
/// start rather than immediately.
#[must_use]
pub fn sweep_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Delete every stored room with no present members. Returns the reclaimed keys.
pub fn sweep(rooms: &mut RoomStore, presence: &PresenceRegistry) -> Vec<String> {
    let mut reclaimed = Vec::new();
    for room_id in rooms.room_ids() {
        if presence.is_occupied(&room_id) {
            continue;
        }
        if let Some(room) = rooms.delete_room(&room_id) {
            info!(%room_id, elements = room.elements.len(), "sweeper: reclaimed empty room");
            reclaimed.push(room_id);
        }
    }
    reclaimed
}

#[cfg(test)]
#[path = "sweeper_test.rs"]
mod tests;
