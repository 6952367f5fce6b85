//! Room state and protocol services driven by the hub.
//!
//! ARCHITECTURE
//! ============
//! The stores (`presence`, `room`, `broadcast`) are plain data structures
//! with no locking; the hub task owns one of each. `session` implements the
//! client protocol on top of them and `sweeper` reclaims abandoned rooms.

pub mod broadcast;
pub mod presence;
pub mod room;
pub mod session;
pub mod sweeper;
