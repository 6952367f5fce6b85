//! Presence registry — which connection sits in which room under what name.
//!
//! DESIGN
//! ======
//! A flat list in join order. Room membership is never stored separately;
//! it is computed by filtering this list, so a room's member count can
//! never drift from the records that back it. The registry emits nothing:
//! the session gateway decides what to broadcast after calling it.

use uuid::Uuid;

use crate::state::User;

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    users: Vec<User>,
}

impl PresenceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Connection ids are unique per live connection, so no
    /// collision check is made here.
    pub fn add(&mut self, connection_id: Uuid, name: impl Into<String>, room_id: impl Into<String>) -> User {
        let user = User { connection_id, name: name.into(), room_id: room_id.into() };
        self.users.push(user.clone());
        user
    }

    /// Remove and return the record for `connection_id`, if any.
    pub fn remove(&mut self, connection_id: Uuid) -> Option<User> {
        let index = self
            .users
            .iter()
            .position(|u| u.connection_id == connection_id)?;
        Some(self.users.remove(index))
    }

    #[must_use]
    pub fn get(&self, connection_id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.connection_id == connection_id)
    }

    /// Members of `room_id` in join order.
    #[must_use]
    pub fn list_by_room(&self, room_id: &str) -> Vec<User> {
        self.users
            .iter()
            .filter(|u| u.room_id == room_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_occupied(&self, room_id: &str) -> bool {
        self.users.iter().any(|u| u.room_id == room_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
