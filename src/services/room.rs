//! Room state store — the authoritative element sequence per room.
//!
//! DESIGN
//! ======
//! Rooms are created lazily by the first write and looked up explicitly
//! with [`RoomStore::room`], so "never written" and "written, now empty"
//! stay distinguishable. Reads of unknown rooms return an empty sequence
//! rather than an error.
//!
//! TRADE-OFFS
//! ==========
//! `replace_elements` is last-writer-wins with no version check. Two clients
//! racing an undo against a draw will silently lose one of the edits; the
//! coordinator serializes the writes so the sequence itself is never torn.

use std::collections::HashMap;

use crate::state::Element;

/// Stored state of one room.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    /// Draw order; index is z-order.
    pub elements: Vec<Element>,
}

#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Room>,
}

impl RoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The room record, if anything was ever written to it.
    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Snapshot of a room's elements. Unknown rooms read as empty.
    #[must_use]
    pub fn get_elements(&self, room_id: &str) -> Vec<Element> {
        self.room(room_id)
            .map(|room| room.elements.clone())
            .unwrap_or_default()
    }

    pub fn append_element(&mut self, room_id: &str, element: Element) {
        self.room_mut(room_id).elements.push(element);
    }

    pub fn replace_elements(&mut self, room_id: &str, elements: Vec<Element>) {
        self.room_mut(room_id).elements = elements;
    }

    pub fn clear(&mut self, room_id: &str) {
        self.replace_elements(room_id, Vec::new());
    }

    /// Drop everything stored for a room, returning what was there.
    pub fn delete_room(&mut self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    /// Keys of every room currently held.
    #[must_use]
    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn room_mut(&mut self, room_id: &str) -> &mut Room {
        self.rooms.entry(room_id.to_owned()).or_default()
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
