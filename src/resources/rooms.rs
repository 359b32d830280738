//! In-memory room and actor store.
//!
//! [`RoomStore`] is the world-query collaborator of the lifecycle systems:
//! room lookup, each room's item and occupant lists, actor lookup, and the
//! declared initial roster of every room (used by the reconciliation sweep).
//!
//! Room item lists hold ids only. For corpses the id is the corpse id, and the
//! corpse itself lives in [`CorpseStore`](crate::resources::corpsestore::CorpseStore).

use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::actor::Actor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Ids of objects lying in the room.
    #[serde(default)]
    pub items: Vec<String>,
    /// Ids of actors currently in the room.
    #[serde(default)]
    pub occupants: Vec<String>,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Room {
            id: id.into(),
            name: name.into(),
            items: Vec::new(),
            occupants: Vec::new(),
        }
    }

    pub fn with_occupant(mut self, actor_id: impl Into<String>) -> Self {
        self.occupants.push(actor_id.into());
        self
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i == item_id)
    }

    pub fn has_occupant(&self, actor_id: &str) -> bool {
        self.occupants.iter().any(|o| o == actor_id)
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct RoomStore {
    pub rooms: FxHashMap<String, Room>,
    pub actors: FxHashMap<String, Actor>,
    /// Declared roster per room: who should be standing there.
    pub initial_rooms_state: FxHashMap<String, Vec<String>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room. Its current occupants become its declared roster.
    pub fn add_room(&mut self, room: Room) {
        self.initial_rooms_state
            .insert(room.id.clone(), room.occupants.clone());
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.insert(actor.id.clone(), actor);
    }

    pub fn get_room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn get_actor(&self, actor_id: &str) -> Option<&Actor> {
        self.actors.get(actor_id)
    }

    pub fn get_actor_mut(&mut self, actor_id: &str) -> Option<&mut Actor> {
        self.actors.get_mut(actor_id)
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Room ids in a stable order.
    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Put an object into a room's item list. No-op if it is already there.
    ///
    /// Returns `false` if the room does not exist.
    pub fn place_item(&mut self, room_id: &str, item_id: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if !room.has_item(item_id) {
            room.items.push(item_id.to_string());
        }
        true
    }

    /// Take an object out of a room's item list. Returns whether it was there.
    pub fn remove_item(&mut self, room_id: &str, item_id: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let before = room.items.len();
        room.items.retain(|i| i != item_id);
        room.items.len() != before
    }

    /// Remove an actor from whatever room it occupies (e.g. when it dies).
    pub fn remove_occupant(&mut self, actor_id: &str) -> Option<String> {
        let room_id = self.locate_actor(actor_id)?.to_string();
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.occupants.retain(|o| o != actor_id);
        }
        Some(room_id)
    }

    /// Room the actor currently stands in, if any.
    pub fn locate_actor(&self, actor_id: &str) -> Option<&str> {
        self.rooms
            .values()
            .find(|room| room.has_occupant(actor_id))
            .map(|room| room.id.as_str())
    }

    /// Total number of occurrences of an actor across all rooms.
    pub fn occupant_count(&self, actor_id: &str) -> usize {
        self.rooms
            .values()
            .map(|room| room.occupants.iter().filter(|o| *o == actor_id).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RoomStore {
        let mut store = RoomStore::new();
        store.add_room(Room::new("R1", "A muddy clearing").with_occupant("goblin_1"));
        store.add_room(Room::new("R2", "A narrow path"));
        store
    }

    #[test]
    fn add_room_records_declared_roster() {
        let store = store();
        assert_eq!(store.initial_rooms_state["R1"], vec!["goblin_1"]);
        assert!(store.initial_rooms_state["R2"].is_empty());
        assert_eq!(store.room_ids(), vec!["R1", "R2"]);
    }

    #[test]
    fn place_item_is_idempotent_and_checks_room() {
        let mut store = store();
        assert!(store.place_item("R1", "corpse_a"));
        assert!(store.place_item("R1", "corpse_a"));
        assert_eq!(store.get_room("R1").unwrap().items.len(), 1);
        assert!(!store.place_item("nowhere", "corpse_a"));
    }

    #[test]
    fn remove_item_reports_presence() {
        let mut store = store();
        store.place_item("R2", "corpse_b");
        assert!(store.remove_item("R2", "corpse_b"));
        assert!(!store.remove_item("R2", "corpse_b"));
        assert!(!store.remove_item("nowhere", "corpse_b"));
    }

    #[test]
    fn locate_and_remove_occupant() {
        let mut store = store();
        assert_eq!(store.locate_actor("goblin_1"), Some("R1"));
        assert_eq!(store.remove_occupant("goblin_1"), Some("R1".to_string()));
        assert_eq!(store.locate_actor("goblin_1"), None);
        assert_eq!(store.occupant_count("goblin_1"), 0);
        // The declared roster is untouched by deaths.
        assert_eq!(store.initial_rooms_state["R1"], vec!["goblin_1"]);
    }
}
