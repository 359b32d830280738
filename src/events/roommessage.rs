//! Room broadcast event.
//!
//! Text that everyone in a room should see: a corpse rotting away, remains
//! crumbling after looting, a creature reappearing. Delivering it to
//! connected players is up to the session layer, which observes this event.

use bevy_ecs::prelude::*;

#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct RoomMessageEvent {
    pub room_id: String,
    pub message: String,
}

impl RoomMessageEvent {
    pub fn new(room_id: impl Into<String>, message: impl Into<String>) -> Self {
        RoomMessageEvent {
            room_id: room_id.into(),
            message: message.into(),
        }
    }
}
