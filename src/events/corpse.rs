//! Corpse decay event.
//!
//! Triggered exactly once for every NPC corpse that expires, either because
//! its decay timer fired or because a restore found it already past due. By
//! the time observers run, the corpse is gone from its room and from the
//! [`CorpseStore`](crate::resources::corpsestore::CorpseStore).
//!
//! # Example
//!
//! ```ignore
//! world.add_observer(|trigger: On<CorpseDecayedEvent>| {
//!     let event = trigger.event();
//!     log::info!("{} can come back in {}", event.actor_id, event.room_id);
//! });
//! ```
//!
//! # Related
//!
//! - [`crate::systems::corpse::on_decay`] – emits this event
//! - [`crate::systems::respawn::respawn_on_decay_observer`] – turns it into a respawn

use bevy_ecs::prelude::*;

#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct CorpseDecayedEvent {
    pub actor_id: String,
    pub actor_type: String,
    /// Room the actor should reappear in.
    pub room_id: String,
    pub corpse_id: String,
}
