//! Respawn coordinator.
//!
//! Brings NPCs back once their corpse is gone:
//!
//! - [`respawn_on_decay_observer`] reacts to every
//!   [`CorpseDecayedEvent`](crate::events::corpse::CorpseDecayedEvent);
//! - [`respawn_actor`] puts one actor back into a room;
//! - [`check_and_respawn_missing`] compares every room against its declared
//!   roster and fills the gaps. The server runs it once at startup, after the
//!   snapshot has been restored.
//!
//! The coordinator only ever touches room occupants and actor hp. Whether an
//! actor is "still dead" is answered by the corpse index.

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{debug, error, info, warn};

use crate::events::corpse::CorpseDecayedEvent;
use crate::events::roommessage::RoomMessageEvent;
use crate::models::actor::PLAYER_ACTOR_TYPE;
use crate::resources::corpsestore::CorpseStore;
use crate::resources::rooms::RoomStore;
use crate::systems::corpse::capitalized;

/// Observer: respawn the actor whose corpse just decayed.
///
/// The respawn is queued as a command so it runs after the decay that
/// triggered it has finished. Player corpses never lead here, but events for
/// the player actor type are ignored anyway.
pub fn respawn_on_decay_observer(trigger: On<CorpseDecayedEvent>, mut commands: Commands) {
    let event = trigger.event();
    if event.actor_type == PLAYER_ACTOR_TYPE {
        debug!("[Respawn] Ignoring decay of player corpse '{}'", event.corpse_id);
        return;
    }
    let actor_id = event.actor_id.clone();
    let room_id = event.room_id.clone();
    commands.queue(move |world: &mut World| {
        respawn_actor(world, &actor_id, &room_id);
    });
}

/// Put `actor_id` back into `room_id` at full health.
///
/// Fails, returning false, when the room or actor is unknown, the actor is
/// already in the room, or the actor still has a corpse lying somewhere.
pub fn respawn_actor(world: &mut World, actor_id: &str, room_id: &str) -> bool {
    if world.resource::<CorpseStore>().has_active_corpse(actor_id) {
        info!(
            "[Respawn] '{}' still has a corpse, not respawning it yet",
            actor_id
        );
        return false;
    }

    let name = {
        let mut rooms = world.resource_mut::<RoomStore>();
        let Some(room) = rooms.get_room(room_id) else {
            error!(
                "[Respawn] Cannot respawn '{}': room '{}' does not exist",
                actor_id, room_id
            );
            return false;
        };
        if room.has_occupant(actor_id) {
            warn!("[Respawn] '{}' is already in '{}'", actor_id, room_id);
            return false;
        }
        let Some(actor) = rooms.get_actor_mut(actor_id) else {
            error!("[Respawn] Cannot respawn unknown actor '{}'", actor_id);
            return false;
        };
        actor.hp = actor.max_hp;
        let name = actor.name.clone();
        if let Some(room) = rooms.get_room_mut(room_id) {
            room.occupants.push(actor_id.to_string());
        }
        name
    };

    info!("[Respawn] '{}' respawned in '{}'", actor_id, room_id);
    world.trigger(RoomMessageEvent::new(
        room_id,
        format!("{} appears.", capitalized(&name)),
    ));
    true
}

/// Respawn every declared actor that is missing from its room.
///
/// Rooms are visited in id order. An actor is skipped if it has an active
/// corpse or is standing in some other room. Returns the number respawned.
pub fn check_and_respawn_missing(world: &mut World) -> usize {
    let missing: Vec<(String, String)> = {
        let rooms = world.resource::<RoomStore>();
        let corpses = world.resource::<CorpseStore>();
        let mut room_ids: Vec<&String> = rooms.initial_rooms_state.keys().collect();
        room_ids.sort();
        room_ids
            .into_iter()
            .flat_map(|room_id| {
                let roster = &rooms.initial_rooms_state[room_id];
                roster.iter().map(move |actor_id| (room_id, actor_id))
            })
            .filter(|(room_id, actor_id)| {
                let present = rooms
                    .get_room(room_id)
                    .is_some_and(|room| room.has_occupant(actor_id));
                if present || corpses.has_active_corpse(actor_id) {
                    return false;
                }
                if let Some(elsewhere) = rooms.locate_actor(actor_id) {
                    debug!(
                        "[Respawn] '{}' belongs in '{}' but stands in '{}'",
                        actor_id, room_id, elsewhere
                    );
                    return false;
                }
                true
            })
            .map(|(room_id, actor_id)| (room_id.clone(), actor_id.clone()))
            .collect()
    };

    let respawned = missing
        .iter()
        .filter(|(room_id, actor_id)| respawn_actor(world, actor_id, room_id))
        .count();
    if respawned > 0 {
        info!("[Respawn] Reconciliation respawned {} actor(s)", respawned);
    } else {
        debug!("[Respawn] Reconciliation found nothing missing");
    }
    respawned
}
