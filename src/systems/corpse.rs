//! Corpse lifecycle systems.
//!
//! Every function here is exclusive over `&mut World` because a corpse lives
//! in three places at once and they have to change together:
//!
//! - the [`CorpseStore`] table and its actor/owner indexes,
//! - the item list of the [`Room`](crate::resources::rooms::Room) it lies in,
//! - the [`TimerScheduler`], which holds the NPC decay timer
//!   (`corpse_decay_<id>`) or the post-loot cleanup timer
//!   (`corpse_cleanup_<id>`).
//!
//! # NPC corpses
//!
//! [`create_actor_corpse`] takes the actor out of its room, drops its loot
//! into a corpse and schedules the decay timer. When the timer fires,
//! [`corpse_decay_handler`] calls [`on_decay`], which removes the corpse and
//! then triggers [`RoomMessageEvent`] and [`CorpseDecayedEvent`] in that order.
//!
//! # Player corpses
//!
//! [`create_player_corpse`] strips the player of everything they carry. The
//! corpse has no timer until its owner loots it ([`mark_looted`]); after the
//! grace period [`corpse_cleanup_handler`] removes it. Unlooted corpses of
//! players who stopped logging in are removed by
//! [`cleanup_abandoned_corpses`].
//!
//! # Failure policy
//!
//! Nothing here panics or returns an error: missing rooms, unknown ids and
//! bad input are logged and reported as `None` / `false`.

use bevy_ecs::prelude::*;
use log::{debug, error, info, warn};

use crate::events::corpse::CorpseDecayedEvent;
use crate::events::roommessage::RoomMessageEvent;
use crate::models::actor::Actor;
use crate::models::corpse::{Corpse, CorpseKind, NpcCorpse};
use crate::models::item::Item;
use crate::models::player::Player;
use crate::models::wallet::create_wallet;
use crate::resources::corpsestore::{CorpseState, CorpseStore};
use crate::resources::lifecycleconfig::LifecycleConfig;
use crate::resources::loot::LootSource;
use crate::resources::playerdirectory::PlayerDirectory;
use crate::resources::rooms::RoomStore;
use crate::resources::timerhandlers::TimerHandlers;
use crate::resources::timerscheduler::{TimerData, TimerScheduler};
use crate::resources::worldtime::WorldTime;
use crate::systems::timers::schedule_timer_kind;

/// Timer kind of NPC decay timers.
pub const CORPSE_DECAY_KIND: &str = "corpse_decay";
/// Timer kind of post-loot cleanup timers.
pub const CORPSE_CLEANUP_KIND: &str = "corpse_cleanup";
/// Payload key holding the corpse id.
pub const CORPSE_ID_KEY: &str = "corpseId";

pub fn decay_timer_id(corpse_id: &str) -> String {
    format!("corpse_decay_{}", corpse_id)
}

pub fn cleanup_timer_id(corpse_id: &str) -> String {
    format!("corpse_cleanup_{}", corpse_id)
}

/// Outcome of [`restore_corpses`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpseRestoreReport {
    /// Corpses put back into the world.
    pub restored: usize,
    /// NPC corpses that expired while the server was down.
    pub decayed: usize,
    /// Looted player corpses whose grace period ran out while down.
    pub expired: usize,
    /// Entries that could not be restored (missing room, duplicate id).
    pub skipped: usize,
    /// Player corpses held aside because their room is gone.
    pub stranded: usize,
}

fn now(world: &World) -> u64 {
    world.resource::<WorldTime>().now
}

/// `text` with its first character upper-cased, for room messages.
pub(crate) fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Leave a corpse for `actor` in `room_id` and start its decay timer.
///
/// The actor is taken out of whatever room it stands in and its hp drops to
/// zero. If the actor still had a corpse lying around, that one is destroyed
/// first. Loot generation failures only cost the loot.
pub fn create_actor_corpse(
    world: &mut World,
    actor: &Actor,
    room_id: &str,
    killer_name: Option<&str>,
) -> Option<Corpse> {
    if !world.resource::<RoomStore>().has_room(room_id) {
        error!(
            "[Corpse] Cannot create corpse for '{}': room '{}' does not exist",
            actor.id, room_id
        );
        return None;
    }
    let can_decay = world
        .get_resource::<TimerHandlers>()
        .is_some_and(|handlers| handlers.contains(CORPSE_DECAY_KIND));
    if !can_decay {
        error!(
            "[Corpse] Cannot create corpse for '{}': no '{}' handler registered",
            actor.id, CORPSE_DECAY_KIND
        );
        return None;
    }

    let previous = world
        .resource::<CorpseStore>()
        .get_corpse_by_actor(&actor.id)
        .map(|c| c.id.clone());
    if let Some(previous) = previous {
        warn!(
            "[Corpse:{}] Actor '{}' died again, replacing its old corpse",
            previous, actor.id
        );
        destroy_corpse(world, &previous);
    }

    let loot = match world.get_resource::<LootSource>() {
        Some(source) => source.generate(actor).unwrap_or_else(|e| {
            warn!("[Corpse] Loot generation failed for '{}': {}", actor.id, e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    let now = now(world);
    let decay_ms = world.resource::<LifecycleConfig>().npc_decay_ms;
    let corpse_id = world
        .resource::<CorpseStore>()
        .next_corpse_id(&format!("corpse_{}", actor.id), now);
    let corpse = Corpse::for_actor(
        corpse_id.clone(),
        actor,
        room_id,
        killer_name.map(str::to_string),
        loot,
        now,
        now.saturating_add(decay_ms),
    );

    let (left_room, old_hp) = {
        let mut rooms = world.resource_mut::<RoomStore>();
        let left_room = rooms.remove_occupant(&actor.id);
        let old_hp = rooms.get_actor_mut(&actor.id).map(|live| {
            let hp = live.hp;
            live.hp = 0;
            hp
        });
        rooms.place_item(room_id, &corpse_id);
        (left_room, old_hp)
    };
    world.resource_mut::<CorpseStore>().insert(corpse.clone());

    let data = TimerData::new(CORPSE_DECAY_KIND).with(CORPSE_ID_KEY, corpse_id.as_str());
    if !schedule_timer_kind(world, decay_timer_id(&corpse_id), decay_ms, data) {
        // A corpse without a decay timer would never go away.
        world.resource_mut::<CorpseStore>().remove(&corpse_id);
        let mut rooms = world.resource_mut::<RoomStore>();
        rooms.remove_item(room_id, &corpse_id);
        if let Some(left_room) = left_room
            && let Some(room) = rooms.get_room_mut(&left_room)
        {
            room.occupants.push(actor.id.clone());
        }
        if let Some(hp) = old_hp
            && let Some(live) = rooms.get_actor_mut(&actor.id)
        {
            live.hp = hp;
        }
        return None;
    }

    info!(
        "[Corpse:{}] {} died in '{}'{}, {} item(s), decays in {} ms",
        corpse_id,
        actor.id,
        room_id,
        killer_name.map(|k| format!(" (killed by {})", k)).unwrap_or_default(),
        corpse.inventory.len(),
        decay_ms
    );
    Some(corpse)
}

/// Move everything `player` carries into a new corpse in `room_id`.
///
/// Each item with durability loses `durability_loss_percent` of its maximum.
/// The wallet is copied into the corpse and zeroed on the player. Returns
/// `None` without touching the player if the username is empty or the room
/// is missing. No timer is scheduled.
pub fn create_player_corpse(
    world: &mut World,
    player: &mut Player,
    room_id: &str,
    killer: Option<&str>,
) -> Option<Corpse> {
    if player.username.trim().is_empty() {
        error!("[Corpse] Cannot create player corpse: player has no username");
        return None;
    }
    if !world.resource::<RoomStore>().has_room(room_id) {
        error!(
            "[Corpse] Cannot create corpse for player '{}': room '{}' does not exist",
            player.username, room_id
        );
        return None;
    }

    let loss = world.resource::<LifecycleConfig>().durability_loss_percent;
    let mut items: Vec<Item> = std::mem::take(&mut player.inventory);
    items.extend(std::mem::take(&mut player.equipment).into_values());
    let mut damaged = 0;
    for item in &mut items {
        if item.apply_durability_loss(loss) {
            damaged += 1;
        }
    }
    let currency = std::mem::replace(&mut player.currency, create_wallet());

    let now = now(world);
    let corpse_id = world
        .resource::<CorpseStore>()
        .next_corpse_id(&format!("player_corpse_{}", player.username), now);
    let corpse = Corpse::for_player(
        corpse_id.clone(),
        &player.username,
        room_id,
        killer.map(str::to_string),
        items,
        currency,
        now,
    );

    world
        .resource_mut::<RoomStore>()
        .place_item(room_id, &corpse_id);
    world.resource_mut::<CorpseStore>().insert(corpse.clone());

    info!(
        "[Corpse:{}] Player '{}' died in '{}': {} item(s), {} damaged, {} copper",
        corpse_id,
        player.username,
        room_id,
        corpse.inventory.len(),
        damaged,
        currency.total_in_copper()
    );
    Some(corpse)
}

/// Decay an NPC corpse.
///
/// Removes it from its room, from the table and the actor index, cancels any
/// leftover decay timer, then triggers the decay [`RoomMessageEvent`] and
/// [`CorpseDecayedEvent`]. Returns false, doing nothing, for an unknown id or
/// a player corpse.
pub fn on_decay(world: &mut World, corpse_id: &str) -> bool {
    let Some(corpse) = world.resource::<CorpseStore>().get(corpse_id).cloned() else {
        warn!("[Corpse:{}] Decay fired for a corpse that no longer exists", corpse_id);
        return false;
    };
    let Some(npc) = corpse.as_npc().cloned() else {
        warn!("[Corpse:{}] Decay fired for a player corpse, ignoring", corpse_id);
        return false;
    };

    if !world
        .resource_mut::<RoomStore>()
        .remove_item(&corpse.room_id, corpse_id)
    {
        warn!(
            "[Corpse:{}] Was not in the item list of room '{}'",
            corpse_id, corpse.room_id
        );
    }
    world.resource_mut::<CorpseStore>().remove(corpse_id);
    world
        .resource_mut::<TimerScheduler>()
        .cancel(&decay_timer_id(corpse_id));

    info!("[Corpse:{}] Decayed in '{}'", corpse_id, corpse.room_id);
    emit_decay(world, &corpse, npc);
    true
}

/// Tell the room the corpse is gone, then announce the decay.
fn emit_decay(world: &mut World, corpse: &Corpse, npc: NpcCorpse) {
    world.trigger(RoomMessageEvent::new(
        corpse.room_id.clone(),
        format!("{} decays into dust.", capitalized(&corpse.name)),
    ));
    world.trigger(CorpseDecayedEvent {
        actor_id: npc.actor_id,
        actor_type: npc.actor_type,
        room_id: npc.spawn_room_id,
        corpse_id: corpse.id.clone(),
    });
    world.flush();
}

pub fn has_active_corpse(world: &World, actor_id: &str) -> bool {
    world.resource::<CorpseStore>().has_active_corpse(actor_id)
}

pub fn get_corpse_by_actor(world: &World, actor_id: &str) -> Option<Corpse> {
    world
        .resource::<CorpseStore>()
        .get_corpse_by_actor(actor_id)
        .cloned()
}

/// Only the owner may loot a player corpse, and only once.
pub fn can_loot_player_corpse(corpse: &Corpse, player: &Player) -> bool {
    match &corpse.kind {
        CorpseKind::Player(pc) => !pc.looted && pc.owner_username == player.username,
        CorpseKind::Npc(_) => false,
    }
}

/// Flag a player corpse as looted by its owner and start the cleanup timer.
pub fn mark_looted(world: &mut World, corpse_id: &str, player: &Player) -> bool {
    let now = now(world);
    let grace = world.resource::<LifecycleConfig>().player_loot_grace_ms;
    {
        let mut store = world.resource_mut::<CorpseStore>();
        let Some(corpse) = store.get_mut(corpse_id) else {
            warn!("[Corpse:{}] Cannot mark looted: no such corpse", corpse_id);
            return false;
        };
        if !can_loot_player_corpse(corpse, player) {
            info!(
                "[Corpse:{}] '{}' may not loot this corpse",
                corpse_id, player.username
            );
            return false;
        }
        let Some(pc) = corpse.as_player_mut() else {
            return false;
        };
        pc.looted = true;
        pc.looted_at = Some(now);
    }

    let data = TimerData::new(CORPSE_CLEANUP_KIND).with(CORPSE_ID_KEY, corpse_id);
    if !schedule_timer_kind(world, cleanup_timer_id(corpse_id), grace, data) {
        if let Some(pc) = world
            .resource_mut::<CorpseStore>()
            .get_mut(corpse_id)
            .and_then(Corpse::as_player_mut)
        {
            pc.looted = false;
            pc.looted_at = None;
        }
        return false;
    }
    info!(
        "[Corpse:{}] Looted by '{}', cleanup in {} ms",
        corpse_id, player.username, grace
    );
    true
}

/// Give a player back everything in their corpse and mark it looted.
///
/// Items are appended to the player's inventory and the corpse's wallet is
/// added to theirs. Returns false if the player may not loot it.
pub fn reclaim_player_corpse(world: &mut World, corpse_id: &str, player: &mut Player) -> bool {
    if !mark_looted(world, corpse_id, player) {
        info!(
            "[Corpse:{}] '{}' cannot reclaim this corpse",
            corpse_id, player.username
        );
        return false;
    }

    let mut store = world.resource_mut::<CorpseStore>();
    let Some(corpse) = store.get_mut(corpse_id) else {
        return false;
    };
    let items = std::mem::take(&mut corpse.inventory);
    corpse.weight -= items.iter().map(Item::total_weight).sum::<f32>();
    player.inventory.extend(items);
    if let Some(pc) = corpse.as_player_mut() {
        let coins = std::mem::replace(&mut pc.currency, create_wallet());
        player.currency.deposit(coins);
    }
    true
}

/// Remove a corpse of either kind along with any timer it has.
///
/// No events are triggered. Returns false if the corpse is already gone.
pub fn destroy_corpse(world: &mut World, corpse_id: &str) -> bool {
    let Some(corpse) = world.resource_mut::<CorpseStore>().remove(corpse_id) else {
        debug!("[Corpse:{}] Destroy requested, already gone", corpse_id);
        return false;
    };
    {
        let mut timers = world.resource_mut::<TimerScheduler>();
        timers.cancel(&decay_timer_id(corpse_id));
        timers.cancel(&cleanup_timer_id(corpse_id));
    }
    world
        .resource_mut::<RoomStore>()
        .remove_item(&corpse.room_id, corpse_id);
    info!("[Corpse:{}] Destroyed", corpse_id);
    true
}

/// Like [`destroy_corpse`], but refuses NPC corpses.
pub fn destroy_player_corpse(world: &mut World, corpse_id: &str) -> bool {
    let is_player = match world.resource::<CorpseStore>().get(corpse_id) {
        Some(corpse) => corpse.is_player(),
        None => {
            debug!("[Corpse:{}] Destroy requested, already gone", corpse_id);
            return false;
        }
    };
    if !is_player {
        warn!("[Corpse:{}] Not a player corpse, not destroying", corpse_id);
        return false;
    }
    destroy_corpse(world, corpse_id)
}

/// Move an NPC corpse's decay to `delay_ms` from now.
pub fn reset_decay_timer(world: &mut World, corpse_id: &str, delay_ms: u64) -> bool {
    let decay_at = now(world).saturating_add(delay_ms);
    {
        let mut store = world.resource_mut::<CorpseStore>();
        match store.get_mut(corpse_id).map(|c| &mut c.kind) {
            Some(CorpseKind::Npc(npc)) => npc.decay_at = decay_at,
            Some(CorpseKind::Player(_)) => {
                warn!("[Corpse:{}] Player corpses do not decay", corpse_id);
                return false;
            }
            None => {
                warn!("[Corpse:{}] Cannot reset decay: no such corpse", corpse_id);
                return false;
            }
        }
    }
    let data = TimerData::new(CORPSE_DECAY_KIND).with(CORPSE_ID_KEY, corpse_id);
    let scheduled = schedule_timer_kind(world, decay_timer_id(corpse_id), delay_ms, data);
    if scheduled {
        debug!("[Corpse:{}] Decay moved to {} ms from now", corpse_id, delay_ms);
    }
    scheduled
}

fn is_abandoned(
    corpse: &Corpse,
    now: u64,
    threshold: u64,
    directory: &dyn PlayerDirectory,
) -> bool {
    let Some(pc) = corpse.as_player() else {
        return false;
    };
    if pc.looted || now.saturating_sub(corpse.created_at) <= threshold {
        return false;
    }
    match directory.get_player(&pc.owner_username) {
        Some(record) => now.saturating_sub(record.last_login) > threshold,
        None => {
            debug!("[Corpse:{}] Owner '{}' is unknown", corpse.id, pc.owner_username);
            true
        }
    }
}

/// Destroy unlooted player corpses whose owners stopped playing.
///
/// A corpse is removed when it is older than the abandonment threshold and
/// its owner is either unknown to `directory` or last logged in more than the
/// threshold ago. Stranded corpses are held to the same rule. Returns how
/// many corpses were destroyed.
pub fn cleanup_abandoned_corpses(world: &mut World, directory: &dyn PlayerDirectory) -> usize {
    let now = now(world);
    let threshold = world.resource::<LifecycleConfig>().abandonment_threshold_ms;

    let abandoned: Vec<String> = {
        let store = world.resource::<CorpseStore>();
        store
            .player_corpse_ids()
            .into_iter()
            .filter(|id| {
                store
                    .get(id)
                    .is_some_and(|corpse| is_abandoned(corpse, now, threshold, directory))
            })
            .collect()
    };

    let mut removed = abandoned
        .iter()
        .filter(|id| destroy_player_corpse(world, id))
        .count();
    removed += world
        .resource_mut::<CorpseStore>()
        .release_stranded(|corpse| is_abandoned(corpse, now, threshold, directory))
        .len();
    if removed > 0 {
        info!("[Corpse] Abandonment sweep removed {} corpse(s)", removed);
    } else {
        debug!("[Corpse] Abandonment sweep found nothing to remove");
    }
    removed
}

/// Put exported corpses back into the world.
///
/// NPC corpses whose decay time has passed are not inserted; their actor is
/// taken off its room and [`CorpseDecayedEvent`] fires right away so it
/// respawns. Looted player corpses past their grace period are dropped.
/// Everything else is inserted with its timer rescheduled for the time it
/// had left. Entries whose id is already live are skipped, as are NPC
/// corpses whose room is gone; player corpses in a missing room are kept
/// stranded in the [`CorpseStore`] so their contents survive the next save.
pub fn restore_corpses(world: &mut World, state: CorpseState) -> CorpseRestoreReport {
    let now = now(world);
    let grace = world.resource::<LifecycleConfig>().player_loot_grace_ms;
    let mut report = CorpseRestoreReport::default();

    for corpse in state.npc.into_iter().chain(state.player) {
        if world.resource::<CorpseStore>().contains(&corpse.id) {
            warn!("[Corpse:{}] Already live, not restoring", corpse.id);
            report.skipped += 1;
            continue;
        }
        match corpse.kind.clone() {
            CorpseKind::Npc(npc) => {
                if npc.decay_at <= now {
                    debug!(
                        "[Corpse:{}] Decayed {} ms ago while offline",
                        corpse.id,
                        now - npc.decay_at
                    );
                    world.resource_mut::<RoomStore>().remove_occupant(&npc.actor_id);
                    emit_decay(world, &corpse, npc);
                    report.decayed += 1;
                    continue;
                }
                if !world.resource::<RoomStore>().has_room(&corpse.room_id) {
                    error!(
                        "[Corpse:{}] Room '{}' no longer exists, not restoring",
                        corpse.id, corpse.room_id
                    );
                    report.skipped += 1;
                    continue;
                }
                if world.resource::<CorpseStore>().has_active_corpse(&npc.actor_id) {
                    warn!(
                        "[Corpse:{}] Actor '{}' already has a corpse, not restoring",
                        corpse.id, npc.actor_id
                    );
                    report.skipped += 1;
                    continue;
                }
                let corpse_id = corpse.id.clone();
                let room_id = corpse.room_id.clone();
                {
                    let mut rooms = world.resource_mut::<RoomStore>();
                    rooms.remove_occupant(&npc.actor_id);
                    if let Some(actor) = rooms.get_actor_mut(&npc.actor_id) {
                        actor.hp = 0;
                    }
                    rooms.place_item(&room_id, &corpse_id);
                }
                world.resource_mut::<CorpseStore>().insert(corpse);
                let data =
                    TimerData::new(CORPSE_DECAY_KIND).with(CORPSE_ID_KEY, corpse_id.as_str());
                if schedule_timer_kind(world, decay_timer_id(&corpse_id), npc.decay_at - now, data)
                {
                    report.restored += 1;
                } else {
                    world
                        .resource_mut::<RoomStore>()
                        .remove_item(&room_id, &corpse_id);
                    world.resource_mut::<CorpseStore>().remove(&corpse_id);
                    report.skipped += 1;
                }
            }
            CorpseKind::Player(pc) => {
                let cleanup_at = pc.looted_at.map(|at| at.saturating_add(grace));
                if pc.looted && cleanup_at.is_none_or(|at| at <= now) {
                    debug!(
                        "[Corpse:{}] Grace period ended while offline, dropping",
                        corpse.id
                    );
                    report.expired += 1;
                    continue;
                }
                if !world.resource::<RoomStore>().has_room(&corpse.room_id) {
                    error!(
                        "[Corpse:{}] Room '{}' no longer exists, keeping it stranded",
                        corpse.id, corpse.room_id
                    );
                    world.resource_mut::<CorpseStore>().strand(corpse);
                    report.stranded += 1;
                    continue;
                }
                let corpse_id = corpse.id.clone();
                world
                    .resource_mut::<RoomStore>()
                    .place_item(&corpse.room_id, &corpse_id);
                world.resource_mut::<CorpseStore>().insert(corpse);
                if let Some(at) = cleanup_at {
                    let data = TimerData::new(CORPSE_CLEANUP_KIND)
                        .with(CORPSE_ID_KEY, corpse_id.as_str());
                    schedule_timer_kind(world, cleanup_timer_id(&corpse_id), at - now, data);
                }
                report.restored += 1;
            }
        }
    }

    info!(
        "[Corpse] Restore: {} restored, {} decayed offline, {} expired, {} skipped, {} stranded",
        report.restored, report.decayed, report.expired, report.skipped, report.stranded
    );
    report
}

/// Timer handler for [`CORPSE_DECAY_KIND`].
pub fn corpse_decay_handler(In(data): In<TimerData>, world: &mut World) -> Result<(), String> {
    let corpse_id = data
        .get(CORPSE_ID_KEY)
        .ok_or_else(|| format!("'{}' timer without {}", data.kind, CORPSE_ID_KEY))?;
    on_decay(world, corpse_id);
    Ok(())
}

/// Timer handler for [`CORPSE_CLEANUP_KIND`].
pub fn corpse_cleanup_handler(In(data): In<TimerData>, world: &mut World) -> Result<(), String> {
    let corpse_id = data
        .get(CORPSE_ID_KEY)
        .ok_or_else(|| format!("'{}' timer without {}", data.kind, CORPSE_ID_KEY))?;
    let Some(room_id) = world
        .resource::<CorpseStore>()
        .get(corpse_id)
        .map(|c| c.room_id.clone())
    else {
        warn!("[Corpse:{}] Cleanup fired for a corpse that no longer exists", corpse_id);
        return Ok(());
    };
    world.trigger(RoomMessageEvent::new(
        room_id,
        "The looted remains crumble away.",
    ));
    destroy_player_corpse(world, corpse_id);
    Ok(())
}

/// Register the corpse timer handlers and record them in [`TimerHandlers`].
pub fn install_corpse_handlers(world: &mut World) {
    let decay = world.register_system(corpse_decay_handler);
    let cleanup = world.register_system(corpse_cleanup_handler);
    world.init_resource::<TimerHandlers>();
    let mut handlers = world.resource_mut::<TimerHandlers>();
    handlers.insert(CORPSE_DECAY_KIND, decay);
    handlers.insert(CORPSE_CLEANUP_KIND, cleanup);
}
