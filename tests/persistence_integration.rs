//! Snapshot export/restore integration tests.
//!
//! A restart is simulated by exporting a snapshot from one world and
//! restoring it into a freshly built one whose clock has moved on.
//!
//! ```sh
//! cargo test --test persistence_integration
//! ```

use std::fs;
use std::sync::{Arc, Mutex};

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;

use corpsekeeper::events::corpse::CorpseDecayedEvent;
use corpsekeeper::events::roommessage::RoomMessageEvent;
use corpsekeeper::models::actor::{Actor, LootEntry};
use corpsekeeper::models::item::Item;
use corpsekeeper::models::player::Player;
use corpsekeeper::models::wallet::Wallet;
use corpsekeeper::resources::corpsestore::CorpseStore;
use corpsekeeper::resources::lifecycleconfig::LifecycleConfig;
use corpsekeeper::resources::playerdirectory::MemoryPlayerDirectory;
use corpsekeeper::resources::rooms::{Room, RoomStore};
use corpsekeeper::resources::timerhandlers::TimerHandlers;
use corpsekeeper::resources::timerscheduler::{TimerData, TimerScheduler};
use corpsekeeper::server::{Server, build_world};
use corpsekeeper::systems::corpse::{
    cleanup_abandoned_corpses, cleanup_timer_id, create_actor_corpse, create_player_corpse, decay_timer_id, mark_looted,
};
use corpsekeeper::systems::persistence::{
    SnapshotDocument, export_snapshot, load_snapshot_from_file, restore_snapshot,
};
use corpsekeeper::systems::time::update_world_time;
use corpsekeeper::systems::timers::{get_remaining_time, schedule_timer_kind, update_timers};

const T0: u64 = 1_700_000_000_000;

#[derive(Resource, Default)]
struct Weather(Vec<String>);

fn weather_handler(In(data): In<TimerData>, mut weather: ResMut<Weather>) -> Result<(), String> {
    weather.0.push(data.get("zone").unwrap_or("?").to_string());
    Ok(())
}

fn rooms() -> RoomStore {
    let mut rooms = RoomStore::new();
    rooms.add_room(
        Room::new("R1", "Cave")
            .with_occupant("goblin_1")
            .with_occupant("goblin_2"),
    );
    rooms.add_room(Room::new("R2", "Crossroads"));
    rooms.add_actor(
        Actor::new("goblin_1", "a goblin")
            .with_max_hp(12)
            .with_loot(LootEntry {
                definition: "copper_coin".to_string(),
                name: "a copper coin".to_string(),
                chance: 1.0,
                min: 3,
                max: 3,
                weight: 0.01,
            }),
    );
    rooms.add_actor(Actor::new("goblin_2", "a goblin").with_max_hp(12));
    rooms
}

fn config() -> LifecycleConfig {
    LifecycleConfig::new()
        .with_npc_decay_ms(10_000)
        .with_player_loot_grace_ms(60_000)
}

/// Build a world at `now` with the weather handler available.
fn make_world(now: u64) -> World {
    let mut world = build_world(config(), rooms(), now);
    world.init_resource::<Weather>();
    let weather = world.register_system(weather_handler);
    world.resource_mut::<TimerHandlers>().insert("weather", weather);
    world
}

fn kill(world: &mut World, actor_id: &str) {
    let actor = world
        .resource::<RoomStore>()
        .get_actor(actor_id)
        .cloned()
        .unwrap();
    create_actor_corpse(world, &actor, "R1", Some("alice")).unwrap();
}

fn count_decays(world: &mut World) -> Arc<Mutex<Vec<String>>> {
    let decays = Arc::new(Mutex::new(Vec::new()));
    let sink = decays.clone();
    world.add_observer(move |trigger: On<CorpseDecayedEvent>| {
        sink.lock().unwrap().push(trigger.event().actor_id.clone());
    });
    world.flush();
    decays
}

fn capture_messages(world: &mut World) -> Arc<Mutex<Vec<String>>> {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    world.add_observer(move |trigger: On<RoomMessageEvent>| {
        sink.lock().unwrap().push(trigger.event().message.clone());
    });
    world.flush();
    messages
}

fn occupants(world: &World, room_id: &str) -> Vec<String> {
    world
        .resource::<RoomStore>()
        .get_room(room_id)
        .map(|r| r.occupants.clone())
        .unwrap_or_default()
}

#[test]
fn round_trip_preserves_corpses_and_remaining_time() {
    let mut world = make_world(T0);
    kill(&mut world, "goblin_1");
    kill(&mut world, "goblin_2");
    let mut alice = Player::new("alice")
        .with_item(Item::new("sword_1", "iron_sword", "an iron sword").with_durability(50.0))
        .with_currency(Wallet::default().with_gold(5));
    create_player_corpse(&mut world, &mut alice, "R2", None).unwrap();
    update_world_time(&mut world, 1_000);

    let snapshot = export_snapshot(&world);
    let original = world.resource::<CorpseStore>().export_state();
    let goblin_corpse = world
        .resource::<CorpseStore>()
        .get_corpse_by_actor("goblin_1")
        .map(|c| c.id.clone())
        .unwrap();
    let remaining_before = get_remaining_time(&world, &decay_timer_id(&goblin_corpse)).unwrap();

    // Restart 500 ms later.
    let mut restored = make_world(T0 + 1_500);
    let report = restore_snapshot(&mut restored, snapshot);
    assert_eq!(report.corpses.restored, 3);
    assert_eq!(report.corpses.decayed, 0);

    assert_eq!(restored.resource::<CorpseStore>().export_state(), original);
    assert_eq!(restored.resource::<TimerScheduler>().len(), 2);
    let remaining_after =
        get_remaining_time(&restored, &decay_timer_id(&goblin_corpse)).unwrap();
    assert_eq!(remaining_before - remaining_after, 500);

    let r1 = occupants(&restored, "R1");
    assert!(!r1.contains(&"goblin_1".to_string()));
    assert!(!r1.contains(&"goblin_2".to_string()));
    let rooms = restored.resource::<RoomStore>();
    assert_eq!(rooms.get_room("R1").unwrap().items.len(), 2);
    assert_eq!(rooms.get_room("R2").unwrap().items.len(), 1);
}

#[test]
fn corpse_that_expired_during_downtime_decays_inside_restore() {
    let mut world = make_world(T0);
    kill(&mut world, "goblin_1");
    let snapshot = export_snapshot(&world);

    // Down for 15 s, decay was due after 10 s.
    let mut restored = make_world(T0 + 15_000);
    let decays = count_decays(&mut restored);
    let messages = capture_messages(&mut restored);
    let report = restore_snapshot(&mut restored, snapshot);

    assert_eq!(report.corpses.decayed, 1);
    assert_eq!(*decays.lock().unwrap(), vec!["goblin_1".to_string()]);
    assert_eq!(
        *messages.lock().unwrap(),
        vec![
            "The corpse of a goblin decays into dust.".to_string(),
            "A goblin appears.".to_string(),
        ]
    );
    assert!(restored.resource::<CorpseStore>().is_empty());
    assert_eq!(restored.resource::<TimerScheduler>().len(), 0);
    assert!(occupants(&restored, "R1").contains(&"goblin_1".to_string()));
    let goblin = restored
        .resource::<RoomStore>()
        .get_actor("goblin_1")
        .cloned()
        .unwrap();
    assert_eq!(goblin.hp, goblin.max_hp);
}

#[test]
fn looted_player_corpses_respect_their_grace_period() {
    let mut world = make_world(T0);
    let mut alice = Player::new("alice");
    let mut bob = Player::new("bob");
    let mut carol = Player::new("carol");
    let early = create_player_corpse(&mut world, &mut alice, "R2", None).unwrap();
    assert!(mark_looted(&mut world, &early.id, &alice));
    update_world_time(&mut world, 50_000);
    let late = create_player_corpse(&mut world, &mut bob, "R2", None).unwrap();
    assert!(mark_looted(&mut world, &late.id, &bob));
    let unlooted = create_player_corpse(&mut world, &mut carol, "R2", None).unwrap();
    let snapshot = export_snapshot(&world);

    // Grace is 60 s: alice's ran out at T0+60s, bob's runs until T0+110s.
    let mut restored = make_world(T0 + 80_000);
    let report = restore_snapshot(&mut restored, snapshot);

    assert_eq!(report.corpses.expired, 1);
    assert_eq!(report.corpses.restored, 2);
    let store = restored.resource::<CorpseStore>();
    assert!(!store.contains(&early.id));
    assert!(store.contains(&late.id));
    assert!(store.contains(&unlooted.id));
    assert_eq!(
        get_remaining_time(&restored, &cleanup_timer_id(&late.id)),
        Some(30_000)
    );
    assert!(!restored
        .resource::<TimerScheduler>()
        .has(&cleanup_timer_id(&unlooted.id)));

    update_world_time(&mut restored, 30_000);
    assert_eq!(update_timers(&mut restored), 1);
    assert!(!restored.resource::<CorpseStore>().contains(&late.id));
}

#[test]
fn other_timers_are_restored_after_corpses() {
    let mut world = make_world(T0);
    kill(&mut world, "goblin_1");
    assert!(schedule_timer_kind(
        &mut world,
        "storm_north",
        5_000,
        TimerData::new("weather").with("zone", "north"),
    ));
    assert!(schedule_timer_kind(
        &mut world,
        "storm_south",
        60_000,
        TimerData::new("weather").with("zone", "south"),
    ));
    let snapshot = export_snapshot(&world);
    assert_eq!(snapshot.timers.len(), 3);

    let mut restored = make_world(T0 + 7_000);
    let report = restore_snapshot(&mut restored, snapshot);

    assert_eq!(report.timers.fired, 1);
    assert_eq!(report.timers.rescheduled, 1);
    assert_eq!(restored.resource::<Weather>().0, vec!["north".to_string()]);
    let timers = restored.resource::<TimerScheduler>();
    assert_eq!(timers.len(), 2);
    assert!(timers.has("storm_south"));
    let goblin_corpse = restored
        .resource::<CorpseStore>()
        .get_corpse_by_actor("goblin_1")
        .map(|c| c.id.clone())
        .unwrap();
    assert!(timers.has(&decay_timer_id(&goblin_corpse)));
}

#[test]
fn npc_corpses_in_rooms_that_no_longer_exist_are_skipped() {
    let mut world = make_world(T0);
    kill(&mut world, "goblin_1");
    let snapshot = export_snapshot(&world);

    let mut smaller = RoomStore::new();
    smaller.add_room(Room::new("R2", "Crossroads"));
    let mut restored = build_world(config(), smaller, T0 + 1_000);
    let report = restore_snapshot(&mut restored, snapshot);

    assert_eq!(report.corpses.skipped, 1);
    assert!(restored.resource::<CorpseStore>().is_empty());
    assert!(export_snapshot(&restored).corpses.is_empty());
}

#[test]
fn player_corpse_in_a_missing_room_survives_until_the_room_returns() {
    let mut world = make_world(T0);
    let mut alice = Player::new("alice")
        .with_item(Item::new("ring_1", "gold_ring", "a gold ring"))
        .with_currency(Wallet::default().with_gold(5));
    let corpse = create_player_corpse(&mut world, &mut alice, "R2", None).unwrap();
    let snapshot = export_snapshot(&world);

    let mut smaller = RoomStore::new();
    smaller.add_room(Room::new("R1", "Cave"));
    let mut restored = build_world(config(), smaller, T0 + 1_000);
    let report = restore_snapshot(&mut restored, snapshot);

    assert_eq!(report.corpses.stranded, 1);
    assert_eq!(report.corpses.skipped, 0);
    assert!(restored.resource::<CorpseStore>().is_empty());
    let saved_again = export_snapshot(&restored);
    assert_eq!(saved_again.corpses.player.len(), 1);
    assert_eq!(saved_again.corpses.player[0].inventory.len(), 1);

    // The room is back on the next start.
    let mut healed = make_world(T0 + 2_000);
    let report = restore_snapshot(&mut healed, saved_again);
    assert_eq!(report.corpses.restored, 1);
    let store = healed.resource::<CorpseStore>();
    assert!(store.contains(&corpse.id));
    assert!(store.stranded().is_empty());
    assert!(
        healed
            .resource::<RoomStore>()
            .get_room("R2")
            .unwrap()
            .has_item(&corpse.id)
    );
}

#[test]
fn abandonment_sweep_also_clears_stranded_corpses() {
    let mut world = make_world(T0);
    let mut alice = Player::new("alice");
    create_player_corpse(&mut world, &mut alice, "R2", None).unwrap();
    let snapshot = export_snapshot(&world);

    let mut smaller = RoomStore::new();
    smaller.add_room(Room::new("R1", "Cave"));
    let eight_days = 8 * 24 * 60 * 60 * 1000;
    let mut restored = build_world(config(), smaller, T0 + eight_days);
    restore_snapshot(&mut restored, snapshot);
    assert_eq!(restored.resource::<CorpseStore>().stranded().len(), 1);

    let removed = cleanup_abandoned_corpses(&mut restored, &MemoryPlayerDirectory::new());
    assert_eq!(removed, 1);
    assert!(export_snapshot(&restored).corpses.is_empty());
}

#[test]
fn legacy_flat_snapshot_is_accepted() {
    let mut world = make_world(T0);
    kill(&mut world, "goblin_1");
    let mut alice = Player::new("alice");
    create_player_corpse(&mut world, &mut alice, "R2", None).unwrap();
    let state = world.resource::<CorpseStore>().export_state();
    let flat: Vec<_> = state.npc.iter().chain(state.player.iter()).cloned().collect();
    let legacy = serde_json::json!({ "savedAt": T0, "corpses": flat });

    let document: SnapshotDocument = serde_json::from_value(legacy).unwrap();
    let mut restored = make_world(T0 + 1_000);
    let report = restore_snapshot(&mut restored, document);

    assert_eq!(report.corpses.restored, 2);
    assert_eq!(restored.resource::<CorpseStore>().export_state(), state);
    assert_eq!(restored.resource::<TimerScheduler>().len(), 1);
}

#[test]
fn server_saves_on_shutdown_and_restores_on_startup() {
    let dir = std::env::temp_dir().join("corpsekeeper_test_server_restart");
    let _ = fs::remove_dir_all(&dir);
    let mut config = config();
    config.snapshot_path = dir.join("corpses.json");

    let mut server = Server::new(config.clone(), rooms(), MemoryPlayerDirectory::new(), T0);
    let startup = server.startup(None);
    assert_eq!(startup.respawned, 0);
    kill(server.world_mut(), "goblin_1");
    server.tick(1_000);
    let saved = server.shutdown_and_save().unwrap();
    assert_eq!(saved.corpses.npc.len(), 1);
    assert_eq!(server.world().resource::<TimerScheduler>().len(), 0);

    // Back up 2 s later; 7 s of decay remain.
    let document = load_snapshot_from_file(&config.snapshot_path)
        .unwrap()
        .unwrap();
    let mut server = Server::new(config, rooms(), MemoryPlayerDirectory::new(), T0 + 3_000);
    let startup = server.startup(Some(document));
    assert_eq!(startup.restored.unwrap().corpses.restored, 1);
    assert_eq!(startup.respawned, 0);
    assert!(!occupants(server.world(), "R1").contains(&"goblin_1".to_string()));

    server.tick(6_999);
    assert!(!occupants(server.world(), "R1").contains(&"goblin_1".to_string()));
    assert_eq!(server.tick(1), 1);
    assert!(occupants(server.world(), "R1").contains(&"goblin_1".to_string()));

    let _ = fs::remove_dir_all(&dir);
}
