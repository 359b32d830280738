//! Respawn coordinator integration tests.
//!
//! ```sh
//! cargo test --test respawn_integration
//! ```

use std::sync::{Arc, Mutex};

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;

use corpsekeeper::events::corpse::CorpseDecayedEvent;
use corpsekeeper::events::roommessage::RoomMessageEvent;
use corpsekeeper::models::actor::{Actor, PLAYER_ACTOR_TYPE};
use corpsekeeper::resources::lifecycleconfig::LifecycleConfig;
use corpsekeeper::resources::rooms::{Room, RoomStore};
use corpsekeeper::server::build_world;
use corpsekeeper::systems::corpse::create_actor_corpse;
use corpsekeeper::systems::respawn::{check_and_respawn_missing, respawn_actor};
use corpsekeeper::systems::time::update_world_time;
use corpsekeeper::systems::timers::update_timers;

const T0: u64 = 1_700_000_000_000;

/// Cave declares three goblins, Hall declares a guard, Yard declares nobody.
fn make_world() -> World {
    let mut rooms = RoomStore::new();
    rooms.add_room(
        Room::new("cave", "Cave")
            .with_occupant("goblin_1")
            .with_occupant("goblin_2")
            .with_occupant("goblin_3"),
    );
    rooms.add_room(Room::new("hall", "Hall").with_occupant("guard"));
    rooms.add_room(Room::new("yard", "Yard"));
    for n in 1..=3 {
        rooms.add_actor(Actor::new(format!("goblin_{n}"), "a goblin").with_max_hp(12));
    }
    rooms.add_actor(Actor::new("guard", "a town guard").with_max_hp(40));
    build_world(LifecycleConfig::new().with_npc_decay_ms(2_000), rooms, T0)
}

fn remove(world: &mut World, actor_id: &str) {
    world.resource_mut::<RoomStore>().remove_occupant(actor_id);
}

fn occupants(world: &World, room_id: &str) -> Vec<String> {
    world
        .resource::<RoomStore>()
        .get_room(room_id)
        .map(|r| r.occupants.clone())
        .unwrap_or_default()
}

fn hp(world: &World, actor_id: &str) -> (u32, u32) {
    let actor = world.resource::<RoomStore>().get_actor(actor_id).unwrap();
    (actor.hp, actor.max_hp)
}

fn capture_messages(world: &mut World) -> Arc<Mutex<Vec<RoomMessageEvent>>> {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    world.add_observer(move |trigger: On<RoomMessageEvent>| {
        sink.lock().unwrap().push(trigger.event().clone());
    });
    world.flush();
    messages
}

#[test]
fn respawn_succeeds_once_for_the_same_actor_and_room() {
    let mut world = make_world();
    let messages = capture_messages(&mut world);
    remove(&mut world, "guard");
    world
        .resource_mut::<RoomStore>()
        .get_actor_mut("guard")
        .unwrap()
        .hp = 3;

    assert!(respawn_actor(&mut world, "guard", "hall"));
    assert!(!respawn_actor(&mut world, "guard", "hall"));

    assert_eq!(occupants(&world, "hall"), vec!["guard"]);
    assert_eq!(hp(&world, "guard"), (40, 40));
    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        RoomMessageEvent::new("hall", "A town guard appears.")
    );
}

#[test]
fn respawn_rejects_unknown_rooms_and_actors() {
    let mut world = make_world();
    remove(&mut world, "guard");

    assert!(!respawn_actor(&mut world, "guard", "void"));
    assert!(!respawn_actor(&mut world, "dragon", "hall"));
    assert!(occupants(&world, "hall").is_empty());
}

#[test]
fn respawn_waits_while_a_corpse_exists() {
    let mut world = make_world();
    let goblin = world
        .resource::<RoomStore>()
        .get_actor("goblin_1")
        .cloned()
        .unwrap();
    create_actor_corpse(&mut world, &goblin, "cave", None).unwrap();

    assert!(!respawn_actor(&mut world, "goblin_1", "cave"));
    assert!(!occupants(&world, "cave").contains(&"goblin_1".to_string()));
}

#[test]
fn decay_respawns_the_actor_within_the_same_tick() {
    let mut world = make_world();
    let goblin = world
        .resource::<RoomStore>()
        .get_actor("goblin_2")
        .cloned()
        .unwrap();
    create_actor_corpse(&mut world, &goblin, "cave", Some("bob")).unwrap();
    assert_eq!(hp(&world, "goblin_2"), (0, 12));

    update_world_time(&mut world, 2_000);
    assert_eq!(update_timers(&mut world), 1);

    let cave = occupants(&world, "cave");
    assert_eq!(cave.iter().filter(|id| *id == "goblin_2").count(), 1);
    assert_eq!(hp(&world, "goblin_2"), (12, 12));
}

#[test]
fn actor_killed_elsewhere_respawns_where_it_died() {
    let mut world = make_world();
    remove(&mut world, "goblin_3");
    world
        .resource_mut::<RoomStore>()
        .get_room_mut("yard")
        .unwrap()
        .occupants
        .push("goblin_3".to_string());
    let goblin = world
        .resource::<RoomStore>()
        .get_actor("goblin_3")
        .cloned()
        .unwrap();
    create_actor_corpse(&mut world, &goblin, "yard", None).unwrap();

    update_world_time(&mut world, 2_000);
    update_timers(&mut world);

    assert!(occupants(&world, "yard").contains(&"goblin_3".to_string()));
    assert!(!occupants(&world, "cave").contains(&"goblin_3".to_string()));
}

#[test]
fn decay_events_for_players_are_ignored() {
    let mut world = make_world();
    remove(&mut world, "guard");

    world.trigger(CorpseDecayedEvent {
        actor_id: "guard".to_string(),
        actor_type: PLAYER_ACTOR_TYPE.to_string(),
        room_id: "hall".to_string(),
        corpse_id: "player_corpse_guard_1".to_string(),
    });
    world.flush();

    assert!(occupants(&world, "hall").is_empty());
}

#[test]
fn reconciliation_fills_only_genuine_gaps() {
    let mut world = make_world();

    // goblin_1: missing, should come back.
    remove(&mut world, "goblin_1");
    // goblin_2: missing but lying dead, must wait for its corpse.
    let goblin_2 = world
        .resource::<RoomStore>()
        .get_actor("goblin_2")
        .cloned()
        .unwrap();
    create_actor_corpse(&mut world, &goblin_2, "cave", None).unwrap();
    // guard: wandered into the yard, must not be duplicated.
    remove(&mut world, "guard");
    world
        .resource_mut::<RoomStore>()
        .get_room_mut("yard")
        .unwrap()
        .occupants
        .push("guard".to_string());

    assert_eq!(check_and_respawn_missing(&mut world), 1);

    let cave = occupants(&world, "cave");
    assert!(cave.contains(&"goblin_1".to_string()));
    assert!(!cave.contains(&"goblin_2".to_string()));
    assert!(cave.contains(&"goblin_3".to_string()));
    assert!(occupants(&world, "hall").is_empty());
    assert_eq!(world.resource::<RoomStore>().occupant_count("guard"), 1);

    // Nothing left to do on a second pass.
    assert_eq!(check_and_respawn_missing(&mut world), 0);
}

#[test]
fn reconciliation_on_a_complete_world_does_nothing() {
    let mut world = make_world();
    let messages = capture_messages(&mut world);
    assert_eq!(check_and_respawn_missing(&mut world), 0);
    assert!(messages.lock().unwrap().is_empty());
}
