//! Server lifecycle.
//!
//! [`build_world`] assembles a `World` with every resource, timer handler and
//! observer the lifecycle systems expect. [`Server`] owns that world together
//! with the player directory and drives it:
//!
//! 1. [`Server::startup`] restores a snapshot, sweeps abandoned player
//!    corpses and respawns whatever the world roster says is missing;
//! 2. [`Server::tick`] advances time, fires due timers and repeats the
//!    abandonment sweep on its interval;
//! 3. [`Server::shutdown`] exports a final snapshot and cancels all timers.
//!
//! The world itself comes from a JSON [`WorldFile`] of rooms, actors and
//! player accounts.

use std::fs;
use std::path::Path;

use bevy_ecs::observer::Observer;
use bevy_ecs::prelude::*;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::models::actor::Actor;
use crate::resources::corpsestore::CorpseStore;
use crate::resources::lifecycleconfig::LifecycleConfig;
use crate::resources::loot::{LootSource, TableLootGenerator};
use crate::resources::playerdirectory::{MemoryPlayerDirectory, PlayerRecord};
use crate::resources::rooms::{Room, RoomStore};
use crate::resources::timerscheduler::TimerScheduler;
use crate::resources::worldtime::WorldTime;
use crate::systems::corpse::{cleanup_abandoned_corpses, install_corpse_handlers};
use crate::systems::persistence::{
    Snapshot, SnapshotDocument, SnapshotRestoreReport, export_snapshot, restore_snapshot,
    save_snapshot_to_file,
};
use crate::systems::respawn::{check_and_respawn_missing, respawn_on_decay_observer};
use crate::systems::time::update_world_time;
use crate::systems::timers::update_timers;

/// Rooms, actors and accounts the server starts from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldFile {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub accounts: Vec<PlayerRecord>,
}

impl WorldFile {
    /// Split into the room store and the player directory.
    pub fn into_parts(self) -> (RoomStore, MemoryPlayerDirectory) {
        let mut rooms = RoomStore::new();
        for room in self.rooms {
            rooms.add_room(room);
        }
        for actor in self.actors {
            rooms.add_actor(actor);
        }
        let mut directory = MemoryPlayerDirectory::new();
        for record in self.accounts {
            directory.insert(record);
        }
        (rooms, directory)
    }
}

pub fn load_world_file(path: &Path) -> Result<WorldFile, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read world file {}: {e}", path.display()))?;
    serde_json::from_str(&json)
        .map_err(|e| format!("Failed to parse world file {}: {e}", path.display()))
}

/// Build a world ready for the lifecycle systems, with the clock at `now`.
pub fn build_world(config: LifecycleConfig, rooms: RoomStore, now: u64) -> World {
    let mut world = World::new();
    world.insert_resource(WorldTime::at(now));
    world.insert_resource(config);
    world.insert_resource(rooms);
    world.insert_resource(TimerScheduler::new());
    world.insert_resource(CorpseStore::new());
    world.insert_resource(LootSource::new(TableLootGenerator));
    install_corpse_handlers(&mut world);
    world.spawn(Observer::new(respawn_on_decay_observer));
    // Observers must be registered before anything can trigger events.
    world.flush();
    world
}

/// What [`Server::startup`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub restored: Option<SnapshotRestoreReport>,
    pub abandoned: usize,
    pub respawned: usize,
}

pub struct Server {
    world: World,
    directory: MemoryPlayerDirectory,
    last_autosave: u64,
    last_sweep: u64,
}

impl Server {
    pub fn new(
        config: LifecycleConfig,
        rooms: RoomStore,
        directory: MemoryPlayerDirectory,
        now: u64,
    ) -> Self {
        Server {
            world: build_world(config, rooms, now),
            directory,
            last_autosave: now,
            last_sweep: now,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn directory(&self) -> &MemoryPlayerDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut MemoryPlayerDirectory {
        &mut self.directory
    }

    pub fn config(&self) -> &LifecycleConfig {
        self.world.resource::<LifecycleConfig>()
    }

    pub fn now(&self) -> u64 {
        self.world.resource::<WorldTime>().now
    }

    /// Restore `snapshot` (if any), sweep abandoned corpses, then reconcile
    /// every room against its roster.
    pub fn startup(&mut self, snapshot: Option<SnapshotDocument>) -> StartupReport {
        let restored = snapshot.map(|document| restore_snapshot(&mut self.world, document));
        let abandoned = cleanup_abandoned_corpses(&mut self.world, &self.directory);
        let respawned = check_and_respawn_missing(&mut self.world);
        let now = self.now();
        self.last_sweep = now;
        self.last_autosave = now;
        let summary = self.world.resource::<CorpseStore>().summary();
        info!(
            "Server started: {} npc and {} player corpse(s) ({} looted, {} items), {} timer(s) pending, {} abandoned, {} respawned",
            summary.npc,
            summary.player,
            summary.looted,
            summary.items,
            self.world.resource::<TimerScheduler>().len(),
            abandoned,
            respawned
        );
        StartupReport {
            restored,
            abandoned,
            respawned,
        }
    }

    /// Advance time by `dt_ms` and fire due timers. Returns how many fired.
    pub fn tick(&mut self, dt_ms: u64) -> usize {
        update_world_time(&mut self.world, dt_ms);
        let fired = update_timers(&mut self.world);
        if fired > 0 {
            let timers = self.world.resource::<TimerScheduler>();
            debug!(
                "[Timers] {} fired, {} pending, next at {:?}",
                fired,
                timers.len(),
                timers.next_expiry()
            );
        }

        let now = self.now();
        let interval = self.config().abandon_sweep_interval_ms;
        if interval > 0 && now.saturating_sub(self.last_sweep) >= interval {
            cleanup_abandoned_corpses(&mut self.world, &self.directory);
            self.last_sweep = now;
        }
        fired
    }

    pub fn autosave_due(&self) -> bool {
        let interval = self.config().autosave_interval_ms;
        interval > 0 && self.now().saturating_sub(self.last_autosave) >= interval
    }

    /// Write a snapshot to the configured path.
    pub fn save(&mut self) -> Result<(), String> {
        let snapshot = export_snapshot(&self.world);
        let path = self.config().snapshot_path.clone();
        save_snapshot_to_file(&path, &snapshot)?;
        self.last_autosave = self.now();
        debug!("Snapshot written to {}", path.display());
        Ok(())
    }

    /// Export the final state and cancel every pending timer.
    pub fn shutdown(&mut self) -> Snapshot {
        let snapshot = export_snapshot(&self.world);
        let cancelled = self.world.resource_mut::<TimerScheduler>().clear_all();
        info!(
            "Server stopped: {} corpse(s) saved, {} timer(s) cancelled",
            snapshot.corpses.len(),
            cancelled
        );
        snapshot
    }

    /// [`shutdown`](Self::shutdown) and write the snapshot to disk.
    pub fn shutdown_and_save(&mut self) -> Result<Snapshot, String> {
        let snapshot = self.shutdown();
        let path = self.config().snapshot_path.clone();
        save_snapshot_to_file(&path, &snapshot).inspect_err(|e| error!("{}", e))?;
        Ok(snapshot)
    }
}
