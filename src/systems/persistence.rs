//! Snapshot persistence.
//!
//! A [`Snapshot`] captures everything the lifecycle systems need to survive a
//! restart: pending timers and every live corpse, all with absolute epoch
//! millisecond timestamps. On disk it is a single JSON document:
//!
//! ```json
//! { "version": 2, "savedAt": 1700000000000,
//!   "timers": [ { "id": "...", "expiresAt": 0, "data": { "kind": "...", "payload": {} } } ],
//!   "corpses": { "npc": [], "player": [] } }
//! ```
//!
//! Older files stored corpses as one flat list, either at the top level or
//! under `corpses`. [`SnapshotDocument`] accepts all three shapes and
//! [`SnapshotDocument::into_current`] normalizes them.
//!
//! Restoring goes corpses first, then the remaining timers. Corpse timers
//! are always rebuilt from the corpses themselves, so exported
//! `corpse_decay` / `corpse_cleanup` entries are ignored.

use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::models::corpse::Corpse;
use crate::resources::corpsestore::{CorpseState, CorpseStore};
use crate::resources::timerhandlers::TimerHandlers;
use crate::resources::timerscheduler::{TimerScheduler, TimerSnapshot};
use crate::resources::worldtime::WorldTime;
use crate::systems::corpse::{
    CORPSE_CLEANUP_KIND, CORPSE_DECAY_KIND, CorpseRestoreReport, restore_corpses,
};
use crate::systems::timers::{TimerRestoreReport, restore_timers};

pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    /// When the snapshot was taken, epoch milliseconds.
    pub saved_at: u64,
    #[serde(default)]
    pub timers: Vec<TimerSnapshot>,
    #[serde(default)]
    pub corpses: CorpseState,
}

/// Version 1 layout: one flat corpse list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySnapshot {
    #[serde(default)]
    pub saved_at: Option<u64>,
    #[serde(default)]
    pub timers: Vec<TimerSnapshot>,
    pub corpses: Vec<Corpse>,
}

/// Any snapshot layout this crate has ever written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotDocument {
    Current(Snapshot),
    Legacy(LegacySnapshot),
    Bare(Vec<Corpse>),
}

impl SnapshotDocument {
    /// Convert to the current layout. `now` stands in for a missing save time.
    pub fn into_current(self, now: u64) -> Snapshot {
        match self {
            SnapshotDocument::Current(snapshot) => {
                if snapshot.version > SNAPSHOT_VERSION {
                    warn!(
                        "[Snapshot] Version {} is newer than {}, reading it anyway",
                        snapshot.version, SNAPSHOT_VERSION
                    );
                }
                snapshot
            }
            SnapshotDocument::Legacy(legacy) => {
                debug!("[Snapshot] Converting version 1 snapshot");
                Snapshot {
                    version: SNAPSHOT_VERSION,
                    saved_at: legacy.saved_at.unwrap_or(now),
                    timers: legacy.timers,
                    corpses: CorpseState::from_flat(legacy.corpses),
                }
            }
            SnapshotDocument::Bare(corpses) => {
                debug!("[Snapshot] Converting bare corpse list");
                Snapshot {
                    version: SNAPSHOT_VERSION,
                    saved_at: now,
                    timers: Vec::new(),
                    corpses: CorpseState::from_flat(corpses),
                }
            }
        }
    }
}

impl From<Snapshot> for SnapshotDocument {
    fn from(snapshot: Snapshot) -> Self {
        SnapshotDocument::Current(snapshot)
    }
}

/// Outcome of [`restore_snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotRestoreReport {
    pub corpses: CorpseRestoreReport,
    pub timers: TimerRestoreReport,
}

/// Capture pending timers and live corpses.
pub fn export_snapshot(world: &World) -> Snapshot {
    Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at: world.resource::<WorldTime>().now,
        timers: world.resource::<TimerScheduler>().export_state(),
        corpses: world.resource::<CorpseStore>().export_state(),
    }
}

/// Load a snapshot into the world.
///
/// Corpses are restored first, which also rebuilds their timers and fires
/// the decay of anything that expired while offline. The other timers are
/// restored afterwards against the [`TimerHandlers`] resource; ids that are
/// already pending are left alone.
pub fn restore_snapshot(
    world: &mut World,
    document: impl Into<SnapshotDocument>,
) -> SnapshotRestoreReport {
    let now = world.resource::<WorldTime>().now;
    let snapshot = document.into().into_current(now);
    info!(
        "[Snapshot] Restoring {} corpse(s) and {} timer(s) saved {} ms ago",
        snapshot.corpses.len(),
        snapshot.timers.len(),
        now.saturating_sub(snapshot.saved_at)
    );

    let corpses = restore_corpses(world, snapshot.corpses);

    let handlers = world
        .get_resource::<TimerHandlers>()
        .cloned()
        .unwrap_or_default();
    let timers: Vec<TimerSnapshot> = {
        let scheduler = world.resource::<TimerScheduler>();
        snapshot
            .timers
            .into_iter()
            .filter(|entry| {
                let kind = entry.data.kind.as_str();
                if kind == CORPSE_DECAY_KIND || kind == CORPSE_CLEANUP_KIND {
                    return false;
                }
                if scheduler.has(&entry.id) {
                    debug!("[Snapshot] Timer '{}' is already pending", entry.id);
                    return false;
                }
                true
            })
            .collect()
    };
    let timers = restore_timers(world, timers, &handlers);

    SnapshotRestoreReport { corpses, timers }
}

/// Write a snapshot as pretty JSON, creating parent directories.
///
/// The file is written next to its destination and renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
pub fn save_snapshot_to_file(path: &Path, snapshot: &Snapshot) -> Result<(), String> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create snapshot directory {}: {e}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| format!("Failed to serialize snapshot: {e}"))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .map_err(|e| format!("Failed to write snapshot {}: {e}", tmp.display()))?;
    fs::rename(&tmp, path)
        .map_err(|e| format!("Failed to move snapshot into {}: {e}", path.display()))?;
    debug!(
        "[Snapshot] Saved {} corpse(s), {} timer(s) to {}",
        snapshot.corpses.len(),
        snapshot.timers.len(),
        path.display()
    );
    Ok(())
}

/// Read a snapshot file. A missing file is not an error and yields `None`.
pub fn load_snapshot_from_file(path: &Path) -> Result<Option<SnapshotDocument>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read snapshot {}: {e}", path.display()))?;
    let document = serde_json::from_str(&json)
        .map_err(|e| format!("Failed to parse snapshot {}: {e}", path.display()))?;
    Ok(Some(document))
}
