use std::time::{SystemTime, UNIX_EPOCH};

use bevy_ecs::prelude::Resource;

/// Wall-clock time as seen by the lifecycle systems.
///
/// `now` is absolute epoch milliseconds so that timestamps written into a
/// snapshot stay meaningful after a restart. It only moves when
/// [`update_world_time`](crate::systems::time::update_world_time) is called,
/// which keeps every system in one tick looking at the same instant.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldTime {
    /// Current time, epoch milliseconds.
    pub now: u64,
    /// Milliseconds added by the last update.
    pub delta: u64,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime::at(system_now_millis())
    }
}

impl WorldTime {
    /// Start the clock at a fixed instant. Used by tests and restores.
    pub fn at(now: u64) -> Self {
        WorldTime {
            now,
            delta: 0,
            frame_count: 0,
        }
    }
}

/// Current system time in epoch milliseconds.
pub fn system_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
