//! Registry of timer handlers by kind.
//!
//! Maps the `kind` carried in a [`TimerData`](crate::resources::timerscheduler::TimerData)
//! to the registered system that handles it. Code that schedules a timer
//! looks its handler up here, and a snapshot restore uses the same table to
//! reattach handlers to timers that were saved without them.

use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashMap;

use crate::resources::timerscheduler::TimerHandler;

/// Map of timer kinds to handler system IDs.
#[derive(Resource, Debug, Clone, Default)]
pub struct TimerHandlers {
    pub map: FxHashMap<String, TimerHandler>,
}

impl TimerHandlers {
    /// Create an empty table.
    pub fn new() -> Self {
        TimerHandlers {
            map: FxHashMap::default(),
        }
    }

    /// Register the handler for a timer kind, replacing any previous one.
    pub fn insert(&mut self, kind: impl Into<String>, handler: TimerHandler) {
        self.map.insert(kind.into(), handler);
    }

    /// Retrieve the handler for a kind, if present.
    pub fn get(&self, kind: impl AsRef<str>) -> Option<TimerHandler> {
        self.map.get(kind.as_ref()).copied()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.map.contains_key(kind)
    }
}
