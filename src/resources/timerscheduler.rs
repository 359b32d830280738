//! Named one-shot timers.
//!
//! [`TimerScheduler`] keeps every pending timer under a unique string id
//! together with its absolute expiry, a serializable [`TimerData`] payload,
//! and the [`TimerHandler`] to run when it fires. The handler is a registered
//! one-shot system and is never persisted; the `kind` inside the payload is
//! what lets a restored timer find its handler again.
//!
//! The scheduler only does bookkeeping. Firing, which needs `&mut World` to
//! run handlers, is done by [`update_timers`](crate::systems::timers::update_timers)
//! using [`TimerScheduler::due`] and [`TimerScheduler::take`].
//!
//! Scheduling under an id that is already pending replaces the old timer.

use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemId;
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A registered system that handles a fired timer.
pub type TimerHandler = SystemId<In<TimerData>, Result<(), String>>;

/// Serializable payload of a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerData {
    /// Selects the handler when a timer is restored from a snapshot.
    pub kind: String,
    #[serde(default)]
    pub payload: BTreeMap<String, String>,
}

impl TimerData {
    pub fn new(kind: impl Into<String>) -> Self {
        TimerData {
            kind: kind.into(),
            payload: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }
}

/// Exported form of a pending timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub id: String,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: u64,
    pub data: TimerData,
}

/// A pending timer.
#[derive(Debug, Clone)]
pub struct PendingTimer {
    pub expires_at: u64,
    /// Insertion order; breaks ties between timers with the same expiry.
    pub seq: u64,
    pub handler: TimerHandler,
    pub data: TimerData,
}

#[derive(Resource, Debug, Default)]
pub struct TimerScheduler {
    timers: FxHashMap<String, PendingTimer>,
    /// Due-order index: (expires_at, seq) -> id.
    queue: BTreeMap<(u64, u64), String>,
    next_seq: u64,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot timer firing `delay_ms` after `now`.
    ///
    /// An existing timer under the same id is cancelled first.
    pub fn schedule(
        &mut self,
        id: impl Into<String>,
        delay_ms: u64,
        handler: TimerHandler,
        data: TimerData,
        now: u64,
    ) {
        let id = id.into();
        if self.cancel(&id) {
            debug!("[Timers] Replacing pending timer '{}'", id);
        }
        let expires_at = now.saturating_add(delay_ms);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((expires_at, seq), id.clone());
        self.timers.insert(
            id,
            PendingTimer {
                expires_at,
                seq,
                handler,
                data,
            },
        );
    }

    /// Remove a pending timer. Returns whether one was actually removed.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.timers.remove(id) {
            Some(timer) => {
                self.queue.remove(&(timer.expires_at, timer.seq));
                true
            }
            None => false,
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    /// Milliseconds until the timer fires, never negative.
    pub fn get_remaining_time(&self, id: &str, now: u64) -> Option<u64> {
        self.timers
            .get(id)
            .map(|t| t.expires_at.saturating_sub(now))
    }

    pub fn expires_at(&self, id: &str) -> Option<u64> {
        self.timers.get(id).map(|t| t.expires_at)
    }

    pub fn data(&self, id: &str) -> Option<&TimerData> {
        self.timers.get(id).map(|t| &t.data)
    }

    /// Every pending timer, soonest first, with absolute expiries.
    pub fn export_state(&self) -> Vec<TimerSnapshot> {
        self.queue
            .values()
            .filter_map(|id| {
                self.timers.get(id).map(|t| TimerSnapshot {
                    id: id.clone(),
                    expires_at: t.expires_at,
                    data: t.data.clone(),
                })
            })
            .collect()
    }

    /// Cancel everything. Returns how many timers were pending.
    pub fn clear_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        self.queue.clear();
        count
    }

    /// Ids (with their insertion sequence) of every timer due at `now`,
    /// soonest first.
    pub fn due(&self, now: u64) -> Vec<(String, u64)> {
        self.queue
            .range(..=(now, u64::MAX))
            .map(|(&(_, seq), id)| (id.clone(), seq))
            .collect()
    }

    /// Remove and return a timer, but only if it is still the registration
    /// identified by `seq`. A timer that was cancelled or rescheduled since
    /// [`due`](Self::due) was called is left alone.
    pub fn take(&mut self, id: &str, seq: u64) -> Option<PendingTimer> {
        if self.timers.get(id)?.seq != seq {
            return None;
        }
        let timer = self.timers.remove(id)?;
        self.queue.remove(&(timer.expires_at, timer.seq));
        Some(timer)
    }

    pub fn next_expiry(&self) -> Option<u64> {
        self.queue.keys().next().map(|(expires_at, _)| *expires_at)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Pending ids, soonest first.
    pub fn ids(&self) -> Vec<String> {
        self.queue.values().cloned().collect()
    }
}
