//! Timer systems.
//!
//! Thin `&mut World` front-ends over the
//! [`TimerScheduler`](crate::resources::timerscheduler::TimerScheduler)
//! resource that read the current time from
//! [`WorldTime`](crate::resources::worldtime::WorldTime), plus the two
//! functions that actually run handlers:
//!
//! - [`update_timers`] – fire everything that is due, once per tick
//! - [`restore_timers`] – rehydrate exported timers, firing the past-due ones
//!
//! # Handler contract
//!
//! A handler is a registered one-shot system taking `In<TimerData>` and
//! returning `Result<(), String>`. The timer is removed from the scheduler
//! before its handler runs, so a handler may freely reschedule its own id.
//! An `Err` is logged and does not affect any other timer.

use bevy_ecs::prelude::*;
use log::{debug, error, info, warn};

use crate::resources::timerhandlers::TimerHandlers;
use crate::resources::timerscheduler::{TimerData, TimerHandler, TimerScheduler, TimerSnapshot};
use crate::resources::worldtime::WorldTime;

/// Outcome of [`restore_timers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerRestoreReport {
    /// Past-due timers whose handler ran during the restore.
    pub fired: usize,
    /// Timers registered again for their remaining time.
    pub rescheduled: usize,
    /// Entries whose kind has no registered handler.
    pub skipped: usize,
}

/// Schedule a timer `delay_ms` from now with an explicit handler.
pub fn schedule_timer(
    world: &mut World,
    id: impl Into<String>,
    delay_ms: u64,
    handler: TimerHandler,
    data: TimerData,
) {
    let now = world.resource::<WorldTime>().now;
    world
        .resource_mut::<TimerScheduler>()
        .schedule(id, delay_ms, handler, data, now);
}

/// Schedule a timer whose handler is looked up in [`TimerHandlers`] by
/// `data.kind`. Returns false, scheduling nothing, if the kind is unknown.
pub fn schedule_timer_kind(
    world: &mut World,
    id: impl Into<String>,
    delay_ms: u64,
    data: TimerData,
) -> bool {
    let id = id.into();
    let Some(handler) = world
        .get_resource::<TimerHandlers>()
        .and_then(|handlers| handlers.get(&data.kind))
    else {
        error!(
            "[Timers] No handler registered for kind '{}', timer '{}' not scheduled",
            data.kind, id
        );
        return false;
    };
    schedule_timer(world, id, delay_ms, handler, data);
    true
}

pub fn cancel_timer(world: &mut World, id: &str) -> bool {
    world.resource_mut::<TimerScheduler>().cancel(id)
}

pub fn has_timer(world: &World, id: &str) -> bool {
    world.resource::<TimerScheduler>().has(id)
}

/// Milliseconds until `id` fires, or `None` if it is not pending.
pub fn get_remaining_time(world: &World, id: &str) -> Option<u64> {
    let now = world.resource::<WorldTime>().now;
    world
        .resource::<TimerScheduler>()
        .get_remaining_time(id, now)
}

/// Fire every timer that was due when this call started.
///
/// Timers run soonest first, ties in scheduling order. A timer cancelled or
/// rescheduled by an earlier handler in the same pass is skipped, and timers
/// scheduled during the pass wait for the next call, so a zero delay fires on
/// the following tick. Returns how many handlers ran.
pub fn update_timers(world: &mut World) -> usize {
    let now = world.resource::<WorldTime>().now;
    let due = world.resource::<TimerScheduler>().due(now);
    let mut fired = 0;
    for (id, seq) in due {
        let Some(timer) = world.resource_mut::<TimerScheduler>().take(&id, seq) else {
            debug!("[Timers] '{}' was cancelled before it could fire", id);
            continue;
        };
        run_timer_handler(world, &id, timer.handler, timer.data);
        fired += 1;
    }
    fired
}

/// Re-register exported timers against `handlers`.
///
/// Entries are handled in expiry order. One whose expiry is not in the future
/// runs its handler immediately, before this function returns; the others are
/// scheduled for whatever time they had left. Kinds with no handler are
/// logged and dropped.
pub fn restore_timers(
    world: &mut World,
    mut entries: Vec<TimerSnapshot>,
    handlers: &TimerHandlers,
) -> TimerRestoreReport {
    let now = world.resource::<WorldTime>().now;
    entries.sort_by_key(|entry| entry.expires_at);
    let mut report = TimerRestoreReport::default();
    for entry in entries {
        let Some(handler) = handlers.get(&entry.data.kind) else {
            warn!(
                "[Timers] Dropping restored timer '{}': no handler for kind '{}'",
                entry.id, entry.data.kind
            );
            report.skipped += 1;
            continue;
        };
        if entry.expires_at <= now {
            debug!(
                "[Timers] Restored timer '{}' is {} ms overdue, firing now",
                entry.id,
                now - entry.expires_at
            );
            run_timer_handler(world, &entry.id, handler, entry.data);
            report.fired += 1;
        } else {
            let remaining = entry.expires_at - now;
            world
                .resource_mut::<TimerScheduler>()
                .schedule(entry.id, remaining, handler, entry.data, now);
            report.rescheduled += 1;
        }
    }
    info!(
        "[Timers] Restore: {} fired, {} rescheduled, {} skipped",
        report.fired, report.rescheduled, report.skipped
    );
    report
}

/// Run one handler, logging instead of propagating any failure.
fn run_timer_handler(world: &mut World, id: &str, handler: TimerHandler, data: TimerData) -> bool {
    let kind = data.kind.clone();
    match world.run_system_with(handler, data) {
        Ok(Ok(())) => {
            debug!("[Timers] '{}' ({}) fired", id, kind);
            true
        }
        Ok(Err(e)) => {
            error!("[Timers] Handler for '{}' ({}) failed: {}", id, kind, e);
            false
        }
        Err(e) => {
            error!("[Timers] Could not run handler for '{}' ({}): {:?}", id, kind, e);
            false
        }
    }
}
