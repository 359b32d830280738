//! Time update system.
//!
//! Advances the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per tick. Timers compare their absolute expiry against
//! `WorldTime::now`, so this must run before
//! [`update_timers`](crate::systems::timers::update_timers).
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Move `now` forward by `dt_ms` milliseconds and record the delta.
pub fn update_world_time(world: &mut World, dt_ms: u64) {
    let mut wt = world.resource_mut::<WorldTime>();
    wt.now = wt.now.saturating_add(dt_ms);
    wt.delta = dt_ms;
    wt.frame_count += 1;
}

/// Jump `now` to an absolute time. Moving backwards is ignored.
pub fn set_world_time(world: &mut World, now: u64) {
    let mut wt = world.resource_mut::<WorldTime>();
    if now > wt.now {
        wt.delta = now - wt.now;
        wt.now = now;
        wt.frame_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_now_and_counts_frames() {
        let mut world = World::new();
        world.insert_resource(WorldTime::at(1_000));
        update_world_time(&mut world, 250);
        update_world_time(&mut world, 250);
        let wt = world.resource::<WorldTime>();
        assert_eq!(wt.now, 1_500);
        assert_eq!(wt.delta, 250);
        assert_eq!(wt.frame_count, 2);
    }

    #[test]
    fn set_world_time_never_goes_back() {
        let mut world = World::new();
        world.insert_resource(WorldTime::at(1_000));
        set_world_time(&mut world, 500);
        assert_eq!(world.resource::<WorldTime>().now, 1_000);
        set_world_time(&mut world, 4_000);
        let wt = world.resource::<WorldTime>();
        assert_eq!(wt.now, 4_000);
        assert_eq!(wt.delta, 3_000);
    }
}
