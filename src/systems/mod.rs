//! Lifecycle systems.
//!
//! This module groups the functions that advance time and mutate the world:
//! most are exclusive (`&mut World`) because a single operation touches
//! several resources and triggers events.
//!
//! Submodules overview
//! - [`corpse`] – corpse creation, decay, looting, destruction and restore
//! - [`persistence`] – snapshot export, restore and file I/O
//! - [`respawn`] – bring actors back after their corpse decays
//! - [`time`] – advance [`crate::resources::worldtime::WorldTime`]
//! - [`timers`] – schedule, fire and restore named timers

pub mod corpse;
pub mod persistence;
pub mod respawn;
pub mod time;
pub mod timers;
