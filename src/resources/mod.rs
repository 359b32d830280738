//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world:
//! timing, configuration, the timer scheduler, the corpse table, the room
//! model and the collaborators the lifecycle code consults. Each submodule
//! documents the semantics and intended usage of its resource(s).
//!
//! Overview
//! - `corpsestore` – canonical corpse table with actor and owner indexes
//! - `lifecycleconfig` – decay, grace and abandonment settings loaded from INI
//! - `loot` – loot generation collaborator
//! - `playerdirectory` – last-login lookup for the abandonment sweep
//! - `rooms` – rooms, actors and the declared initial roster
//! - `timerhandlers` – registry of timer handler systems by kind
//! - `timerscheduler` – named one-shot timers
//! - `worldtime` – current time and delta in milliseconds
pub mod corpsestore;
pub mod lifecycleconfig;
pub mod loot;
pub mod playerdirectory;
pub mod rooms;
pub mod timerhandlers;
pub mod timerscheduler;
pub mod worldtime;
