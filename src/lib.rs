//! Corpsekeeper library.
//!
//! Corpse lifecycle, named timers and NPC respawn for a text-world server,
//! built on `bevy_ecs`. The modules are exposed for the binary, for
//! integration tests and for embedding in a larger server.

pub mod events;
pub mod models;
pub mod resources;
pub mod server;
pub mod systems;
