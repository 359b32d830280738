//! Event types exchanged between the lifecycle systems.
//!
//! Events are triggered with `world.trigger(...)` and consumed by observers
//! registered with `world.add_observer(...)`. Producers never know who is
//! listening: the corpse systems announce a decay, the respawn coordinator
//! and any presentation layer react to it.
//!
//! Submodules:
//! - [`corpse`] – an NPC corpse expired and the actor may come back
//! - [`roommessage`] – text to broadcast to everyone in a room
pub mod corpse;
pub mod roommessage;
