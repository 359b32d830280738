//! Plain data types shared by resources and systems.
//!
//! These describe the things the lifecycle subsystem moves around: items,
//! actors, players, their wallets, and the corpses produced when they die.
//! None of them are ECS components; they live inside resources such as
//! [`RoomStore`](crate::resources::rooms::RoomStore) and
//! [`CorpseStore`](crate::resources::corpsestore::CorpseStore).
//!
//! Submodules:
//! - [`actor`] – non-player characters, size classes, and loot entries
//! - [`corpse`] – NPC and player corpses
//! - [`item`] – item instances carried by actors, players, and corpses
//! - [`player`] – a player's carried state at the moment of death
//! - [`wallet`] – currency held by a player

pub mod actor;
pub mod corpse;
pub mod item;
pub mod player;
pub mod wallet;
