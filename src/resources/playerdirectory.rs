//! Player directory collaborator.
//!
//! The abandonment sweep needs to know when a corpse's owner last logged in.
//! Account storage is not part of this crate, so it is reached through the
//! [`PlayerDirectory`] trait. [`MemoryPlayerDirectory`] backs the binary and
//! the tests.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub username: String,
    /// Last login, epoch milliseconds.
    pub last_login: u64,
}

pub trait PlayerDirectory {
    fn get_player(&self, username: &str) -> Option<PlayerRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPlayerDirectory {
    players: FxHashMap<String, PlayerRecord>,
}

impl MemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PlayerRecord) {
        self.players.insert(record.username.clone(), record);
    }

    pub fn with_player(mut self, username: impl Into<String>, last_login: u64) -> Self {
        self.insert(PlayerRecord {
            username: username.into(),
            last_login,
        });
        self
    }

    /// Record a login. Unknown users are added.
    pub fn touch(&mut self, username: &str, now: u64) {
        self.players
            .entry(username.to_string())
            .and_modify(|r| r.last_login = now)
            .or_insert_with(|| PlayerRecord {
                username: username.to_string(),
                last_login: now,
            });
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl PlayerDirectory for MemoryPlayerDirectory {
    fn get_player(&self, username: &str) -> Option<PlayerRecord> {
        self.players.get(username).cloned()
    }
}
