use serde::{Deserialize, Serialize};

/// Coins carried by a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(default)]
    pub platinum: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub silver: u64,
    #[serde(default)]
    pub copper: u64,
}

/// An empty wallet. Used to reset a player's purse after death.
pub fn create_wallet() -> Wallet {
    Wallet::default()
}

impl Wallet {
    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold = gold;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Wallet::default()
    }

    /// Total value expressed in copper (1 platinum = 1000, 1 gold = 100, 1 silver = 10).
    /// Saturates at `u64::MAX` instead of overflowing.
    pub fn total_in_copper(&self) -> u64 {
        self.platinum
            .saturating_mul(1000)
            .saturating_add(self.gold.saturating_mul(100))
            .saturating_add(self.silver.saturating_mul(10))
            .saturating_add(self.copper)
    }

    /// Add every denomination of `other` to this wallet.
    pub fn deposit(&mut self, other: Wallet) {
        self.platinum = self.platinum.saturating_add(other.platinum);
        self.gold = self.gold.saturating_add(other.gold);
        self.silver = self.silver.saturating_add(other.silver);
        self.copper = self.copper.saturating_add(other.copper);
    }
}
