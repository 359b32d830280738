use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::item::Item;
use crate::models::wallet::Wallet;

/// What a player is carrying. Owned by the session layer; corpse creation
/// empties it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub username: String,
    #[serde(default)]
    pub inventory: Vec<Item>,
    /// Equipped items keyed by slot name (`"wield"`, `"head"`, ...).
    #[serde(default)]
    pub equipment: BTreeMap<String, Item>,
    #[serde(default)]
    pub currency: Wallet,
}

impl Player {
    pub fn new(username: impl Into<String>) -> Self {
        Player {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.inventory.push(item);
        self
    }

    pub fn with_equipped(mut self, slot: impl Into<String>, item: Item) -> Self {
        self.equipment.insert(slot.into(), item);
        self
    }

    pub fn with_currency(mut self, currency: Wallet) -> Self {
        self.currency = currency;
        self
    }

    /// Number of stacks held, inventory and equipment together.
    pub fn carried_stacks(&self) -> usize {
        self.inventory.len() + self.equipment.len()
    }
}
