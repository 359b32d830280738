//! Corpse records.
//!
//! A [`Corpse`] is a container-like world object. Fields shared by both kinds
//! live on the struct; kind-specific state is carried by [`CorpseKind`].
//!
//! - [`NpcCorpse`] decays on a timer and leads to a respawn.
//! - [`PlayerCorpse`] stays until its owner loots it (plus a grace period) or
//!   until the abandonment sweep removes it.

use serde::{Deserialize, Serialize};

use crate::models::actor::Actor;
use crate::models::item::Item;
use crate::models::wallet::Wallet;

/// Base weight of a player's body, before carried items.
pub const PLAYER_CORPSE_BASE_WEIGHT: f32 = 150.0;
/// Minimum slot capacity of a player corpse.
pub const PLAYER_CORPSE_SLOTS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcCorpse {
    pub actor_id: String,
    pub actor_type: String,
    /// Room the actor reappears in once the corpse decays.
    pub spawn_room_id: String,
    /// Absolute decay time, epoch milliseconds.
    pub decay_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCorpse {
    pub owner_username: String,
    pub death_room_id: String,
    /// Copy of the owner's wallet at the moment of death.
    pub currency: Wallet,
    #[serde(default)]
    pub looted: bool,
    #[serde(default)]
    pub looted_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CorpseKind {
    Npc(NpcCorpse),
    Player(PlayerCorpse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corpse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    /// Room whose item list holds this corpse.
    pub room_id: String,
    pub inventory: Vec<Item>,
    pub weight: f32,
    /// Number of item slots.
    pub capacity: usize,
    pub created_at: u64,
    #[serde(default)]
    pub killer: Option<String>,
    pub kind: CorpseKind,
}

impl Corpse {
    /// Build the corpse an NPC leaves behind.
    pub fn for_actor(
        id: impl Into<String>,
        actor: &Actor,
        room_id: &str,
        killer: Option<String>,
        loot: Vec<Item>,
        created_at: u64,
        decay_at: u64,
    ) -> Self {
        let loot_weight: f32 = loot.iter().map(Item::total_weight).sum();
        let capacity = actor.size.corpse_slots().max(loot.len());
        let mut keywords = vec!["corpse".to_string()];
        keywords.extend(actor.search_keywords());
        Corpse {
            id: id.into(),
            name: format!("the corpse of {}", actor.name),
            description: format!("The corpse of {} lies here.", actor.name),
            keywords,
            room_id: room_id.to_string(),
            inventory: loot,
            weight: actor.size.base_corpse_weight() + loot_weight,
            capacity,
            created_at,
            killer,
            kind: CorpseKind::Npc(NpcCorpse {
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type.clone(),
                spawn_room_id: room_id.to_string(),
                decay_at,
            }),
        }
    }

    /// Build the corpse a player leaves behind. `items` has already been
    /// stripped from the player.
    pub fn for_player(
        id: impl Into<String>,
        username: &str,
        room_id: &str,
        killer: Option<String>,
        items: Vec<Item>,
        currency: Wallet,
        created_at: u64,
    ) -> Self {
        let item_weight: f32 = items.iter().map(Item::total_weight).sum();
        let capacity = PLAYER_CORPSE_SLOTS.max(items.len());
        Corpse {
            id: id.into(),
            name: format!("the corpse of {}", username),
            description: format!(
                "The corpse of {} lies here. Only its owner may loot it.",
                username
            ),
            keywords: vec![
                "corpse".to_string(),
                username.to_lowercase(),
                "remains".to_string(),
            ],
            room_id: room_id.to_string(),
            inventory: items,
            weight: PLAYER_CORPSE_BASE_WEIGHT + item_weight,
            capacity,
            created_at,
            killer,
            kind: CorpseKind::Player(PlayerCorpse {
                owner_username: username.to_string(),
                death_room_id: room_id.to_string(),
                currency,
                looted: false,
                looted_at: None,
            }),
        }
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, CorpseKind::Npc(_))
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CorpseKind::Player(_))
    }

    pub fn as_npc(&self) -> Option<&NpcCorpse> {
        match &self.kind {
            CorpseKind::Npc(npc) => Some(npc),
            CorpseKind::Player(_) => None,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerCorpse> {
        match &self.kind {
            CorpseKind::Player(player) => Some(player),
            CorpseKind::Npc(_) => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerCorpse> {
        match &mut self.kind {
            CorpseKind::Player(player) => Some(player),
            CorpseKind::Npc(_) => None,
        }
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.as_npc().map(|npc| npc.actor_id.as_str())
    }

    pub fn owner(&self) -> Option<&str> {
        self.as_player().map(|p| p.owner_username.as_str())
    }

    pub fn matches_keyword(&self, word: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(word))
    }

    pub fn item_count(&self) -> usize {
        self.inventory.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::SizeClass;

    #[test]
    fn actor_corpse_weight_includes_loot() {
        let actor = Actor::new("troll_1", "a cave troll").with_size(SizeClass::Large);
        let loot = vec![Item::new("club_1", "club", "a club").with_weight(12.0)];
        let corpse = Corpse::for_actor("c1", &actor, "R1", None, loot, 1_000, 6_000);
        assert!((corpse.weight - 512.0).abs() < 1e-4);
        assert_eq!(corpse.capacity, SizeClass::Large.corpse_slots());
        assert_eq!(corpse.actor_id(), Some("troll_1"));
        assert!(corpse.matches_keyword("corpse"));
        assert!(corpse.matches_keyword("TROLL"));
    }

    #[test]
    fn capacity_stretches_to_fit_inventory() {
        let actor = Actor::new("rat_1", "a rat").with_size(SizeClass::Tiny);
        let loot: Vec<Item> = (0..8)
            .map(|i| Item::new(format!("tooth_{i}"), "tooth", "a rat tooth"))
            .collect();
        let corpse = Corpse::for_actor("c2", &actor, "R1", None, loot, 0, 1);
        assert_eq!(corpse.capacity, 8);
    }

    #[test]
    fn kind_is_tagged_in_json() {
        let corpse = Corpse::for_player("pc1", "alice", "R2", None, Vec::new(), Wallet::default(), 5);
        let json = serde_json::to_value(&corpse).unwrap();
        assert_eq!(json["kind"]["type"], "player");
        assert_eq!(json["kind"]["ownerUsername"], "alice");
        let back: Corpse = serde_json::from_value(json).unwrap();
        assert_eq!(back.owner(), Some("alice"));
    }
}
