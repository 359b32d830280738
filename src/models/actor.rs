//! Non-player characters.
//!
//! An [`Actor`] is the template and live state of an NPC: the same record is
//! used to build its corpse when it dies and to restore it when it respawns.

use serde::{Deserialize, Serialize};

/// Actor type used for player characters. Decay events carrying it are
/// never turned into respawns.
pub const PLAYER_ACTOR_TYPE: &str = "player";

fn default_actor_type() -> String {
    "npc".to_string()
}

fn default_hp() -> u32 {
    10
}

/// Physical size of an actor. Drives the weight of the corpse it leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl SizeClass {
    /// Weight of an empty corpse of this size.
    pub fn base_corpse_weight(self) -> f32 {
        match self {
            SizeClass::Tiny => 10.0,
            SizeClass::Small => 50.0,
            SizeClass::Medium => 150.0,
            SizeClass::Large => 500.0,
            SizeClass::Huge => 1500.0,
            SizeClass::Gargantuan => 5000.0,
        }
    }

    /// Inventory slots a corpse of this size offers before it is stretched
    /// to fit its loot.
    pub fn corpse_slots(self) -> usize {
        match self {
            SizeClass::Tiny => 5,
            SizeClass::Small => 10,
            SizeClass::Medium => 20,
            SizeClass::Large => 30,
            SizeClass::Huge => 40,
            SizeClass::Gargantuan => 60,
        }
    }
}

/// One possible drop when an actor dies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootEntry {
    pub definition: String,
    pub name: String,
    /// Probability in `[0, 1]` that the entry drops at all.
    pub chance: f32,
    #[serde(default = "default_quantity")]
    pub min: u32,
    #[serde(default = "default_quantity")]
    pub max: u32,
    #[serde(default)]
    pub weight: f32,
}

fn default_quantity() -> u32 {
    1
}

/// A non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub name: String,
    #[serde(default = "default_actor_type")]
    pub actor_type: String,
    #[serde(default)]
    pub size: SizeClass,
    #[serde(default = "default_hp")]
    pub hp: u32,
    #[serde(default = "default_hp")]
    pub max_hp: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub loot: Vec<LootEntry>,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
            actor_type: default_actor_type(),
            size: SizeClass::default(),
            hp: default_hp(),
            max_hp: default_hp(),
            keywords: Vec::new(),
            loot: Vec::new(),
        }
    }

    pub fn with_type(mut self, actor_type: impl Into<String>) -> Self {
        self.actor_type = actor_type.into();
        self
    }

    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = size;
        self
    }

    pub fn with_max_hp(mut self, max_hp: u32) -> Self {
        self.max_hp = max_hp;
        self.hp = max_hp;
        self
    }

    pub fn with_loot(mut self, entry: LootEntry) -> Self {
        self.loot.push(entry);
        self
    }

    /// Words a player can use to refer to this actor (and to its corpse).
    ///
    /// Falls back to the words of the name when no keywords are configured.
    pub fn search_keywords(&self) -> Vec<String> {
        if !self.keywords.is_empty() {
            return self.keywords.clone();
        }
        self.name
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .filter(|w| !matches!(w.as_str(), "a" | "an" | "the"))
            .collect()
    }
}
