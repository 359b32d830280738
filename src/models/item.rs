//! Item instances.
//!
//! An [`Item`] is one stack of a definition (`quantity` may be greater than
//! one). Durability is optional; items without it are unaffected by the
//! death penalty.

use serde::{Deserialize, Serialize};

fn default_quantity() -> u32 {
    1
}

/// A concrete item instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique id of this instance.
    pub instance_id: String,
    /// Id of the item definition this instance was created from.
    pub definition: String,
    /// Display name.
    pub name: String,
    /// Stack size.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Weight of a single unit.
    #[serde(default)]
    pub weight: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durability: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_durability: Option<f32>,
}

impl Item {
    pub fn new(
        instance_id: impl Into<String>,
        definition: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Item {
            instance_id: instance_id.into(),
            definition: definition.into(),
            name: name.into(),
            quantity: 1,
            weight: 0.0,
            durability: None,
            max_durability: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Give the item a durability track, starting at `max`.
    pub fn with_durability(mut self, max: f32) -> Self {
        self.durability = Some(max);
        self.max_durability = Some(max);
        self
    }

    /// Weight of the whole stack.
    pub fn total_weight(&self) -> f32 {
        self.weight * self.quantity as f32
    }

    /// Remove `percent` of the item's maximum durability, clamping at zero.
    ///
    /// Returns `false` when the item has no durability to lose.
    pub fn apply_durability_loss(&mut self, percent: f32) -> bool {
        let Some(current) = self.durability else {
            return false;
        };
        let base = self.max_durability.unwrap_or(current);
        let loss = base * percent.clamp(0.0, 100.0) / 100.0;
        self.durability = Some((current - loss).max(0.0));
        true
    }
}
