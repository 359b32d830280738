//! Loot generation collaborator.
//!
//! Corpse creation asks the [`LootSource`] resource for an actor's drops.
//! Generators may fail; the caller treats a failure as "no loot".

use bevy_ecs::prelude::Resource;

use crate::models::actor::Actor;
use crate::models::item::Item;

/// Produces the items an actor drops when it dies.
pub trait LootGenerator: Send + Sync {
    fn generate(&self, actor: &Actor) -> Result<Vec<Item>, String>;
}

/// The loot generator in use.
#[derive(Resource)]
pub struct LootSource {
    generator: Box<dyn LootGenerator>,
}

impl LootSource {
    pub fn new(generator: impl LootGenerator + 'static) -> Self {
        LootSource {
            generator: Box::new(generator),
        }
    }

    pub fn generate(&self, actor: &Actor) -> Result<Vec<Item>, String> {
        self.generator.generate(actor)
    }
}

/// Rolls each of the actor's [`LootEntry`](crate::models::actor::LootEntry)
/// rows independently.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableLootGenerator;

impl LootGenerator for TableLootGenerator {
    fn generate(&self, actor: &Actor) -> Result<Vec<Item>, String> {
        let mut items = Vec::new();
        for entry in &actor.loot {
            if entry.min > entry.max {
                return Err(format!(
                    "Loot entry '{}' of '{}' has min {} > max {}",
                    entry.definition, actor.id, entry.min, entry.max
                ));
            }
            if fastrand::f32() >= entry.chance {
                continue;
            }
            let quantity = fastrand::u32(entry.min..=entry.max);
            if quantity == 0 {
                continue;
            }
            let instance_id = format!("{}_{:016x}", entry.definition, fastrand::u64(..));
            items.push(
                Item::new(instance_id, entry.definition.clone(), entry.name.clone())
                    .with_quantity(quantity)
                    .with_weight(entry.weight),
            );
        }
        Ok(items)
    }
}

/// Never drops anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoot;

impl LootGenerator for NoLoot {
    fn generate(&self, _actor: &Actor) -> Result<Vec<Item>, String> {
        Ok(Vec::new())
    }
}
