//! Canonical corpse table.
//!
//! [`CorpseStore`] owns every live corpse plus two indexes:
//! - actor id → corpse id, which keeps NPC corpses unique per actor and lets
//!   the respawn logic ask whether an actor is still lying somewhere;
//! - owner username → corpse ids, since a player may have several corpses.
//!
//! Player corpses whose room vanished between runs are held aside as
//! *stranded*: they are not in the world, but they are exported again so a
//! later restore can place them.
//!
//! The store never touches rooms or timers; the systems in
//! [`crate::systems::corpse`] keep those consistent with it.

use std::collections::BTreeSet;

use bevy_ecs::prelude::Resource;
use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::corpse::{Corpse, CorpseKind};

/// Exported corpse state, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpseState {
    #[serde(default)]
    pub npc: Vec<Corpse>,
    #[serde(default)]
    pub player: Vec<Corpse>,
}

impl CorpseState {
    pub fn len(&self) -> usize {
        self.npc.len() + self.player.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npc.is_empty() && self.player.is_empty()
    }

    /// Split a flat list of corpses by kind.
    pub fn from_flat(corpses: Vec<Corpse>) -> Self {
        let (npc, player) = corpses.into_iter().partition(Corpse::is_npc);
        CorpseState { npc, player }
    }
}

/// Counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpseSummary {
    pub npc: usize,
    pub player: usize,
    pub looted: usize,
    pub items: usize,
}

#[derive(Resource, Debug, Default)]
pub struct CorpseStore {
    corpses: FxHashMap<String, Corpse>,
    by_actor: FxHashMap<String, String>,
    by_owner: FxHashMap<String, BTreeSet<String>>,
    stranded: Vec<Corpse>,
}

impl CorpseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a corpse and index it. Returns the corpse previously stored
    /// under the same id, if any. A stranded corpse with that id is released.
    pub fn insert(&mut self, corpse: Corpse) -> Option<Corpse> {
        self.stranded.retain(|c| c.id != corpse.id);
        let previous = self.remove(&corpse.id);
        match &corpse.kind {
            CorpseKind::Npc(npc) => {
                if let Some(old) = self.by_actor.insert(npc.actor_id.clone(), corpse.id.clone()) {
                    warn!(
                        "[Corpse:{}] Actor '{}' was still indexed to corpse '{}'",
                        corpse.id, npc.actor_id, old
                    );
                }
            }
            CorpseKind::Player(player) => {
                self.by_owner
                    .entry(player.owner_username.clone())
                    .or_default()
                    .insert(corpse.id.clone());
            }
        }
        self.corpses.insert(corpse.id.clone(), corpse);
        previous
    }

    /// Remove a corpse from the table and its index.
    pub fn remove(&mut self, corpse_id: &str) -> Option<Corpse> {
        let corpse = self.corpses.remove(corpse_id)?;
        match &corpse.kind {
            CorpseKind::Npc(npc) => {
                if self.by_actor.get(&npc.actor_id).map(String::as_str) == Some(corpse_id) {
                    self.by_actor.remove(&npc.actor_id);
                }
            }
            CorpseKind::Player(player) => {
                if let Some(ids) = self.by_owner.get_mut(&player.owner_username) {
                    ids.remove(corpse_id);
                    if ids.is_empty() {
                        self.by_owner.remove(&player.owner_username);
                    }
                }
            }
        }
        Some(corpse)
    }

    pub fn get(&self, corpse_id: &str) -> Option<&Corpse> {
        self.corpses.get(corpse_id)
    }

    pub fn get_mut(&mut self, corpse_id: &str) -> Option<&mut Corpse> {
        self.corpses.get_mut(corpse_id)
    }

    pub fn contains(&self, corpse_id: &str) -> bool {
        self.corpses.contains_key(corpse_id)
    }

    pub fn has_active_corpse(&self, actor_id: &str) -> bool {
        self.by_actor.contains_key(actor_id)
    }

    pub fn get_corpse_by_actor(&self, actor_id: &str) -> Option<&Corpse> {
        self.by_actor
            .get(actor_id)
            .and_then(|id| self.corpses.get(id))
    }

    /// Corpses owned by a player, oldest id first.
    pub fn player_corpses(&self, owner: &str) -> Vec<&Corpse> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.corpses.get(id)).collect())
            .unwrap_or_default()
    }

    /// Ids of all player corpses, sorted.
    pub fn player_corpse_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .corpses
            .values()
            .filter(|c| c.is_player())
            .map(|c| c.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// All corpse ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.corpses.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.corpses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpses.is_empty()
    }

    /// Hold a corpse that could not be placed. Replaces a stranded corpse
    /// with the same id.
    pub fn strand(&mut self, corpse: Corpse) {
        self.stranded.retain(|c| c.id != corpse.id);
        self.stranded.push(corpse);
        self.stranded.sort_by(|a, b| a.id.cmp(&b.id));
    }

    pub fn stranded(&self) -> &[Corpse] {
        &self.stranded
    }

    /// Drop stranded corpses matching `predicate`, returning them.
    pub fn release_stranded(&mut self, mut predicate: impl FnMut(&Corpse) -> bool) -> Vec<Corpse> {
        let (released, kept) = std::mem::take(&mut self.stranded)
            .into_iter()
            .partition(|c| predicate(c));
        self.stranded = kept;
        released
    }

    /// A corpse id derived from `prefix` and `now` that is not in use yet.
    pub fn next_corpse_id(&self, prefix: &str, now: u64) -> String {
        let base = format!("{}_{}", prefix, now);
        if !self.corpses.contains_key(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| !self.corpses.contains_key(id))
            .unwrap_or(base)
    }

    /// Copy of every corpse, split by kind and sorted by id. Stranded
    /// corpses follow the live ones.
    pub fn export_state(&self) -> CorpseState {
        let mut state = CorpseState::default();
        for id in self.ids() {
            if let Some(corpse) = self.corpses.get(&id) {
                match corpse.kind {
                    CorpseKind::Npc(_) => state.npc.push(corpse.clone()),
                    CorpseKind::Player(_) => state.player.push(corpse.clone()),
                }
            }
        }
        state.player.extend(self.stranded.iter().cloned());
        state
    }

    pub fn summary(&self) -> CorpseSummary {
        let mut summary = CorpseSummary::default();
        for corpse in self.corpses.values() {
            summary.items += corpse.inventory.len();
            match &corpse.kind {
                CorpseKind::Npc(_) => summary.npc += 1,
                CorpseKind::Player(p) => {
                    summary.player += 1;
                    if p.looted {
                        summary.looted += 1;
                    }
                }
            }
        }
        summary
    }
}
