//! Read-only snapshot of the player's persistent progression

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::catalog::{EquipSlot, HeroId, ItemId, TalentId};

/// What the player has equipped, learned and unlocked.
///
/// Owned by the surrounding application; the core only reads it once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionState {
    pub equipped: BTreeMap<EquipSlot, ItemId>,
    pub talent_levels: BTreeMap<TalentId, u32>,
    pub unlocked_heroes: BTreeSet<HeroId>,
}

impl ProgressionState {
    pub fn equip(mut self, slot: EquipSlot, item: &str) -> Self {
        self.equipped.insert(slot, ItemId::from(item));
        self
    }

    pub fn with_talent(mut self, talent: &str, level: u32) -> Self {
        self.talent_levels.insert(TalentId::from(talent), level);
        self
    }

    pub fn with_hero(mut self, hero: &str) -> Self {
        self.unlocked_heroes.insert(HeroId::from(hero));
        self
    }
}
