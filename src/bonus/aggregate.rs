//! Run configuration aggregation
//!
//! `aggregate` folds a progression snapshot through the catalog into a frozen
//! `RunConfig`. It is pure: same inputs, same config.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Catalog, EquipSlot, GateModifiers, HeroId, ItemId, Stat, TalentId};
use super::progression::ProgressionState;
use crate::level::GateOp;

/// Baseline stats before any equipment
pub const BASE_FIRE_RATE: f32 = 1.0;
pub const BASE_UNITS_PER_SHOT: f32 = 1.0;
pub const BASE_UNIT_POWER: f32 = 1.0;
pub const BASE_REWARD_MULTIPLIER: f32 = 1.0;

/// Frozen numeric parameters for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub level_index: usize,
    /// Units per second
    pub base_fire_rate: f32,
    pub base_units_per_shot: f32,
    pub base_unit_power: f32,
    pub reward_multiplier: f32,
    /// Flat bonuses, applied after multiplicative scaling
    pub additive_bonuses: BTreeMap<Stat, f32>,
    /// Summed fractions (0.15 = +15%), never compounded
    pub multiplicative_bonuses: BTreeMap<Stat, f32>,
    pub gate_modifiers: GateModifiers,
    /// Gold for a win before the reward multiplier
    pub base_reward: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            level_index: 0,
            base_fire_rate: BASE_FIRE_RATE,
            base_units_per_shot: BASE_UNITS_PER_SHOT,
            base_unit_power: BASE_UNIT_POWER,
            reward_multiplier: BASE_REWARD_MULTIPLIER,
            additive_bonuses: BTreeMap::new(),
            multiplicative_bonuses: BTreeMap::new(),
            gate_modifiers: GateModifiers::default(),
            base_reward: 0.0,
        }
    }
}

impl RunConfig {
    pub fn base(&self, stat: Stat) -> f32 {
        match stat {
            Stat::FireRate => self.base_fire_rate,
            Stat::UnitsPerShot => self.base_units_per_shot,
            Stat::UnitPower => self.base_unit_power,
            Stat::Reward => self.reward_multiplier,
        }
    }

    fn base_mut(&mut self, stat: Stat) -> &mut f32 {
        match stat {
            Stat::FireRate => &mut self.base_fire_rate,
            Stat::UnitsPerShot => &mut self.base_units_per_shot,
            Stat::UnitPower => &mut self.base_unit_power,
            Stat::Reward => &mut self.reward_multiplier,
        }
    }

    /// `base × (1 + Σ multiplicative) + Σ additive`
    pub fn effective(&self, stat: Stat) -> f32 {
        let mult = self.multiplicative_bonuses.get(&stat).copied().unwrap_or(0.0);
        let add = self.additive_bonuses.get(&stat).copied().unwrap_or(0.0);
        self.base(stat) * (1.0 + mult) + add
    }

    pub fn effective_fire_rate(&self) -> f32 {
        self.effective(Stat::FireRate)
    }

    /// Whole units per volley, at least one
    pub fn effective_units_per_shot(&self) -> u32 {
        let units = self.effective(Stat::UnitsPerShot).floor();
        if units.is_nan() || units < 1.0 {
            1
        } else {
            units as u32
        }
    }

    pub fn effective_unit_power(&self) -> f32 {
        self.effective(Stat::UnitPower)
    }

    pub fn effective_reward_multiplier(&self) -> f32 {
        self.effective(Stat::Reward)
    }

    /// Units a gate spawns once hero modifiers are applied
    pub fn gate_magnitude(&self, op: GateOp, magnitude: u32) -> u32 {
        let bonus = match op {
            GateOp::Add => self.gate_modifiers.add_bonus,
            GateOp::Multiply => self.gate_modifiers.multiply_bonus,
        };
        (i64::from(magnitude) + i64::from(bonus)).clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Gold for winning this run
    pub fn win_reward(&self) -> f32 {
        self.base_reward * self.effective_reward_multiplier()
    }
}

/// Build the run configuration for `level_index` from a progression snapshot.
///
/// Any id the catalog does not know means the persistent state is corrupt,
/// so this fails instead of dropping the entry.
pub fn aggregate(
    catalog: &Catalog,
    progression: &ProgressionState,
    level_index: usize,
) -> Result<RunConfig, ConfigError> {
    let mut config = RunConfig {
        level_index,
        base_reward: catalog.rewards.base + catalog.rewards.per_level * level_index as f32,
        ..Default::default()
    };

    // Equipment: flat base contributions
    for (slot, item_id) in &progression.equipped {
        let item = catalog
            .item(item_id)
            .ok_or_else(|| ConfigError::UnknownItem(item_id.clone()))?;
        if item.slot != *slot {
            return Err(ConfigError::SlotMismatch {
                slot: *slot,
                item: item_id.clone(),
                declared: item.slot,
            });
        }
        for (stat, amount) in &item.stats {
            *config.base_mut(*stat) += amount;
        }
    }

    // Talents: percentages summed per stat
    for (talent_id, level) in &progression.talent_levels {
        let talent = catalog
            .talent(talent_id)
            .ok_or_else(|| ConfigError::UnknownTalent(talent_id.clone()))?;
        if *level == 0 {
            continue;
        }
        let fraction = *level as f32 * talent.per_level_percent / 100.0;
        *config.multiplicative_bonuses.entry(talent.stat).or_insert(0.0) += fraction;
    }

    // Heroes: gate modifiers and flat bonuses
    for hero_id in &progression.unlocked_heroes {
        let hero = catalog
            .hero(hero_id)
            .ok_or_else(|| ConfigError::UnknownHero(hero_id.clone()))?;
        config.gate_modifiers.merge(&hero.gate_modifiers);
        for (stat, amount) in &hero.stat_bonuses {
            *config.additive_bonuses.entry(*stat).or_insert(0.0) += amount;
        }
    }

    log::debug!(
        "Run config for level {}: fire_rate={:.2} units/shot={} power={:.2} reward_x={:.2}",
        level_index,
        config.effective_fire_rate(),
        config.effective_units_per_shot(),
        config.effective_unit_power(),
        config.effective_reward_multiplier()
    );

    Ok(config)
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("equipped item '{0}' is not in the catalog")]
    UnknownItem(ItemId),
    #[error("talent '{0}' is not in the catalog")]
    UnknownTalent(TalentId),
    #[error("hero '{0}' is not in the catalog")]
    UnknownHero(HeroId),
    #[error("item '{item}' is equipped as {slot:?} but declares {declared:?}")]
    SlotMismatch {
        slot: EquipSlot,
        item: ItemId,
        declared: EquipSlot,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_empty_progression_is_baseline() {
        let catalog = Catalog::builtin();
        let config = aggregate(&catalog, &ProgressionState::default(), 0).unwrap();
        assert!(approx(config.effective_fire_rate(), BASE_FIRE_RATE));
        assert_eq!(config.effective_units_per_shot(), 1);
        assert!(approx(config.effective_unit_power(), BASE_UNIT_POWER));
        assert!(approx(config.effective_reward_multiplier(), 1.0));
        assert!(approx(config.base_reward, 100.0));
    }

    #[test]
    fn test_equipment_adds_to_base() {
        let catalog = Catalog::builtin();
        let progression = ProgressionState::default()
            .equip(EquipSlot::Weapon, "pistol")
            .equip(EquipSlot::Magazine, "extended_mag")
            .equip(EquipSlot::Helmet, "miner_helmet");
        let config = aggregate(&catalog, &progression, 2).unwrap();
        assert!(approx(config.base_fire_rate, 3.0));
        assert!(approx(config.base_unit_power, 2.0));
        assert_eq!(config.effective_units_per_shot(), 3);
        assert!(approx(config.reward_multiplier, 1.2));
        assert!(approx(config.base_reward, 150.0));
    }

    #[test]
    fn test_talents_sum_percentages_without_compounding() {
        let catalog = Catalog::builtin();
        // quick_hands: 5% per level
        let progression = ProgressionState::default()
            .equip(EquipSlot::Weapon, "pistol")
            .with_talent("quick_hands", 4)
            .with_talent("heavy_rounds", 0);
        let config = aggregate(&catalog, &progression, 0).unwrap();
        assert!(approx(config.multiplicative_bonuses[&Stat::FireRate], 0.20));
        assert!(!config.multiplicative_bonuses.contains_key(&Stat::UnitPower));
        // base 1 + pistol 2 = 3, × 1.2
        assert!(approx(config.effective_fire_rate(), 3.6));
    }

    #[test]
    fn test_multiplicative_then_additive_order() {
        let catalog = Catalog::builtin();
        // heavy_rounds 10%/level, captain +0.5 flat power
        let progression = ProgressionState::default()
            .equip(EquipSlot::Weapon, "pistol")
            .with_talent("heavy_rounds", 5)
            .with_hero("captain");
        let config = aggregate(&catalog, &progression, 0).unwrap();
        // (1 + 1) × 1.5 + 0.5
        assert!(approx(config.effective_unit_power(), 3.5));
    }

    #[test]
    fn test_heroes_merge_gate_modifiers() {
        let catalog = Catalog::builtin();
        let progression = ProgressionState::default()
            .with_hero("captain")
            .with_hero("alchemist");
        let config = aggregate(&catalog, &progression, 0).unwrap();
        assert_eq!(config.gate_modifiers.add_bonus, 1);
        assert_eq!(config.gate_modifiers.multiply_bonus, 1);
        assert_eq!(config.gate_magnitude(GateOp::Add, 3), 4);
        assert_eq!(config.gate_magnitude(GateOp::Multiply, 2), 3);
    }

    #[test]
    fn test_gate_magnitude_never_negative() {
        let config = RunConfig {
            gate_modifiers: GateModifiers {
                add_bonus: -5,
                multiply_bonus: 0,
            },
            ..Default::default()
        };
        assert_eq!(config.gate_magnitude(GateOp::Add, 2), 0);
    }

    #[test]
    fn test_unknown_ids_fail_fast() {
        let catalog = Catalog::builtin();

        let progression = ProgressionState::default().equip(EquipSlot::Weapon, "laser");
        assert_eq!(
            aggregate(&catalog, &progression, 0),
            Err(ConfigError::UnknownItem(ItemId::from("laser")))
        );

        let progression = ProgressionState::default().with_hero("ghost");
        assert_eq!(
            aggregate(&catalog, &progression, 0),
            Err(ConfigError::UnknownHero(HeroId::from("ghost")))
        );

        let progression = ProgressionState::default().with_talent("telekinesis", 1);
        assert_eq!(
            aggregate(&catalog, &progression, 0),
            Err(ConfigError::UnknownTalent(TalentId::from("telekinesis")))
        );
    }

    #[test]
    fn test_slot_mismatch_fails() {
        let catalog = Catalog::builtin();
        let progression = ProgressionState::default().equip(EquipSlot::Helmet, "pistol");
        assert!(matches!(
            aggregate(&catalog, &progression, 0),
            Err(ConfigError::SlotMismatch {
                slot: EquipSlot::Helmet,
                declared: EquipSlot::Weapon,
                ..
            })
        ));
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let catalog = Catalog::builtin();
        let progression = ProgressionState::default()
            .equip(EquipSlot::Weapon, "rifle")
            .equip(EquipSlot::Mechanism, "gear_train")
            .with_talent("bounty", 3)
            .with_hero("quartermaster");
        let a = aggregate(&catalog, &progression, 1).unwrap();
        let b = aggregate(&catalog, &progression, 1).unwrap();
        assert_eq!(a, b);
        assert!(approx(a.win_reward(), 125.0 * (1.0 * 1.24 + 0.1)));
    }
}
