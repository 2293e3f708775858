//! Equipment, talent and hero tables
//!
//! Loaded once at process start and shared read-only. Progression state refers
//! to entries by id; ids are resolved here, never held as live references.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Numeric run parameters bonuses can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    FireRate,
    UnitsPerShot,
    UnitPower,
    Reward,
}

impl Stat {
    pub const ALL: [Stat; 4] = [
        Stat::FireRate,
        Stat::UnitsPerShot,
        Stat::UnitPower,
        Stat::Reward,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Magazine,
    Mechanism,
    Helmet,
}

macro_rules! catalog_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

catalog_id!(ItemId);
catalog_id!(TalentId);
catalog_id!(HeroId);

/// Extra units granted by gates of each kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateModifiers {
    pub add_bonus: i32,
    pub multiply_bonus: i32,
}

impl GateModifiers {
    pub fn merge(&mut self, other: &GateModifiers) {
        self.add_bonus = self.add_bonus.saturating_add(other.add_bonus);
        self.multiply_bonus = self.multiply_bonus.saturating_add(other.multiply_bonus);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub slot: EquipSlot,
    /// Flat contribution to base stats
    #[serde(default)]
    pub stats: BTreeMap<Stat, f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalentDef {
    pub id: TalentId,
    pub stat: Stat,
    pub per_level_percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroDef {
    pub id: HeroId,
    #[serde(default)]
    pub gate_modifiers: GateModifiers,
    /// Flat bonuses applied after multiplicative scaling
    #[serde(default)]
    pub stat_bonuses: BTreeMap<Stat, f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RewardTable {
    pub base: f32,
    pub per_level: f32,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            base: 100.0,
            per_level: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    rewards: RewardTable,
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    talents: Vec<TalentDef>,
    #[serde(default)]
    heroes: Vec<HeroDef>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub rewards: RewardTable,
    items: BTreeMap<ItemId, ItemDef>,
    talents: BTreeMap<TalentId, TalentDef>,
    heroes: BTreeMap<HeroId, HeroDef>,
}

impl Catalog {
    pub fn builtin() -> Arc<Self> {
        let catalog = Self::from_json_str(BUILTIN_CATALOG).expect("builtin catalog should parse");
        Arc::new(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let parsed: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Catalog {
            rewards: parsed.rewards,
            ..Default::default()
        };
        for item in parsed.items {
            if catalog.items.contains_key(&item.id) {
                return Err(CatalogError::Duplicate(item.id.0));
            }
            catalog.items.insert(item.id.clone(), item);
        }
        for talent in parsed.talents {
            if catalog.talents.contains_key(&talent.id) {
                return Err(CatalogError::Duplicate(talent.id.0));
            }
            catalog.talents.insert(talent.id.clone(), talent);
        }
        for hero in parsed.heroes {
            if catalog.heroes.contains_key(&hero.id) {
                return Err(CatalogError::Duplicate(hero.id.0));
            }
            catalog.heroes.insert(hero.id.clone(), hero);
        }
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn item(&self, id: &ItemId) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn talent(&self, id: &TalentId) -> Option<&TalentDef> {
        self.talents.get(id)
    }

    pub fn hero(&self, id: &HeroId) -> Option<&HeroDef> {
        self.heroes.get(id)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read catalog from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("duplicate catalog id '{0}'")]
    Duplicate(String),
}
