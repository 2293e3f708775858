//! Bonus aggregation
//!
//! Persistent progression (equipment, talents, heroes) is resolved through
//! immutable catalog tables into a single frozen `RunConfig` at run start.

pub mod aggregate;
pub mod catalog;
pub mod progression;

pub use aggregate::{ConfigError, RunConfig, aggregate};
pub use catalog::{
    Catalog, CatalogError, EquipSlot, GateModifiers, HeroDef, HeroId, ItemDef, ItemId, Stat,
    TalentDef, TalentId,
};
pub use progression::ProgressionState;
