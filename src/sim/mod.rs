//! Deterministic simulation module
//!
//! All battle logic lives here. This module must be pure and deterministic:
//! - Caller-supplied `dt` only, no clocks
//! - Seeded RNG only
//! - Stable iteration order (by activation order within each pool)
//! - No rendering or platform dependencies

pub mod collision;
pub mod pool;
pub mod state;
pub mod tick;

pub use collision::{HitBox, first_gate_hit, past_cull_line, reached_target};
pub use pool::EntityPool;
pub use state::{
    BattleOutcome, BattlePhase, BattleState, Entity, EntityCategory, EntityHandle, EntityId,
    EntitySnapshot, Payload, SimEvent, TickInput,
};
pub use tick::tick;
