//! Gate Runner - a lane battle where a stream of units pushes through
//! modifier gates toward a target
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entity pool, stepping, collisions)
//! - `bonus`: Turns persistent progression into a frozen run configuration
//! - `level`: Scripted level timelines
//! - `controller`: Owns one battle and drives it from an external clock
//! - `settings`: Data-driven simulation tuning

pub mod bonus;
pub mod controller;
pub mod level;
pub mod settings;
pub mod sim;

pub use bonus::{Catalog, ConfigError, ProgressionState, RunConfig, aggregate};
pub use controller::{RunController, StartError};
pub use level::{GateOp, LevelDefinition, LevelSet, TimelineEvent};
pub use settings::SimSettings;
pub use sim::{BattleOutcome, EntityCategory};

/// Game configuration constants
pub mod consts {
    /// Frame step used by the headless runner (60 Hz)
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Largest `dt` a single step will integrate
    pub const MAX_STEP_DT: f32 = 0.25;

    /// Playfield vertical bounds
    pub const PLAYFIELD_MIN_Y: f32 = 20.0;
    pub const PLAYFIELD_MAX_Y: f32 = 280.0;

    /// Launch point defaults - units leave from the left edge
    pub const LAUNCH_X: f32 = 40.0;
    pub const LAUNCH_Y: f32 = 150.0;

    /// Target line and gate lifecycle boundaries
    pub const TARGET_X: f32 = 440.0;
    pub const GATE_SPAWN_X: f32 = 420.0;
    pub const GATE_CULL_X: f32 = -20.0;

    /// Speeds (pixels/s)
    pub const UNIT_SPEED: f32 = 240.0;
    pub const GATE_SPEED: f32 = 80.0;

    /// Gate hit region half-extents (rectangular, not circular)
    pub const GATE_HALF_WIDTH: f32 = 12.0;
    pub const GATE_HALF_HEIGHT: f32 = 30.0;

    /// Pool capacities
    pub const UNIT_CAPACITY: usize = 200;
    pub const GATE_CAPACITY: usize = 16;
    pub const EFFECT_CAPACITY: usize = 64;

    /// Impact marker lifetime (seconds)
    pub const EFFECT_LIFETIME: f32 = 0.4;
    /// Scatter radius for units spawned by a gate
    pub const CLONE_SCATTER: f32 = 10.0;
    /// Vertical spacing between units of the same volley
    pub const VOLLEY_SPACING: f32 = 8.0;
}

/// Clamp a vertical position into the playfield lane bounds
#[inline]
pub fn clamp_lane(y: f32, min_y: f32, max_y: f32) -> f32 {
    if y.is_nan() {
        return min_y;
    }
    y.clamp(min_y, max_y)
}
