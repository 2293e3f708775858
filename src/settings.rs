//! Simulation tuning
//!
//! Geometry, speeds and pool capacities. Loaded once before a battle and
//! never touched by the simulation afterwards.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Simulation tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    // === Pools ===
    pub unit_capacity: usize,
    pub gate_capacity: usize,
    pub effect_capacity: usize,

    // === Playfield ===
    pub min_y: f32,
    pub max_y: f32,
    pub launch_x: f32,
    /// Launch height used until the pointer moves
    pub launch_y: f32,
    /// Units at or beyond this X hit the target
    pub target_x: f32,
    pub gate_spawn_x: f32,
    /// Gates below this X are culled
    pub gate_cull_x: f32,

    // === Motion ===
    pub unit_speed: f32,
    pub gate_speed: f32,

    // === Gates ===
    pub gate_half_width: f32,
    pub gate_half_height: f32,
    pub clone_scatter: f32,
    pub volley_spacing: f32,

    // === Misc ===
    pub effect_lifetime: f32,
    pub max_step_dt: f32,
    /// Seed for gate scatter
    pub seed: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            unit_capacity: UNIT_CAPACITY,
            gate_capacity: GATE_CAPACITY,
            effect_capacity: EFFECT_CAPACITY,

            min_y: PLAYFIELD_MIN_Y,
            max_y: PLAYFIELD_MAX_Y,
            launch_x: LAUNCH_X,
            launch_y: LAUNCH_Y,
            target_x: TARGET_X,
            gate_spawn_x: GATE_SPAWN_X,
            gate_cull_x: GATE_CULL_X,

            unit_speed: UNIT_SPEED,
            gate_speed: GATE_SPEED,

            gate_half_width: GATE_HALF_WIDTH,
            gate_half_height: GATE_HALF_HEIGHT,
            clone_scatter: CLONE_SCATTER,
            volley_spacing: VOLLEY_SPACING,

            effect_lifetime: EFFECT_LIFETIME,
            max_step_dt: MAX_STEP_DT,
            seed: 0x5eed_6a7e,
        }
    }
}

impl SimSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: SimSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&contents)?;
        log::info!("Loaded simulation settings from {}", path.display());
        Ok(settings)
    }

    /// Reject tunings the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.unit_capacity == 0 || self.gate_capacity == 0 || self.effect_capacity == 0 {
            return Err(SettingsError::Invalid("pool capacities must be non-zero"));
        }
        if !(self.min_y < self.max_y) {
            return Err(SettingsError::Invalid("min_y must be below max_y"));
        }
        if !(self.launch_x < self.target_x) {
            return Err(SettingsError::Invalid("launch_x must be left of target_x"));
        }
        if !(self.gate_cull_x < self.gate_spawn_x) {
            return Err(SettingsError::Invalid("gate_cull_x must be left of gate_spawn_x"));
        }
        if !(self.unit_speed > 0.0 && self.gate_speed >= 0.0) {
            return Err(SettingsError::Invalid("speeds must be positive"));
        }
        if !(self.max_step_dt > 0.0) {
            return Err(SettingsError::Invalid("max_step_dt must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SimSettings::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = SimSettings::from_json_str(r#"{ "unit_capacity": 5, "seed": 7 }"#).unwrap();
        assert_eq!(settings.unit_capacity, 5);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.gate_capacity, GATE_CAPACITY);
        assert_eq!(settings.target_x, TARGET_X);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = SimSettings::from_json_str(r#"{ "gate_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = SimSettings::from_json_str(r#"{ "min_y": 300.0, "max_y": 100.0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            SimSettings::from_json_str("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }
}
