//! Scripted level definitions
//!
//! A level is a duration, a target health pool and an ordered gate timeline.
//! The builtin set is compiled in and parsed once.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_LEVELS: &str = include_str!("data/levels.json");

/// Gate operation applied to a unit passing through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOp {
    /// Spawn extra units, the original keeps going
    Add,
    /// Replace the original with this many units
    Multiply,
}

impl GateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateOp::Add => "add",
            GateOp::Multiply => "multiply",
        }
    }
}

/// One scripted gate spawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Seconds from battle start
    pub time: f32,
    pub op: GateOp,
    pub magnitude: u32,
    pub lane_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub duration_seconds: f32,
    pub target_health: f32,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

impl LevelDefinition {
    /// Check the timeline is strictly increasing and the numbers are usable
    pub fn validate(&self) -> Result<(), LevelError> {
        if !(self.duration_seconds > 0.0) {
            return Err(LevelError::InvalidLevel("duration_seconds must be positive"));
        }
        if !(self.target_health > 0.0) {
            return Err(LevelError::InvalidLevel("target_health must be positive"));
        }
        for (index, pair) in self.timeline.windows(2).enumerate() {
            if !(pair[1].time > pair[0].time) {
                return Err(LevelError::NonIncreasingTimeline { index: index + 1 });
            }
        }
        if self.timeline.iter().any(|e| !e.time.is_finite()) {
            return Err(LevelError::InvalidLevel("timeline times must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LevelsFile {
    levels: Vec<LevelDefinition>,
}

/// Immutable table of levels, addressed by index
#[derive(Debug, Clone)]
pub struct LevelSet {
    levels: Vec<LevelDefinition>,
}

impl LevelSet {
    pub fn builtin() -> Arc<Self> {
        let set = Self::from_json_str(BUILTIN_LEVELS).expect("builtin levels should parse");
        Arc::new(set)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LevelError> {
        let parsed: LevelsFile = serde_json::from_str(json)?;
        for level in &parsed.levels {
            level.validate()?;
        }
        Ok(Self {
            levels: parsed.levels,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path).map_err(|source| LevelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn get(&self, index: usize) -> Result<&LevelDefinition, LevelError> {
        self.levels
            .get(index)
            .ok_or(LevelError::UnknownIndex(index))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to parse levels: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read levels from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("timeline event {index} does not come strictly after the previous one")]
    NonIncreasingTimeline { index: usize },
    #[error("no level at index {0}")]
    UnknownIndex(usize),
    #[error("invalid level: {0}")]
    InvalidLevel(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_levels_parse() {
        let set = LevelSet::builtin();
        assert!(!set.is_empty());
        let first = set.get(0).unwrap();
        assert!(first.target_health > 0.0);
        assert!(!first.timeline.is_empty());
    }

    #[test]
    fn test_unknown_index() {
        let set = LevelSet::builtin();
        assert!(matches!(
            set.get(set.len()),
            Err(LevelError::UnknownIndex(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_order_timeline() {
        let json = r#"{ "levels": [ {
            "duration_seconds": 10.0,
            "target_health": 5.0,
            "timeline": [
                { "time": 2.0, "op": "add", "magnitude": 1, "lane_y": 100.0 },
                { "time": 2.0, "op": "multiply", "magnitude": 2, "lane_y": 100.0 }
            ]
        } ] }"#;
        let err = LevelSet::from_json_str(json).unwrap_err();
        assert!(matches!(err, LevelError::NonIncreasingTimeline { index: 1 }));
    }

    #[test]
    fn test_empty_timeline_defaults() {
        let json = r#"{ "levels": [ { "duration_seconds": 5.0, "target_health": 3.0 } ] }"#;
        let set = LevelSet::from_json_str(json).unwrap();
        assert!(set.get(0).unwrap().timeline.is_empty());
    }
}
