//! Battle state and core simulation types
//!
//! Everything one run mutates lives in `BattleState`; the level, run config
//! and settings are frozen copies taken at start.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::pool::EntityPool;
use crate::bonus::RunConfig;
use crate::clamp_lane;
use crate::level::{GateOp, LevelDefinition};
use crate::settings::SimSettings;

/// Entity id, unique within its category and reused after release
pub type EntityId = u32;

/// Entity categories, each with its own pool and capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    Unit,
    Gate,
    Effect,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 3] = [
        EntityCategory::Unit,
        EntityCategory::Gate,
        EntityCategory::Effect,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            EntityCategory::Unit => 0,
            EntityCategory::Gate => 1,
            EntityCategory::Effect => 2,
        }
    }
}

/// Reference to a pooled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub category: EntityCategory,
    pub id: EntityId,
}

/// Kind-specific entity data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Unit {
        /// Flips to true once, on the first gate this unit resolves
        has_triggered_gate: bool,
    },
    Gate {
        op: GateOp,
        magnitude: u32,
    },
    /// Impact marker, no gameplay effect
    Effect {
        /// Seconds until auto-release
        remaining: f32,
    },
}

impl Payload {
    /// Freshly reset payload for a category
    pub fn blank(category: EntityCategory) -> Self {
        match category {
            EntityCategory::Unit => Payload::Unit {
                has_triggered_gate: false,
            },
            EntityCategory::Gate => Payload::Gate {
                op: GateOp::Add,
                magnitude: 0,
            },
            EntityCategory::Effect => Payload::Effect { remaining: 0.0 },
        }
    }
}

/// A pooled simulation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub category: EntityCategory,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Step index at which the entity was activated
    pub spawn_step: u64,
    pub payload: Payload,
}

impl Entity {
    pub fn new(category: EntityCategory, id: EntityId) -> Self {
        Self {
            id,
            category,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            spawn_step: 0,
            payload: Payload::blank(category),
        }
    }

    pub fn handle(&self) -> EntityHandle {
        EntityHandle {
            category: self.category,
            id: self.id,
        }
    }

    /// Back to the inactive-slot state
    pub fn reset(&mut self) {
        *self = Self::new(self.category, self.id);
    }

    pub fn has_triggered_gate(&self) -> bool {
        matches!(
            self.payload,
            Payload::Unit {
                has_triggered_gate: true
            }
        )
    }

    /// Entities only join collision and arrival checks on the step after activation
    #[inline]
    pub fn settled(&self, step: u64) -> bool {
        self.spawn_step < step
    }
}

/// Current phase of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattlePhase {
    Running,
    /// Target health reached zero
    Won,
    /// Time limit expired
    Lost,
    /// Abandoned by the controller before a result
    Stopped,
}

impl BattlePhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BattlePhase::Running)
    }
}

/// Terminal result, reported once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub won: bool,
    pub reward_gold: f32,
}

/// Observable things that happened during one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    VolleyFired {
        spawned: u32,
        dropped: u32,
    },
    GateSpawned {
        /// None when the gate pool was exhausted
        gate: Option<EntityId>,
        op: GateOp,
        magnitude: u32,
        lane_y: f32,
    },
    GateTriggered {
        unit: EntityId,
        gate: EntityId,
        op: GateOp,
        spawned: u32,
        dropped: u32,
    },
    UnitArrived {
        unit: EntityId,
        damage: f32,
    },
    GateExpired {
        gate: EntityId,
    },
    Finished(BattleOutcome),
}

/// Read-only view of one active entity for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub handle: EntityHandle,
    pub pos: Vec2,
    pub payload: Payload,
}

/// Per-tick input
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Launch height from the pointer
    pub launch_y: Option<f32>,
}

/// Complete state of one battle
#[derive(Debug, Clone)]
pub struct BattleState {
    pub settings: SimSettings,
    pub config: RunConfig,
    pub level: LevelDefinition,
    pub pool: EntityPool,
    pub phase: BattlePhase,
    /// Seconds since battle start
    pub sim_time: f32,
    pub target_health: f32,
    /// Seconds until the next volley
    pub fire_cooldown: f32,
    /// Next unconsumed timeline event
    pub timeline_cursor: usize,
    pub launch_y: f32,
    /// Number of real steps taken
    pub step_index: u64,
    pub arrivals: u32,
    /// Events from the most recent step
    pub events: Vec<SimEvent>,
    pub(crate) pending_release: Vec<EntityHandle>,
    pub(crate) rng: Pcg32,
    outcome: Option<BattleOutcome>,
}

impl BattleState {
    pub fn new(level: LevelDefinition, config: RunConfig, settings: SimSettings) -> Self {
        let pool = EntityPool::new(
            settings.unit_capacity,
            settings.gate_capacity,
            settings.effect_capacity,
        );
        let fire_rate = config.effective_fire_rate();
        let fire_cooldown = if fire_rate > 0.0 {
            1.0 / fire_rate
        } else {
            f32::INFINITY
        };
        let launch_y = clamp_lane(settings.launch_y, settings.min_y, settings.max_y);
        Self {
            rng: Pcg32::seed_from_u64(settings.seed),
            target_health: level.target_health,
            pool,
            phase: BattlePhase::Running,
            sim_time: 0.0,
            fire_cooldown,
            timeline_cursor: 0,
            launch_y,
            step_index: 0,
            arrivals: 0,
            events: Vec::new(),
            pending_release: Vec::new(),
            outcome: None,
            settings,
            config,
            level,
        }
    }

    /// Move the launch point, clamped into the playfield
    pub fn set_launch_y(&mut self, y: f32) {
        self.launch_y = clamp_lane(y, self.settings.min_y, self.settings.max_y);
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    pub(crate) fn finish(&mut self, phase: BattlePhase, outcome: BattleOutcome) {
        debug_assert!(phase.is_terminal());
        self.phase = phase;
        self.outcome = Some(outcome);
    }

    /// Activate an entity and place it; None when the category's pool is dry
    pub(crate) fn spawn(
        &mut self,
        category: EntityCategory,
        pos: Vec2,
        vel: Vec2,
        payload: Payload,
    ) -> Option<EntityId> {
        let handle = self.pool.acquire(category)?;
        let step = self.step_index;
        let entity = self.pool.get_mut(handle.category, handle.id)?;
        entity.pos = pos;
        entity.vel = vel;
        entity.spawn_step = step;
        entity.payload = payload;
        Some(handle.id)
    }

    /// Defer a release to the end of the current step
    pub(crate) fn queue_release(&mut self, category: EntityCategory, id: EntityId) {
        let handle = EntityHandle { category, id };
        if !self.pending_release.contains(&handle) {
            self.pending_release.push(handle);
        }
    }

    pub(crate) fn is_pending_release(&self, category: EntityCategory, id: EntityId) -> bool {
        self.pending_release
            .iter()
            .any(|h| h.category == category && h.id == id)
    }

    /// Apply releases deferred during the step
    pub(crate) fn flush_releases(&mut self) {
        for handle in std::mem::take(&mut self.pending_release) {
            self.pool.release(handle.category, handle.id);
        }
    }

    /// Active entities in activation order, per category
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        EntityCategory::ALL
            .iter()
            .flat_map(|&category| self.pool.iter_active(category))
            .map(|e| EntitySnapshot {
                handle: e.handle(),
                pos: e.pos,
                payload: e.payload,
            })
            .collect()
    }
}
