//! Run controller
//!
//! Owns one battle for its lifetime and drives it from an external frame
//! clock. The outcome is handed out exactly once, both as the return value of
//! the finishing `step` and through the optional completion callback.

use thiserror::Error;

use crate::bonus::{Catalog, ConfigError, ProgressionState, RunConfig, aggregate};
use crate::level::{LevelDefinition, LevelError, LevelSet};
use crate::settings::SimSettings;
use crate::sim::{
    BattleOutcome, BattlePhase, BattleState, EntitySnapshot, SimEvent, TickInput, tick,
};

type CompletionCallback = Box<dyn FnMut(&BattleOutcome)>;

pub struct RunController {
    settings: SimSettings,
    battle: Option<BattleState>,
    input: TickInput,
    on_complete: Option<CompletionCallback>,
}

impl RunController {
    pub fn new(settings: SimSettings) -> Self {
        Self {
            settings,
            battle: None,
            input: TickInput::default(),
            on_complete: None,
        }
    }

    /// Register a callback fired once per run with the terminal outcome
    pub fn on_complete(&mut self, callback: impl FnMut(&BattleOutcome) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Begin a battle. Any previous battle is stopped and replaced.
    pub fn start(&mut self, level: LevelDefinition, config: RunConfig) -> Result<(), StartError> {
        level.validate()?;
        if self.battle.is_some() {
            self.stop();
        }
        log::info!(
            "Starting level {} ({:.0}s, target hp {:.0}, {} gates)",
            config.level_index,
            level.duration_seconds,
            level.target_health,
            level.timeline.len()
        );
        let mut battle = BattleState::new(level, config, self.settings.clone());
        if let Some(y) = self.input.launch_y {
            battle.set_launch_y(y);
        }
        self.battle = Some(battle);
        Ok(())
    }

    /// Aggregate the progression snapshot and start level `index`
    pub fn start_level(
        &mut self,
        levels: &LevelSet,
        catalog: &Catalog,
        progression: &ProgressionState,
        index: usize,
    ) -> Result<(), StartError> {
        let level = levels.get(index)?.clone();
        let config = aggregate(catalog, progression, index)?;
        self.start(level, config)
    }

    /// Advance the running battle by `dt` seconds
    pub fn step(&mut self, dt: f32) -> Option<BattleOutcome> {
        let Some(battle) = self.battle.as_mut() else {
            debug_assert!(false, "step without a running battle");
            log::warn!("Ignoring step without a running battle");
            return None;
        };
        if battle.phase.is_terminal() {
            debug_assert!(false, "step after the battle finished");
            log::warn!("Ignoring step after the battle finished");
            return None;
        }

        let outcome = tick(battle, &self.input, dt);
        if let Some(outcome) = &outcome {
            if let Some(callback) = self.on_complete.as_mut() {
                callback(outcome);
            }
        }
        outcome
    }

    /// Abandon the battle. The pool is drained and the battle is kept, marked
    /// `Stopped`, until the next `start`.
    pub fn stop(&mut self) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        if !battle.phase.is_terminal() {
            battle.phase = BattlePhase::Stopped;
        }
        battle.pool.release_all();
        battle.events.clear();
        log::info!(
            "Battle stopped at t={:.2}s ({:?})",
            battle.sim_time,
            battle.phase
        );
    }

    /// Pointer height for new units, clamped into the playfield
    pub fn set_pointer(&mut self, y: f32) {
        let y = crate::clamp_lane(y, self.settings.min_y, self.settings.max_y);
        self.input.launch_y = Some(y);
    }

    pub fn is_running(&self) -> bool {
        self.battle
            .as_ref()
            .is_some_and(|battle| !battle.phase.is_terminal())
    }

    pub fn battle(&self) -> Option<&BattleState> {
        self.battle.as_ref()
    }

    /// Active entities for rendering
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.battle
            .as_ref()
            .map(BattleState::snapshot)
            .unwrap_or_default()
    }

    /// Events from the latest step
    pub fn events(&self) -> &[SimEvent] {
        self.battle
            .as_ref()
            .map(|battle| battle.events.as_slice())
            .unwrap_or(&[])
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Level(#[from] LevelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::EquipSlot;
    use crate::level::{GateOp, TimelineEvent};
    use crate::sim::EntityCategory;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 1.0 / 16.0;

    fn short_level() -> LevelDefinition {
        LevelDefinition {
            duration_seconds: 2.0,
            target_health: 500.0,
            timeline: vec![TimelineEvent {
                time: 0.25,
                op: GateOp::Add,
                magnitude: 2,
                lane_y: 150.0,
            }],
        }
    }

    fn fast_config() -> RunConfig {
        RunConfig {
            base_fire_rate: 8.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_outcome_reported_once_via_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut controller = RunController::new(SimSettings::default());
        let sink = Rc::clone(&seen);
        controller.on_complete(move |outcome| sink.borrow_mut().push(*outcome));

        controller.start(short_level(), fast_config()).unwrap();
        let mut outcome = None;
        while outcome.is_none() {
            outcome = controller.step(DT);
        }
        assert!(!controller.is_running());
        assert_eq!(seen.borrow().as_slice(), &[outcome.unwrap()]);
        assert!(!outcome.unwrap().won);
    }

    #[test]
    fn test_stop_drains_pool_and_allows_restart() {
        let mut controller = RunController::new(SimSettings::default());
        controller.start(short_level(), fast_config()).unwrap();
        for _ in 0..12 {
            controller.step(DT);
        }
        assert!(!controller.snapshot().is_empty());

        controller.stop();
        assert!(!controller.is_running());
        assert!(controller.snapshot().is_empty());
        let stopped = controller.battle().unwrap();
        assert_eq!(stopped.phase, BattlePhase::Stopped);
        assert_eq!(stopped.outcome(), None);
        assert!(controller.events().is_empty());
        for category in EntityCategory::ALL {
            assert_eq!(stopped.pool.active_count(category), 0);
            assert_eq!(
                stopped.pool.free_count(category),
                stopped.pool.capacity(category)
            );
        }
        assert!(stopped.pool.invariants_hold());

        controller.start(short_level(), fast_config()).unwrap();
        let battle = controller.battle().unwrap();
        assert_eq!(battle.sim_time, 0.0);
        assert_eq!(battle.timeline_cursor, 0);
        for category in EntityCategory::ALL {
            assert_eq!(battle.pool.active_count(category), 0);
            assert!(battle.pool.invariants_hold());
        }
    }

    #[test]
    fn test_pointer_sets_launch_lane() {
        let mut controller = RunController::new(SimSettings::default());
        controller.set_pointer(1000.0);
        controller.start(short_level(), fast_config()).unwrap();
        let max_y = controller.settings().max_y;
        assert_eq!(controller.battle().unwrap().launch_y, max_y);

        controller.set_pointer(90.0);
        for _ in 0..2 {
            controller.step(DT);
        }
        let battle = controller.battle().unwrap();
        assert_eq!(battle.launch_y, 90.0);
        assert!(
            battle
                .pool
                .iter_active(EntityCategory::Unit)
                .all(|u| u.pos.y == 90.0)
        );
    }

    #[test]
    fn test_start_level_aggregates_progression() {
        let levels = LevelSet::builtin();
        let catalog = Catalog::builtin();
        let progression = ProgressionState::default().equip(EquipSlot::Weapon, "rifle");
        let mut controller = RunController::new(SimSettings::default());
        controller
            .start_level(&levels, &catalog, &progression, 1)
            .unwrap();
        let battle = controller.battle().unwrap();
        assert_eq!(battle.config.level_index, 1);
        assert_eq!(battle.config.effective_fire_rate(), 4.0);
    }

    #[test]
    fn test_start_level_fails_on_corrupt_progression() {
        let levels = LevelSet::builtin();
        let catalog = Catalog::builtin();
        let progression = ProgressionState::default().with_hero("nobody");
        let mut controller = RunController::new(SimSettings::default());
        let err = controller
            .start_level(&levels, &catalog, &progression, 0)
            .unwrap_err();
        assert!(matches!(err, StartError::Config(ConfigError::UnknownHero(_))));
        assert!(controller.battle().is_none());

        let err = controller
            .start_level(&levels, &catalog, &ProgressionState::default(), 99)
            .unwrap_err();
        assert!(matches!(err, StartError::Level(LevelError::UnknownIndex(99))));
    }

    #[test]
    fn test_stop_keeps_finished_outcome() {
        let mut controller = RunController::new(SimSettings::default());
        controller.start(short_level(), fast_config()).unwrap();
        let outcome = loop {
            if let Some(outcome) = controller.step(DT) {
                break outcome;
            }
        };
        controller.stop();
        let battle = controller.battle().unwrap();
        assert_eq!(battle.phase, BattlePhase::Lost);
        assert_eq!(battle.outcome(), Some(outcome));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "step after the battle finished")]
    fn test_step_after_stop_panics_in_debug() {
        let mut controller = RunController::new(SimSettings::default());
        controller.start(short_level(), fast_config()).unwrap();
        controller.step(DT);
        controller.stop();
        controller.step(DT);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "step without a running battle")]
    fn test_step_without_battle_panics_in_debug() {
        let mut controller = RunController::new(SimSettings::default());
        controller.step(DT);
    }
}
