//! Battle step
//!
//! Advances one battle by an externally supplied `dt`. Phases always run in
//! this order:
//! fire -> timeline -> movement -> gate collisions -> arrival/cull -> terminal.
//!
//! Releases requested while a phase walks the pool are queued and applied
//! once all phases have run, so no entity is visited twice in a step.

use glam::Vec2;
use rand::Rng;

use super::collision::{HitBox, first_gate_hit, past_cull_line, reached_target};
use super::state::{
    BattleOutcome, BattlePhase, BattleState, EntityCategory, EntityId, Payload, SimEvent,
    TickInput,
};
use crate::clamp_lane;
use crate::level::GateOp;

/// Advance the battle by `dt` seconds.
///
/// Returns the outcome on the step that ends the battle, `None` otherwise.
/// A non-positive (or NaN) `dt` only applies the input. Stepping a finished
/// battle is a caller bug.
pub fn tick(state: &mut BattleState, input: &TickInput, dt: f32) -> Option<BattleOutcome> {
    if state.phase.is_terminal() {
        debug_assert!(false, "tick on a finished battle ({:?})", state.phase);
        log::warn!("Ignoring tick on a finished battle ({:?})", state.phase);
        return None;
    }

    state.events.clear();

    if let Some(y) = input.launch_y {
        state.set_launch_y(y);
    }

    if !(dt > 0.0) {
        return None;
    }
    let dt = dt.min(state.settings.max_step_dt);

    state.step_index += 1;
    state.sim_time += dt;

    fire_control(state, dt);
    dispatch_timeline(state);
    integrate(state, dt);
    resolve_gates(state);
    resolve_arrivals(state, dt);
    state.flush_releases();

    check_terminal(state)
}

/// Count down to the next volley and launch it from the pointer lane
fn fire_control(state: &mut BattleState, dt: f32) {
    let rate = state.config.effective_fire_rate();
    if !(rate > 0.0) {
        return;
    }

    state.fire_cooldown -= dt;
    if state.fire_cooldown > 0.0 {
        return;
    }
    state.fire_cooldown = 1.0 / rate;

    let count = state.config.effective_units_per_shot();
    let launch_x = state.settings.launch_x;
    let spacing = state.settings.volley_spacing;
    let speed = state.settings.unit_speed;
    let (min_y, max_y) = (state.settings.min_y, state.settings.max_y);
    let center = (count - 1) as f32 / 2.0;

    let mut spawned = 0;
    for i in 0..count {
        let y = clamp_lane(state.launch_y + (i as f32 - center) * spacing, min_y, max_y);
        let payload = Payload::Unit {
            has_triggered_gate: false,
        };
        let unit = state.spawn(
            EntityCategory::Unit,
            Vec2::new(launch_x, y),
            Vec2::new(speed, 0.0),
            payload,
        );
        // No retry this tick
        if unit.is_none() {
            break;
        }
        spawned += 1;
    }

    state.events.push(SimEvent::VolleyFired {
        spawned,
        dropped: count - spawned,
    });
}

/// Spawn every scripted gate whose time has come, in order
fn dispatch_timeline(state: &mut BattleState) {
    while let Some(event) = state.level.timeline.get(state.timeline_cursor) {
        if event.time > state.sim_time {
            break;
        }
        let (op, magnitude) = (event.op, event.magnitude);
        let lane_y = clamp_lane(event.lane_y, state.settings.min_y, state.settings.max_y);
        state.timeline_cursor += 1;

        let pos = Vec2::new(state.settings.gate_spawn_x, lane_y);
        let vel = Vec2::new(-state.settings.gate_speed, 0.0);
        let gate = state.spawn(
            EntityCategory::Gate,
            pos,
            vel,
            Payload::Gate { op, magnitude },
        );

        log::debug!(
            "t={:.2}s gate {} {} x{} at lane {:.0}",
            state.sim_time,
            gate.map_or_else(|| "dropped".to_string(), |id| id.to_string()),
            op.as_str(),
            magnitude,
            lane_y
        );
        state.events.push(SimEvent::GateSpawned {
            gate,
            op,
            magnitude,
            lane_y,
        });
    }
}

fn integrate(state: &mut BattleState, dt: f32) {
    for category in EntityCategory::ALL {
        state
            .pool
            .for_each_active_mut(category, |entity| entity.pos += entity.vel * dt);
    }
}

/// Apply the first overlapping gate to each settled, untriggered unit
fn resolve_gates(state: &mut BattleState) {
    let step = state.step_index;
    let (gate_ids, gate_pos): (Vec<EntityId>, Vec<Vec2>) = state
        .pool
        .iter_active(EntityCategory::Gate)
        .filter(|gate| gate.settled(step))
        .map(|gate| (gate.id, gate.pos))
        .unzip();
    if gate_ids.is_empty() {
        return;
    }

    let hit = HitBox::new(state.settings.gate_half_width, state.settings.gate_half_height);
    let unit_ids = state.pool.active_ids(EntityCategory::Unit).to_vec();

    for unit_id in unit_ids {
        let Some(unit) = state.pool.get(EntityCategory::Unit, unit_id) else {
            continue;
        };
        if !unit.settled(step) || unit.has_triggered_gate() {
            continue;
        }
        let Some(index) = first_gate_hit(unit.pos, &gate_pos, hit) else {
            continue;
        };
        let (pos, vel) = (unit.pos, unit.vel);

        let gate_id = gate_ids[index];
        let Some(Payload::Gate { op, magnitude }) = state
            .pool
            .get(EntityCategory::Gate, gate_id)
            .map(|gate| gate.payload)
        else {
            continue;
        };

        if let Some(unit) = state.pool.get_mut(EntityCategory::Unit, unit_id) {
            unit.payload = Payload::Unit {
                has_triggered_gate: true,
            };
        }

        let requested = state.config.gate_magnitude(op, magnitude);
        let spawned = spawn_clones(state, pos, vel, requested);
        if op == GateOp::Multiply {
            // Multiply replaces the original
            state.queue_release(EntityCategory::Unit, unit_id);
        }

        log::debug!(
            "unit {} through gate {} ({} x{}): +{} units, {} dropped",
            unit_id,
            gate_id,
            op.as_str(),
            requested,
            spawned,
            requested - spawned
        );
        state.events.push(SimEvent::GateTriggered {
            unit: unit_id,
            gate: gate_id,
            op,
            spawned,
            dropped: requested - spawned,
        });
    }
}

/// Spawn up to `count` units scattered around `origin`. Clones arrive with
/// their gate pass already spent.
fn spawn_clones(state: &mut BattleState, origin: Vec2, vel: Vec2, count: u32) -> u32 {
    let scatter = state.settings.clone_scatter.max(0.0);
    let (min_y, max_y) = (state.settings.min_y, state.settings.max_y);

    let mut spawned = 0;
    for _ in 0..count {
        let offset = if scatter > 0.0 {
            Vec2::new(
                state.rng.random_range(-scatter..=scatter),
                state.rng.random_range(-scatter..=scatter),
            )
        } else {
            Vec2::ZERO
        };
        let pos = Vec2::new(
            origin.x + offset.x,
            clamp_lane(origin.y + offset.y, min_y, max_y),
        );
        let payload = Payload::Unit {
            has_triggered_gate: true,
        };
        if state
            .spawn(EntityCategory::Unit, pos, vel, payload)
            .is_none()
        {
            break;
        }
        spawned += 1;
    }
    spawned
}

/// Damage from arriving units, gate culling and effect expiry
fn resolve_arrivals(state: &mut BattleState, dt: f32) {
    let step = state.step_index;
    let target_x = state.settings.target_x;
    let power = state.config.effective_unit_power();
    let lifetime = state.settings.effect_lifetime;

    let unit_ids = state.pool.active_ids(EntityCategory::Unit).to_vec();
    for unit_id in unit_ids {
        let Some(unit) = state.pool.get(EntityCategory::Unit, unit_id) else {
            continue;
        };
        if !unit.settled(step) || !reached_target(unit.pos, target_x) {
            continue;
        }
        let impact = Vec2::new(target_x, unit.pos.y);
        if state.is_pending_release(EntityCategory::Unit, unit_id) {
            continue;
        }

        state.target_health -= power;
        state.arrivals += 1;
        state.spawn(
            EntityCategory::Effect,
            impact,
            Vec2::ZERO,
            Payload::Effect {
                remaining: lifetime,
            },
        );
        state.queue_release(EntityCategory::Unit, unit_id);
        state.events.push(SimEvent::UnitArrived {
            unit: unit_id,
            damage: power,
        });
    }

    let cull_x = state.settings.gate_cull_x;
    let expired: Vec<EntityId> = state
        .pool
        .iter_active(EntityCategory::Gate)
        .filter(|gate| gate.settled(step) && past_cull_line(gate.pos, cull_x))
        .map(|gate| gate.id)
        .collect();
    for gate_id in expired {
        state.queue_release(EntityCategory::Gate, gate_id);
        state.events.push(SimEvent::GateExpired { gate: gate_id });
    }

    let mut faded = Vec::new();
    state
        .pool
        .for_each_active_mut(EntityCategory::Effect, |effect| {
            if !effect.settled(step) {
                return;
            }
            if let Payload::Effect { remaining } = &mut effect.payload {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    faded.push(effect.id);
                }
            }
        });
    for effect_id in faded {
        state.queue_release(EntityCategory::Effect, effect_id);
    }
}

/// Health is checked before time, so a simultaneous kill still wins
fn check_terminal(state: &mut BattleState) -> Option<BattleOutcome> {
    let (phase, outcome) = if state.target_health <= 0.0 {
        (
            BattlePhase::Won,
            BattleOutcome {
                won: true,
                reward_gold: state.config.win_reward(),
            },
        )
    } else if state.sim_time > state.level.duration_seconds {
        (
            BattlePhase::Lost,
            BattleOutcome {
                won: false,
                reward_gold: 0.0,
            },
        )
    } else {
        return None;
    };

    log::info!(
        "Battle {:?} at t={:.2}s after {} arrivals (reward {:.1})",
        phase,
        state.sim_time,
        state.arrivals,
        outcome.reward_gold
    );
    state.finish(phase, outcome);
    state.pool.release_all();
    state.events.push(SimEvent::Finished(outcome));
    Some(outcome)
}
