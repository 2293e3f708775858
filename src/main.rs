//! Gate Runner entry point
//!
//! Headless runner: plays one level with a sample loadout at a fixed frame
//! step, steering the launch lane toward the closest gate, and prints the
//! outcome.
//!
//! Usage: `gate-runner [level_index] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use std::path::Path;
    use std::process::ExitCode;

    use gate_runner::bonus::EquipSlot;
    use gate_runner::consts::FRAME_DT;
    use gate_runner::sim::EntityCategory;
    use gate_runner::{Catalog, LevelSet, ProgressionState, RunController, SimSettings};

    env_logger::init();
    log::info!("Gate Runner (headless) starting...");

    let mut args = std::env::args().skip(1);
    let level_index = match args.next().map(|arg| arg.parse::<usize>()) {
        None => 0,
        Some(Ok(index)) => index,
        Some(Err(e)) => {
            eprintln!("invalid level index: {e}");
            return ExitCode::FAILURE;
        }
    };
    let settings = match args.next() {
        None => SimSettings::default(),
        Some(path) => match SimSettings::from_file(Path::new(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let levels = LevelSet::builtin();
    let catalog = Catalog::builtin();
    let progression = ProgressionState::default()
        .equip(EquipSlot::Weapon, "rifle")
        .equip(EquipSlot::Magazine, "drum_mag")
        .with_talent("quick_hands", 2)
        .with_talent("bounty", 1)
        .with_hero("captain");

    let mut controller = RunController::new(settings);
    if let Err(e) = controller.start_level(&levels, &catalog, &progression, level_index) {
        eprintln!("cannot start level {level_index}: {e}");
        return ExitCode::FAILURE;
    }

    let launch_x = controller.settings().launch_x;
    let outcome = loop {
        // Aim at the nearest gate still ahead of the launch point
        let aim = controller
            .snapshot()
            .into_iter()
            .filter(|e| e.handle.category == EntityCategory::Gate && e.pos.x > launch_x)
            .min_by(|a, b| a.pos.x.total_cmp(&b.pos.x))
            .map(|gate| gate.pos.y);
        if let Some(y) = aim {
            controller.set_pointer(y);
        }

        if let Some(outcome) = controller.step(FRAME_DT) {
            break outcome;
        }
    };

    let battle = controller.battle();
    println!(
        "level {}: {} after {:.2}s, {} arrivals, reward {:.1} gold",
        level_index,
        if outcome.won { "WON" } else { "LOST" },
        battle.map_or(0.0, |b| b.sim_time),
        battle.map_or(0, |b| b.arrivals),
        outcome.reward_gold
    );
    ExitCode::SUCCESS
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on wasm; the host drives `RunController` directly
}
