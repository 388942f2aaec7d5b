//! Headless survivor run.
//!
//! Drives a `RunSession` through a Bevy `App` on a fixed time step with a
//! simple autopilot (shoots the oldest enemies, takes contact damage, picks
//! the first upgrade card) and prints the run summary as JSON.
//!
//! ```text
//! survivor-sim [--config balance.ron] [--seed 42] [--minutes 15]
//!              [--mode normal|madness] [--class 0-3] [--step 0.1]
//!              [--log info] [--balance]
//! ```

use std::time::Duration;

use anyhow::{bail, Context};
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use survivor_core::balance::{run_balance_simulation, SimConfig};
use survivor_core::logging::{init_tracing, LogLevel, TracingConfig};
use survivor_core::player::PlayerClass;
use survivor_core::{BalanceConfig, GameMode, RunPhase, RunResource, RunSettings, RunSimPlugin, StatDimension};

/// Share of every live enemy's damage that lands on the player each second
const CONTACT_SHARE: f32 = 0.01;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let level = match parse_str_arg(&args, "--log") {
        Some(name) => LogLevel::from_name(&name).with_context(|| format!("unknown log level {name}"))?,
        None => LogLevel::Info,
    };
    init_tracing(&TracingConfig::default().with_level(level));

    let config = match parse_str_arg(&args, "--config") {
        Some(path) => BalanceConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => BalanceConfig::default(),
    };
    let seed: u64 = parse_num_arg(&args, "--seed").unwrap_or(42);

    if args.iter().any(|a| a == "--balance") {
        let sim = SimConfig {
            base_seed: seed,
            ..Default::default()
        };
        let report = run_balance_simulation(&config, &sim);
        println!("{}", report.to_json());
        return Ok(());
    }

    let mode = match parse_str_arg(&args, "--mode") {
        Some(name) => match GameMode::from_name(&name) {
            Some(mode) => mode,
            None => bail!("unknown game mode {name}"),
        },
        None => GameMode::Normal,
    };
    let class = PlayerClass::from_index(parse_num_arg(&args, "--class").unwrap_or(0));
    let minutes: f32 = parse_num_arg(&args, "--minutes").unwrap_or(15.0);
    let step: f32 = parse_num_arg(&args, "--step").unwrap_or(0.1);
    if !(step > 0.0 && step <= 0.25) {
        bail!("--step must be in (0, 0.25] seconds");
    }

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(RunSimPlugin {
            config,
            settings: RunSettings { mode, class, seed },
        })
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(step)))
        .add_systems(Update, autopilot_system);

    let frames = (minutes.max(0.0) * 60.0 / step).ceil() as u64;
    for _ in 0..frames {
        app.update();
        if run_phase(&app)? == RunPhase::Ended {
            break;
        }
    }

    let run_res = app.world().resource::<RunResource>();
    let mut run = run_res
        .0
        .write()
        .map_err(|_| anyhow::anyhow!("run lock poisoned"))?;
    run.end();
    let summary = run.summary().context("run produced no summary")?;
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

fn run_phase(app: &App) -> anyhow::Result<RunPhase> {
    let run = app
        .world()
        .resource::<RunResource>()
        .0
        .read()
        .map_err(|_| anyhow::anyhow!("run lock poisoned"))?;
    Ok(run.phase())
}

fn autopilot_system(time: Res<Time>, run_res: Res<RunResource>) {
    let dt = time.delta_secs();
    let Ok(mut run) = run_res.0.write() else {
        return;
    };
    match run.phase() {
        RunPhase::Ended => return,
        RunPhase::ChoosingUpgrade => {
            run.choose_upgrade(0);
            return;
        }
        RunPhase::Playing => {}
    }

    let player = run.player();
    let mut budget = player.effective_value(StatDimension::Damage)
        * player.effective_value(StatDimension::FireRate)
        * dt;
    let targets: Vec<_> = run
        .scheduler()
        .tracked()
        .map(|e| (e.handle, e.current_hp))
        .collect();
    for (handle, hp) in targets {
        if budget <= 0.0 {
            break;
        }
        let shot = budget.min(hp);
        budget -= shot;
        let Some(kill) = run.hit_enemy(handle, shot).and_then(|o| o.kill) else {
            continue;
        };
        if kill.drops.soul {
            run.collect_soul();
        }
        if let Some(special) = kill.drops.special {
            run.collect_special(special);
        }
        if let Some(chest) = kill.chest {
            run.chest_ready(chest);
            let _ = run.open_chest(chest);
        }
    }

    let contact: f32 = run.scheduler().tracked().map(|e| e.damage).sum();
    run.damage_player(contact * CONTACT_SHARE * dt);
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_num_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    parse_str_arg(args, flag).and_then(|v| v.parse().ok())
}
