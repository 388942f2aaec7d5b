//! End-to-end run scenarios through `RunSession`
//!
//! Each test drives a whole session the way a host would: ticking time,
//! reporting kills and hits, opening chests and using altars.

use std::sync::{Arc, Mutex};

use survivor_core::collab::{
    PresentationEvent, PresentationLog, SharedPresentationLog, SimplePool, SquareArena,
};
use survivor_core::economy::ChestRefusal;
use survivor_core::enemy::ArchetypeKind;
use survivor_core::player::PlayerClass;
use survivor_core::run::{AltarOutcome, RunCollaborators, RunPhase, RunSession, RunSettings};
use survivor_core::spawn::{BossTrigger, SpawnState};
use survivor_core::upgrades::Rarity;
use survivor_core::{BalanceConfig, GameMode};

fn settings(seed: u64) -> RunSettings {
    RunSettings {
        seed,
        ..Default::default()
    }
}

fn headless(config: BalanceConfig) -> RunSession {
    RunSession::new(config, settings(7), RunCollaborators::headless())
}

/// Config with a single map-unlock boss at 30 seconds
fn early_boss_config() -> BalanceConfig {
    let mut config = BalanceConfig::default();
    config.spawn.boss_triggers = vec![BossTrigger {
        minute: 0.5,
        map_unlock: true,
    }];
    config
}

fn tick_seconds(run: &mut RunSession, seconds: u32) -> Vec<survivor_core::collab::InstanceHandle> {
    let mut bosses = Vec::new();
    for _ in 0..seconds {
        let report = run.tick(1.0);
        bosses.extend(report.bosses);
    }
    bosses
}

// ============================================================
// Altar
// ============================================================

#[test]
fn test_altar_sacrifices_and_levels() {
    let mut run = headless(BalanceConfig::default());
    match run.use_altar() {
        AltarOutcome::Sacrificed { hp_cost, new_level } => {
            assert!((hp_cost - 10.0).abs() < 1e-4);
            assert_eq!(new_level, 2);
        }
        AltarOutcome::Refused => panic!("full HP altar refused"),
    }
    assert!((run.player().required_xp() - 72.0).abs() < 1e-3);
    assert_eq!(run.ledger().summary(GameMode::Normal, 0.0, run.player()).altars_used, 1);
}

#[test]
fn test_altar_refused_near_death() {
    let mut run = headless(BalanceConfig::default());
    run.damage_player(98.95);
    assert!(run.player().current_hp() < 1.1);
    assert_eq!(run.use_altar(), AltarOutcome::Refused);
    assert_eq!(run.player().level(), 1);
    assert_eq!(run.phase(), RunPhase::Playing);
}

// ============================================================
// Chests
// ============================================================

#[test]
fn test_chest_price_grows_per_purchase() {
    let mut config = BalanceConfig::default();
    config.player.starting_gold = 40;
    let mut run = headless(config);

    let first = run.place_chest(false);
    assert_eq!(run.chest_price(first), Some(15));
    assert_eq!(run.open_chest(first).err(), Some(ChestRefusal::NotReady));
    run.chest_ready(first);
    let reward = run.open_chest(first).expect("affordable");
    assert_eq!(reward.price_paid, 15);
    assert!(reward.item.is_some());
    assert_eq!(run.player().gold(), 25);
    assert_eq!(run.open_chest(first).err(), Some(ChestRefusal::Unavailable));

    let second = run.place_chest(false);
    assert_eq!(run.chest_price(second), Some(19));
    run.chest_ready(second);
    run.open_chest(second).expect("affordable");

    let third = run.place_chest(false);
    run.chest_ready(third);
    assert_eq!(
        run.open_chest(third).err(),
        Some(ChestRefusal::CannotAfford { price: 23 })
    );
    assert_eq!(run.player().gold(), 6);
    assert_eq!(run.ledger().gold_spent(), 34);
    assert_eq!(run.ledger().chests_opened(), 2);
}

// ============================================================
// XP
// ============================================================

#[test]
fn test_xp_threshold_grows_after_level() {
    let mut run = headless(BalanceConfig::default());
    assert!((run.player().required_xp() - 60.0).abs() < 1e-4);
    let mut killed = 0;
    while run.player().level() == 1 && killed < 100 {
        let report = run.tick(1.0);
        for handle in report.spawned {
            if run.enemy_killed(handle).is_some() {
                killed += 1;
            }
            if run.player().level() > 1 {
                break;
            }
        }
    }
    assert_eq!(run.player().level(), 2);
    assert!((run.player().required_xp() - 72.0).abs() < 1e-3);
    assert_eq!(run.phase(), RunPhase::ChoosingUpgrade);
    assert_eq!(run.offers().len(), 3);
}

// ============================================================
// Bosses
// ============================================================

#[test]
fn test_boss_fires_once_and_unlocks_map() {
    let mut run = headless(early_boss_config());
    let bosses = tick_seconds(&mut run, 29);
    assert!(bosses.is_empty());
    assert!(!run.scheduler().boss_fired(0));

    let bosses = tick_seconds(&mut run, 30);
    assert_eq!(bosses.len(), 1);
    assert!(run.scheduler().boss_fired(0));

    let boss = run.scheduler().enemy(bosses[0]).cloned().expect("tracked boss");
    assert!(boss.archetype.is_boss);
    assert!(boss.archetype.is_map_unlock_boss);
    assert_eq!(run.pool().count_active(ArchetypeKind::Boss), 1);

    let reward = run.enemy_killed(bosses[0]).expect("boss reward");
    assert_eq!(reward.payout.gold, 11);
    assert!(run.ledger().map_unlocked());
    assert_eq!(run.ledger().kills().boss, 1);

    let chest = reward.chest.expect("boss always drops a chest");
    assert_eq!(run.chest_price(chest), Some(0));
    run.chest_ready(chest);
    let item = run.open_chest(chest).expect("free chest").item.expect("item");
    assert_eq!(item.rarity, Rarity::Legendary);
}

#[test]
fn test_exhausted_boss_pool_keeps_latch_open() {
    let mut config = early_boss_config();
    config.spawn.boss_triggers[0].map_unlock = false;
    let collab = RunCollaborators {
        pool: Box::new(
            SimplePool::new()
                .with_capacity(ArchetypeKind::Grunt, 64)
                .with_capacity(ArchetypeKind::Brute, 64)
                .with_capacity(ArchetypeKind::Runner, 64)
                .with_capacity(ArchetypeKind::Boss, 0),
        ),
        ..RunCollaborators::headless()
    };
    let mut run = RunSession::new(config, settings(3), collab);
    let bosses = tick_seconds(&mut run, 45);
    assert!(bosses.is_empty());
    assert!(!run.scheduler().boss_fired(0));
}

// ============================================================
// Lifecycle
// ============================================================

#[test]
fn test_end_stops_spawning_and_restart_resets() {
    let mut run = headless(BalanceConfig::default());
    tick_seconds(&mut run, 10);
    assert!(run.scheduler().tracked_count() > 0);

    run.end();
    assert_eq!(run.phase(), RunPhase::Ended);
    assert_eq!(run.scheduler().state(), SpawnState::Stopped);
    assert!(run.tick(5.0).is_empty());
    let survived = run.summary().expect("summary").survived_seconds;
    assert!((survived - 10.0).abs() < 1e-6);

    run.restart();
    assert_eq!(run.phase(), RunPhase::Playing);
    assert_eq!(run.scheduler().state(), SpawnState::Spawning);
    assert_eq!(run.scheduler().tracked_count(), 0);
    assert_eq!(run.scheduler().population(run.pool()), 0);
    assert_eq!(run.clock().seconds(), 0.0);
    assert_eq!(run.ledger().kills().total(), 0);
    assert!(run.summary().is_none());
    assert!(!run.tick(1.0).spawned.is_empty());
}

#[test]
fn test_souls_bank_into_meta_store() {
    let mut run = headless(BalanceConfig::default());
    assert_eq!(run.collect_soul(), 1);
    assert_eq!(run.collect_soul(), 1);
    assert_eq!(run.meta_store().map(|m| m.souls()), Some(2));
    assert_eq!(run.ledger().souls_collected(), 2);

    let collab = RunCollaborators {
        meta: None,
        ..RunCollaborators::headless()
    };
    let mut bare = RunSession::new(BalanceConfig::default(), settings(1), collab);
    assert_eq!(bare.collect_soul(), 1);
    assert!(bare.meta_store().is_none());
    assert_eq!(bare.ledger().souls_collected(), 1);
}

#[test]
fn test_madness_is_harder() {
    let mut normal = headless(BalanceConfig::default());
    let mut madness = RunSession::new(
        BalanceConfig::default(),
        RunSettings {
            mode: GameMode::Madness,
            seed: 7,
            ..Default::default()
        },
        RunCollaborators::headless(),
    );
    tick_seconds(&mut normal, 120);
    tick_seconds(&mut madness, 120);
    assert!(madness.difficulty() > normal.difficulty());
    assert!(madness.scheduler().tracked_count() > normal.scheduler().tracked_count());
}

#[test]
fn test_bounded_arena_keeps_spawns_inside() {
    let collab = RunCollaborators {
        bounds: Some(Box::new(SquareArena {
            half_extent: 20.0,
            ground: 1.5,
        })),
        ..RunCollaborators::headless()
    };
    let mut run = RunSession::new(BalanceConfig::default(), settings(11), collab);
    let report = run.tick(3.0);
    assert!(!report.spawned.is_empty());
}

// ============================================================
// Presentation
// ============================================================

#[test]
fn test_presentation_log_sees_run() {
    let log: SharedPresentationLog = Arc::new(Mutex::new(PresentationLog::new()));
    let collab = RunCollaborators {
        presentation: Box::new(log.clone()),
        ..RunCollaborators::headless()
    };
    let mut run = RunSession::new(early_boss_config(), settings(21), collab);

    let bosses = tick_seconds(&mut run, 31);
    assert_eq!(bosses.len(), 1);
    run.hit_enemy(bosses[0], 5.0).expect("boss is tracked");
    run.use_altar();
    run.damage_player(10_000.0);

    let events = log.lock().map(|mut l| l.drain()).unwrap_or_default();
    assert!(events
        .iter()
        .any(|e| matches!(e, PresentationEvent::BossSpawned { map_unlock: true, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, PresentationEvent::DamageDealt { amount, .. } if *amount == 5.0)));
    assert!(events
        .iter()
        .any(|e| matches!(e, PresentationEvent::BossHealthChanged { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, PresentationEvent::LevelUp { level: 2, offers: 3 })));
    let ended = events
        .iter()
        .filter(|e| matches!(e, PresentationEvent::RunEnded(_)))
        .count();
    assert_eq!(ended, 1);
}

fn logged_session(
    config: BalanceConfig,
    settings: RunSettings,
) -> (RunSession, SharedPresentationLog) {
    let log: SharedPresentationLog = Arc::new(Mutex::new(PresentationLog::new()));
    let collab = RunCollaborators {
        presentation: Box::new(log.clone()),
        ..RunCollaborators::headless()
    };
    (RunSession::new(config, settings, collab), log)
}

#[test]
fn test_max_hp_level_up_refreshes_hud() {
    let (mut run, log) = logged_session(
        BalanceConfig::default(),
        RunSettings {
            class: PlayerClass::Juggernaut,
            seed: 5,
            ..Default::default()
        },
    );
    let max_before = run.player().max_hp();
    assert!(matches!(run.use_altar(), AltarOutcome::Sacrificed { .. }));
    assert!(run.player().max_hp() > max_before);

    let events = log.lock().map(|mut l| l.drain()).unwrap_or_default();
    let last_hp = events.iter().rev().find_map(|e| match e {
        PresentationEvent::HpChanged { current, max } => Some((*current, *max)),
        _ => None,
    });
    assert_eq!(
        last_hp,
        Some((run.player().current_hp(), run.player().max_hp()))
    );
}

#[test]
fn test_boss_hp_recalc_keeps_ratio_and_notifies() {
    let (mut run, log) = logged_session(early_boss_config(), settings(17));
    let bosses = tick_seconds(&mut run, 31);
    assert_eq!(bosses.len(), 1);
    let boss = bosses[0];
    let max_before = run.scheduler().enemy(boss).map(|e| e.max_hp).expect("tracked boss");
    run.hit_enemy(boss, max_before * 0.5).expect("boss is tracked");

    tick_seconds(&mut run, 120);
    log.lock().map(|mut l| l.drain()).unwrap_or_default();

    let (current, max) = run.recalculate_boss_hp(boss).expect("boss still alive");
    assert!(max > max_before);
    assert!((current / max - 0.5).abs() < 1e-4);

    let events = log.lock().map(|mut l| l.drain()).unwrap_or_default();
    assert!(events.iter().any(|e| matches!(
        e,
        PresentationEvent::BossHealthChanged { handle, .. } if *handle == boss
    )));

    run.end();
    assert!(run.recalculate_boss_hp(boss).is_none());
}
