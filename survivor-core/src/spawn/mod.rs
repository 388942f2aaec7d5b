//! Spawn scheduling: cadence, population caps, archetype draw and bosses.
//!
//! The scheduler is an explicit state machine (`Idle -> Spawning -> Stopped`)
//! driven by `tick`. Each tick it:
//! 1. fires any due boss trigger (one-shot latches)
//! 2. feeds `dt` into the spawn timer and consumes whole intervals, one
//!    spawn attempt per interval
//! 3. skips attempts while the population is at the ramped or hard cap,
//!    or when the pool has nothing to hand out
//!
//! Live enemies are tracked by handle so kills, damage and `reset` can
//! find them again.

pub mod position;

pub use position::{facing, SpawnRing};

use std::collections::BTreeMap;

use bevy::math::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collab::{EnemyPool, InstanceHandle, PlayableBounds};
use crate::constants::{BOSS_DIFFICULTY_MULT, HARD_ENEMY_CAP, SPAWN_POSITION_ATTEMPTS};
use crate::difficulty::{DifficultyScalar, GameMode};
use crate::enemy::{ArchetypeKind, EnemyArchetype, EnemyInstance, EnemyScaling, EnemyStatResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnState {
    #[default]
    Idle,
    Spawning,
    Stopped,
}

/// Fixed-time boss spawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossTrigger {
    pub minute: f32,
    pub map_unlock: bool,
}

/// Spawn cadence and population tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub base_max_enemies: f32,
    /// Linear cap growth, multiplied by spawn acceleration
    pub max_enemies_per_minute: f32,
    pub max_enemies_quadratic: f32,
    pub rage_extra_enemies_per_minute: f32,
    pub hard_cap: u32,
    pub base_interval: f32,
    pub min_interval: f32,
    pub rage_min_interval: f32,
    pub min_spawn_radius: f32,
    pub max_spawn_radius: f32,
    pub position_attempts: u32,
    pub boss_difficulty_mult: f32,
    pub boss_triggers: Vec<BossTrigger>,
    pub roster: Vec<EnemyArchetype>,
    pub boss: EnemyArchetype,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            base_max_enemies: 28.0,
            max_enemies_per_minute: 6.0,
            max_enemies_quadratic: 0.15,
            rage_extra_enemies_per_minute: 8.0,
            hard_cap: HARD_ENEMY_CAP,
            base_interval: 0.85,
            min_interval: 0.12,
            rage_min_interval: 0.05,
            min_spawn_radius: 18.0,
            max_spawn_radius: 28.0,
            position_attempts: SPAWN_POSITION_ATTEMPTS,
            boss_difficulty_mult: BOSS_DIFFICULTY_MULT,
            boss_triggers: vec![
                BossTrigger {
                    minute: 3.0,
                    map_unlock: false,
                },
                BossTrigger {
                    minute: 7.0,
                    map_unlock: false,
                },
                BossTrigger {
                    minute: 10.0,
                    map_unlock: true,
                },
            ],
            roster: EnemyArchetype::standard_roster(),
            boss: EnemyArchetype::boss(),
        }
    }
}

impl SpawnTuning {
    pub fn ring(&self) -> SpawnRing {
        SpawnRing {
            min_radius: self.min_spawn_radius,
            max_radius: self.max_spawn_radius,
            attempts: self.position_attempts,
        }
    }
}

/// Everything a tick needs from the rest of the run
pub struct SpawnContext<'a> {
    pub minutes: f32,
    pub mode: GameMode,
    pub difficulty: &'a DifficultyScalar,
    pub scaling: &'a EnemyScaling,
    pub player_position: Vec3,
    pub pool: &'a mut dyn EnemyPool,
    pub bounds: Option<&'a dyn PlayableBounds>,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnTickReport {
    pub spawned: Vec<InstanceHandle>,
    pub bosses: Vec<InstanceHandle>,
    pub skipped_at_cap: u32,
    pub skipped_no_instance: u32,
}

impl SpawnTickReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
            && self.bosses.is_empty()
            && self.skipped_at_cap == 0
            && self.skipped_no_instance == 0
    }
}

/// Result of hitting a tracked enemy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyHit {
    pub dealt: f32,
    pub current_hp: f32,
    pub max_hp: f32,
    pub killed: bool,
    pub is_boss: bool,
}

#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    tuning: SpawnTuning,
    state: SpawnState,
    spawn_timer: f32,
    boss_latches: Vec<bool>,
    tracked: BTreeMap<InstanceHandle, EnemyInstance>,
}

impl SpawnScheduler {
    pub fn new(tuning: SpawnTuning) -> Self {
        let latches = vec![false; tuning.boss_triggers.len()];
        Self {
            tuning,
            state: SpawnState::Idle,
            spawn_timer: 0.0,
            boss_latches: latches,
            tracked: BTreeMap::new(),
        }
    }

    pub fn tuning(&self) -> &SpawnTuning {
        &self.tuning
    }

    pub fn state(&self) -> SpawnState {
        self.state
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    pub fn start(&mut self) {
        if self.state != SpawnState::Spawning {
            debug!("spawner started");
            self.state = SpawnState::Spawning;
        }
    }

    /// Suppress all further spawns; safe to call repeatedly
    pub fn stop(&mut self) {
        if self.state == SpawnState::Spawning {
            debug!("spawner stopped");
        }
        if self.state != SpawnState::Idle {
            self.state = SpawnState::Stopped;
        }
    }

    /// Back to `Idle`: timer and boss latches cleared, tracked enemies released
    pub fn reset(&mut self, pool: &mut dyn EnemyPool) {
        for handle in self.tracked.keys() {
            pool.release(*handle);
        }
        self.tracked.clear();
        self.spawn_timer = 0.0;
        self.boss_latches.iter_mut().for_each(|l| *l = false);
        self.state = SpawnState::Idle;
    }

    // ========================================================================
    // Curves
    // ========================================================================

    /// Ramped population cap, before the hard cap
    pub fn max_enemies(&self, difficulty: &DifficultyScalar, minutes: f32, mode: GameMode) -> u32 {
        let t = &self.tuning;
        let minutes = minutes.max(0.0);
        let accel = difficulty.spawn_acceleration(minutes, mode);
        let mut cap = (t.base_max_enemies
            + t.max_enemies_per_minute * minutes * accel
            + minutes * minutes * t.max_enemies_quadratic)
            .round();
        if difficulty.is_rage(minutes) {
            cap += (t.rage_extra_enemies_per_minute * difficulty.rage_minutes(minutes)).round();
        }
        cap.max(0.0) as u32
    }

    /// Cap actually enforced: ramp or hard cap, whichever is lower
    pub fn population_cap(&self, difficulty: &DifficultyScalar, minutes: f32, mode: GameMode) -> u32 {
        self.max_enemies(difficulty, minutes, mode)
            .min(self.tuning.hard_cap)
    }

    pub fn spawn_interval(&self, difficulty: &DifficultyScalar, minutes: f32, mode: GameMode) -> f32 {
        let t = &self.tuning;
        let accel = difficulty.spawn_acceleration(minutes, mode).max(f32::EPSILON);
        let interval = (t.base_interval / accel).max(t.min_interval);
        if difficulty.is_rage(minutes) {
            (interval * difficulty.rage_interval_factor(minutes)).max(t.rage_min_interval)
        } else {
            interval
        }
    }

    // ========================================================================
    // Population
    // ========================================================================

    fn tags(&self) -> impl Iterator<Item = ArchetypeKind> + '_ {
        let mut tags: Vec<ArchetypeKind> = self.tuning.roster.iter().map(|a| a.kind).collect();
        tags.push(self.tuning.boss.kind);
        tags.sort();
        tags.dedup();
        tags.into_iter()
    }

    /// Active instances summed over every archetype the pool serves
    pub fn population(&self, pool: &dyn EnemyPool) -> u32 {
        self.tags().map(|tag| pool.count_active(tag)).sum()
    }

    pub fn tracked(&self) -> impl Iterator<Item = &EnemyInstance> {
        self.tracked.values()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn enemy(&self, handle: InstanceHandle) -> Option<&EnemyInstance> {
        self.tracked.get(&handle)
    }

    pub fn boss_fired(&self, index: usize) -> bool {
        self.boss_latches.get(index).copied().unwrap_or(false)
    }

    /// Weighted draw over the roster; first cumulative bucket wins
    pub fn pick_archetype<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<EnemyArchetype> {
        let total: f32 = self
            .tuning
            .roster
            .iter()
            .map(|a| a.spawn_weight.max(0.0))
            .sum();
        if total <= 0.0 {
            return None;
        }
        let draw = rng.gen::<f32>() * total;
        let mut cumulative = 0.0;
        for archetype in &self.tuning.roster {
            cumulative += archetype.spawn_weight.max(0.0);
            if draw < cumulative {
                return Some(*archetype);
            }
        }
        self.tuning.roster.last().copied()
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        ctx: &mut SpawnContext<'_>,
        rng: &mut R,
    ) -> SpawnTickReport {
        let mut report = SpawnTickReport::default();
        if self.state != SpawnState::Spawning {
            return report;
        }

        self.fire_due_bosses(ctx, rng, &mut report);

        if dt > 0.0 && dt.is_finite() {
            self.spawn_timer += dt;
        }
        let interval = self.spawn_interval(ctx.difficulty, ctx.minutes, ctx.mode);
        let cap = self.population_cap(ctx.difficulty, ctx.minutes, ctx.mode);
        let max_attempts = self.tuning.hard_cap.max(1);
        let mut attempts = 0;

        while self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            attempts += 1;
            if attempts > max_attempts {
                // Far behind; drop the backlog instead of flooding the pool
                self.spawn_timer %= interval;
                break;
            }
            if self.population(&*ctx.pool) >= cap {
                report.skipped_at_cap += 1;
                continue;
            }
            match self.spawn_regular(ctx, rng) {
                Some(handle) => report.spawned.push(handle),
                None => report.skipped_no_instance += 1,
            }
        }

        if report.skipped_at_cap > 0 || report.skipped_no_instance > 0 {
            debug!(
                at_cap = report.skipped_at_cap,
                no_instance = report.skipped_no_instance,
                "spawn attempts skipped"
            );
        }
        report
    }

    fn spawn_regular<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        rng: &mut R,
    ) -> Option<InstanceHandle> {
        let archetype = self.pick_archetype(rng)?;
        let difficulty = ctx.difficulty.effective_difficulty(ctx.minutes, ctx.mode);
        self.spawn_instance(archetype, difficulty, ctx, rng)
    }

    fn fire_due_bosses<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        rng: &mut R,
        report: &mut SpawnTickReport,
    ) {
        for index in 0..self.tuning.boss_triggers.len() {
            let trigger = self.tuning.boss_triggers[index];
            if self.boss_latches[index] || ctx.minutes < trigger.minute {
                continue;
            }
            if self.population(&*ctx.pool) >= self.tuning.hard_cap {
                continue;
            }

            // Flags first; boss stats branch on them
            let mut archetype = self.tuning.boss;
            archetype.is_boss = true;
            archetype.is_map_unlock_boss = trigger.map_unlock;
            let difficulty = ctx.difficulty.effective_difficulty(ctx.minutes, ctx.mode)
                * self.tuning.boss_difficulty_mult;

            match self.spawn_instance(archetype, difficulty, ctx, rng) {
                Some(handle) => {
                    self.boss_latches[index] = true;
                    info!(
                        minute = trigger.minute,
                        map_unlock = trigger.map_unlock,
                        "boss spawned"
                    );
                    report.bosses.push(handle);
                }
                None => warn!(minute = trigger.minute, "boss spawn had no instance, retrying"),
            }
        }
    }

    fn spawn_instance<R: Rng + ?Sized>(
        &mut self,
        archetype: EnemyArchetype,
        difficulty: f32,
        ctx: &mut SpawnContext<'_>,
        rng: &mut R,
    ) -> Option<InstanceHandle> {
        let position = self
            .tuning
            .ring()
            .place(ctx.player_position, ctx.bounds, rng);
        let rotation = facing(position, ctx.player_position);
        let handle = ctx.pool.acquire(archetype.kind, position, rotation)?;

        let resolver = EnemyStatResolver::new(ctx.scaling, ctx.difficulty);
        let stats = resolver.resolve(&archetype, difficulty, ctx.minutes);
        self.tracked.insert(
            handle,
            EnemyInstance::new(handle, archetype, stats, difficulty, ctx.minutes),
        );
        Some(handle)
    }

    // ========================================================================
    // Enemy lifecycle
    // ========================================================================

    /// Apply damage to a tracked enemy; `None` for unknown handles
    pub fn damage_enemy(&mut self, handle: InstanceHandle, amount: f32) -> Option<EnemyHit> {
        let enemy = self.tracked.get_mut(&handle)?;
        let dealt = enemy.apply_damage(amount);
        Some(EnemyHit {
            dealt,
            current_hp: enemy.current_hp,
            max_hp: enemy.max_hp,
            killed: enemy.is_dead(),
            is_boss: enemy.archetype.is_boss,
        })
    }

    /// Re-resolve a tracked boss at `minutes`, keeping its HP ratio.
    /// Returns the new `(current, max)`; `None` for unknown handles and non-bosses.
    pub fn recalculate_boss_hp(
        &mut self,
        handle: InstanceHandle,
        resolver: &EnemyStatResolver,
        minutes: f32,
    ) -> Option<(f32, f32)> {
        let enemy = self.tracked.get_mut(&handle)?;
        if !enemy.archetype.is_boss {
            return None;
        }
        enemy.recalculate_boss_hp(resolver, minutes);
        Some((enemy.current_hp, enemy.max_hp))
    }

    /// Stop tracking an enemy and hand it back to the pool
    pub fn despawn(&mut self, handle: InstanceHandle, pool: &mut dyn EnemyPool) -> Option<EnemyInstance> {
        let enemy = self.tracked.remove(&handle)?;
        pool.release(handle);
        Some(enemy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::SimplePool;
    use crate::rng::seeded;

    struct Fixture {
        difficulty: DifficultyScalar,
        scaling: EnemyScaling,
        pool: SimplePool,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                difficulty: DifficultyScalar::default(),
                scaling: EnemyScaling::default(),
                pool: SimplePool::standard(),
            }
        }

        fn ctx(&mut self, minutes: f32) -> SpawnContext<'_> {
            SpawnContext {
                minutes,
                mode: GameMode::Normal,
                difficulty: &self.difficulty,
                scaling: &self.scaling,
                player_position: Vec3::ZERO,
                pool: &mut self.pool,
                bounds: None,
            }
        }
    }

    #[test]
    fn test_max_enemies_curve() {
        let s = SpawnScheduler::new(SpawnTuning::default());
        let d = DifficultyScalar::default();
        assert_eq!(s.max_enemies(&d, 0.0, GameMode::Normal), 28);
        // 28 + 6*5*1.9 + 25*0.15 = 88.75
        assert_eq!(s.max_enemies(&d, 5.0, GameMode::Normal), 89);
        // 28 + 6*12*3.16 + 144*0.15 = 277.12, plus round(8*2) in rage
        assert_eq!(s.max_enemies(&d, 12.0, GameMode::Normal), 277 + 16);
        assert_eq!(s.population_cap(&d, 12.0, GameMode::Normal), 250);
    }

    #[test]
    fn test_spawn_interval_floors() {
        let s = SpawnScheduler::new(SpawnTuning::default());
        let d = DifficultyScalar::default();
        assert!((s.spawn_interval(&d, 0.0, GameMode::Normal) - 0.85).abs() < 1e-6);
        assert!((s.spawn_interval(&d, 30.0, GameMode::Normal) - 0.05).abs() < 1e-6);

        let late_rage = DifficultyScalar {
            rage_start_minutes: 100.0,
            ..DifficultyScalar::default()
        };
        assert!((s.spawn_interval(&late_rage, 30.0, GameMode::Madness) - 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_idle_and_stopped_do_not_spawn() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(1);
        assert!(s.tick(10.0, &mut fx.ctx(0.0), &mut rng).is_empty());

        s.start();
        s.stop();
        s.stop();
        assert_eq!(s.state(), SpawnState::Stopped);
        assert!(s.tick(10.0, &mut fx.ctx(5.0), &mut rng).is_empty());
    }

    #[test]
    fn test_accumulator_consumes_whole_intervals() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(2);
        s.start();
        let report = s.tick(0.5, &mut fx.ctx(0.0), &mut rng);
        assert!(report.spawned.is_empty());
        let report = s.tick(0.4, &mut fx.ctx(0.0), &mut rng);
        assert_eq!(report.spawned.len(), 1);
        let report = s.tick(0.85 * 3.0, &mut fx.ctx(0.0), &mut rng);
        assert_eq!(report.spawned.len(), 3);
        assert_eq!(s.tracked_count(), 4);
    }

    #[test]
    fn test_population_cap_suppresses() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(3);
        s.start();
        let report = s.tick(0.85 * 40.0 + 0.01, &mut fx.ctx(0.0), &mut rng);
        assert_eq!(report.spawned.len(), 28);
        assert_eq!(report.skipped_at_cap, 12);
        assert_eq!(s.population(&fx.pool), 28);
    }

    #[test]
    fn test_missing_pool_mapping_is_skipped() {
        let mut fx = Fixture::new();
        fx.pool = SimplePool::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(4);
        s.start();
        let report = s.tick(0.85 * 2.0 + 0.01, &mut fx.ctx(0.0), &mut rng);
        assert!(report.spawned.is_empty());
        assert_eq!(report.skipped_no_instance, 2);
    }

    #[test]
    fn test_boss_latch_fires_once() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(5);
        s.start();
        let mut bosses = 0;
        for step in 0..200 {
            let minutes = 3.0 + step as f32 * 0.01;
            bosses += s.tick(0.0, &mut fx.ctx(minutes), &mut rng).bosses.len();
        }
        assert_eq!(bosses, 1);
        assert!(s.boss_fired(0));
        assert!(!s.boss_fired(1));
    }

    #[test]
    fn test_boss_stats_resolved_with_flag_and_mult() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(6);
        s.start();
        let report = s.tick(0.0, &mut fx.ctx(10.0), &mut rng);
        assert_eq!(report.bosses.len(), 3);

        let map_boss = report
            .bosses
            .iter()
            .filter_map(|h| s.enemy(*h))
            .find(|e| e.archetype.is_map_unlock_boss)
            .cloned();
        assert!(map_boss.is_some());
        if let Some(boss) = map_boss {
            assert!(boss.archetype.is_boss);
            let d = DifficultyScalar::default();
            let expected_dm = d.effective_difficulty(10.0, GameMode::Normal) * 2.5;
            assert!((boss.difficulty - expected_dm).abs() < 1e-4);
            let expected_hp = 40.0 * 1.24f32.powf(10.0) * expected_dm * 15.0;
            assert!((boss.max_hp - expected_hp).abs() / expected_hp < 1e-4);
        }
    }

    #[test]
    fn test_reset_releases_and_clears_latches() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(7);
        s.start();
        s.tick(5.0, &mut fx.ctx(3.5), &mut rng);
        assert!(s.tracked_count() > 0);
        assert!(s.boss_fired(0));

        s.reset(&mut fx.pool);
        assert_eq!(s.state(), SpawnState::Idle);
        assert_eq!(s.tracked_count(), 0);
        assert_eq!(fx.pool.total_active(), 0);
        assert!(!s.boss_fired(0));
    }

    #[test]
    fn test_damage_and_despawn() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(8);
        s.start();
        let report = s.tick(0.9, &mut fx.ctx(0.0), &mut rng);
        let handle = report.spawned[0];
        let hp = s.enemy(handle).map(|e| e.max_hp).unwrap_or_default();

        let hit = s.damage_enemy(handle, hp + 5.0);
        assert_eq!(hit.map(|h| h.killed), Some(true));
        assert!(s.despawn(handle, &mut fx.pool).is_some());
        assert!(s.despawn(handle, &mut fx.pool).is_none());
        assert!(s.damage_enemy(handle, 1.0).is_none());
        assert_eq!(fx.pool.total_active(), 0);
    }

    #[test]
    fn test_boss_hp_recalc_through_scheduler() {
        let mut fx = Fixture::new();
        let mut s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(12);
        s.start();
        let report = s.tick(0.9, &mut fx.ctx(3.0), &mut rng);
        assert_eq!(report.bosses.len(), 1);
        let boss = report.bosses[0];
        let regular = report.spawned.first().copied();

        let max_before = s.enemy(boss).map(|e| e.max_hp).unwrap_or_default();
        s.damage_enemy(boss, max_before * 0.25);

        let resolver = EnemyStatResolver::new(&fx.scaling, &fx.difficulty);
        let (current, max) = s
            .recalculate_boss_hp(boss, &resolver, 6.0)
            .expect("tracked boss");
        assert!(max > max_before);
        assert!((current / max - 0.75).abs() < 1e-4);
        assert_eq!(s.enemy(boss).map(|e| e.max_hp), Some(max));

        if let Some(regular) = regular {
            assert!(s.recalculate_boss_hp(regular, &resolver, 6.0).is_none());
        }
        assert!(s
            .recalculate_boss_hp(InstanceHandle(u64::MAX), &resolver, 6.0)
            .is_none());
    }

    #[test]
    fn test_archetype_weights() {
        let s = SpawnScheduler::new(SpawnTuning::default());
        let mut rng = seeded(9);
        let mut counts = BTreeMap::new();
        let draws = 60_000;
        for _ in 0..draws {
            if let Some(a) = s.pick_archetype(&mut rng) {
                *counts.entry(a.kind).or_insert(0u32) += 1;
            }
        }
        let share = |k: ArchetypeKind| counts.get(&k).copied().unwrap_or(0) as f32 / draws as f32;
        assert!((share(ArchetypeKind::Grunt) - 0.8 / 1.45).abs() < 0.01);
        assert!((share(ArchetypeKind::Brute) - 0.15 / 1.45).abs() < 0.01);
        assert!((share(ArchetypeKind::Runner) - 0.5 / 1.45).abs() < 0.01);
        assert_eq!(share(ArchetypeKind::Boss), 0.0);
    }
}
