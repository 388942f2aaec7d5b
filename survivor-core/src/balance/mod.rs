//! Monte-Carlo balance checks.
//!
//! Two reports for tuning work, both deterministic for a given base seed:
//! - rarity distribution per luck value, sampled in parallel chunks with
//!   rayon, each chunk seeded from SHA3(base_seed, luck index, chunk index)
//! - the difficulty curve: per-minute difficulty, spawn cadence, caps and
//!   enemy stats
//!
//! Used by `survivor-sim --balance` and the bench suite.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::config::BalanceConfig;
use crate::difficulty::GameMode;
use crate::enemy::{EnemyArchetype, EnemyStatResolver};
use crate::logging::TimingSpan;
use crate::rng::seeded;
use crate::spawn::SpawnScheduler;
use crate::upgrades::Rarity;

const SAMPLES_PER_CHUNK: u64 = 4096;

/// Configuration for a balance sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub base_seed: u64,
    pub samples_per_luck: u64,
    pub luck_values: Vec<f32>,
    pub mode: GameMode,
    pub curve_minutes: u32,
    /// Rows per minute in the curve table
    pub curve_resolution: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_seed: 42,
            samples_per_luck: 100_000,
            luck_values: vec![0.0, 0.1, 0.25, 0.5, 1.0, 2.0],
            mode: GameMode::Normal,
            curve_minutes: 20,
            curve_resolution: 1,
        }
    }
}

/// Observed vs expected tier shares at one luck value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RarityDistribution {
    pub luck: f32,
    pub samples: u64,
    pub observed: [f32; 4],
    pub expected: [f32; 4],
    pub max_deviation: f32,
}

/// One row of the difficulty curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveRow {
    pub minute: f32,
    pub difficulty: f32,
    pub effective_difficulty: f32,
    pub spawn_acceleration: f32,
    pub spawn_interval: f32,
    pub max_enemies: u32,
    pub population_cap: u32,
    pub grunt_hp: f32,
    pub grunt_damage: f32,
    pub grunt_speed: f32,
    pub boss_hp: f32,
    pub grunt_xp: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub base_seed: u64,
    pub rarity: Vec<RarityDistribution>,
    pub curve: Vec<CurveRow>,
    /// Worst rarity share deviation across all luck values
    pub max_rarity_deviation: f32,
}

impl BalanceReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Deterministic sub-seed for a (stream, index) pair
pub fn derive_seed(base_seed: u64, stream: u64, index: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(stream.to_le_bytes());
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Sample the rarity roll at every configured luck value
pub fn rarity_distribution(balance: &BalanceConfig, sim: &SimConfig) -> Vec<RarityDistribution> {
    let table = &balance.rarity;
    sim.luck_values
        .iter()
        .enumerate()
        .map(|(stream, &luck)| {
            let chunks = sim.samples_per_luck.div_ceil(SAMPLES_PER_CHUNK);
            let counts = (0..chunks)
                .into_par_iter()
                .map(|chunk| {
                    let start = chunk * SAMPLES_PER_CHUNK;
                    let len = SAMPLES_PER_CHUNK.min(sim.samples_per_luck - start);
                    let mut rng = seeded(derive_seed(sim.base_seed, stream as u64, chunk));
                    let mut counts = [0u64; 4];
                    for _ in 0..len {
                        counts[table.roll(luck, &mut rng).index()] += 1;
                    }
                    counts
                })
                .reduce(
                    || [0u64; 4],
                    |mut a, b| {
                        for i in 0..4 {
                            a[i] += b[i];
                        }
                        a
                    },
                );

            let weights = table.weights(luck);
            let total_weight: f32 = weights.iter().sum();
            let samples = sim.samples_per_luck.max(1) as f32;
            let mut observed = [0.0; 4];
            let mut expected = [0.0; 4];
            let mut max_deviation: f32 = 0.0;
            for rarity in Rarity::ALL {
                let i = rarity.index();
                observed[i] = counts[i] as f32 / samples;
                expected[i] = if total_weight > 0.0 {
                    weights[i] / total_weight
                } else {
                    0.0
                };
                max_deviation = max_deviation.max((observed[i] - expected[i]).abs());
            }
            RarityDistribution {
                luck,
                samples: sim.samples_per_luck,
                observed,
                expected,
                max_deviation,
            }
        })
        .collect()
}

/// Difficulty, cadence and enemy stats over the configured minutes
pub fn difficulty_curve(balance: &BalanceConfig, sim: &SimConfig) -> Vec<CurveRow> {
    let scheduler = SpawnScheduler::new(balance.spawn.clone());
    let resolver = EnemyStatResolver::new(&balance.enemy, &balance.difficulty);
    let grunt = EnemyArchetype::grunt();
    let boss = balance.spawn.boss;
    let d = &balance.difficulty;
    let resolution = sim.curve_resolution.max(1);
    let rows = sim.curve_minutes * resolution;

    (0..=rows)
        .into_par_iter()
        .map(|step| {
            let minute = step as f32 / resolution as f32;
            let effective = d.effective_difficulty(minute, sim.mode);
            let grunt_stats = resolver.resolve(&grunt, effective, minute);
            let boss_stats = resolver.resolve(
                &boss,
                effective * balance.spawn.boss_difficulty_mult,
                minute,
            );
            CurveRow {
                minute,
                difficulty: d.difficulty(minute, sim.mode),
                effective_difficulty: effective,
                spawn_acceleration: d.spawn_acceleration(minute, sim.mode),
                spawn_interval: scheduler.spawn_interval(d, minute, sim.mode),
                max_enemies: scheduler.max_enemies(d, minute, sim.mode),
                population_cap: scheduler.population_cap(d, minute, sim.mode),
                grunt_hp: grunt_stats.max_hp,
                grunt_damage: grunt_stats.damage,
                grunt_speed: grunt_stats.move_speed,
                boss_hp: boss_stats.max_hp,
                grunt_xp: resolver.payout(&grunt, minute, sim.mode).xp,
            }
        })
        .collect()
}

/// Run both sweeps
pub fn run_balance_simulation(balance: &BalanceConfig, sim: &SimConfig) -> BalanceReport {
    let _span = TimingSpan::new("balance_simulation");
    let rarity = rarity_distribution(balance, sim);
    let curve = difficulty_curve(balance, sim);
    let max_rarity_deviation = rarity
        .iter()
        .map(|r| r.max_deviation)
        .fold(0.0, f32::max);
    tracing::debug!(
        luck_values = rarity.len(),
        rows = curve.len(),
        max_rarity_deviation,
        "balance simulation finished"
    );
    BalanceReport {
        base_seed: sim.base_seed,
        rarity,
        curve,
        max_rarity_deviation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SimConfig {
        SimConfig {
            samples_per_luck: 50_000,
            luck_values: vec![0.0, 2.0],
            curve_minutes: 12,
            ..Default::default()
        }
    }

    #[test]
    fn test_derive_seed_is_stable_and_distinct() {
        assert_eq!(derive_seed(1, 2, 3), derive_seed(1, 2, 3));
        assert_ne!(derive_seed(1, 2, 3), derive_seed(1, 2, 4));
        assert_ne!(derive_seed(1, 2, 3), derive_seed(2, 2, 3));
    }

    #[test]
    fn test_rarity_matches_weights() {
        let report = rarity_distribution(&BalanceConfig::default(), &small());
        assert_eq!(report.len(), 2);
        let zero = &report[0];
        assert!((zero.expected[0] - 0.60).abs() < 1e-6);
        assert!(zero.max_deviation < 0.01, "deviation {}", zero.max_deviation);
        let lucky = &report[1];
        assert!(lucky.observed[3] > zero.observed[3]);
    }

    #[test]
    fn test_deterministic_results() {
        let a = rarity_distribution(&BalanceConfig::default(), &small());
        let b = rarity_distribution(&BalanceConfig::default(), &small());
        assert_eq!(a[0].observed, b[0].observed);
        assert_eq!(a[1].observed, b[1].observed);
    }

    #[test]
    fn test_partial_chunk_counts_every_sample() {
        let sim = SimConfig {
            samples_per_luck: SAMPLES_PER_CHUNK + 7,
            luck_values: vec![0.5],
            ..Default::default()
        };
        let report = rarity_distribution(&BalanceConfig::default(), &sim);
        let sum: f32 = report[0].observed.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_curve_rows() {
        let curve = difficulty_curve(&BalanceConfig::default(), &small());
        assert_eq!(curve.len(), 13);
        assert_eq!(curve[0].max_enemies, 28);
        assert!(curve.windows(2).all(|w| w[1].effective_difficulty > w[0].effective_difficulty));
        assert!(curve.iter().all(|r| r.population_cap <= 250));
        assert!((curve[10].boss_hp / curve[10].grunt_hp - 15.0 * 2.5).abs() < 1e-2);
    }

    #[test]
    fn test_report_serialization() {
        let report = run_balance_simulation(&BalanceConfig::default(), &small());
        let json = report.to_json();
        assert!(json.contains("max_rarity_deviation"));
        assert!(json.contains("spawn_interval"));
    }
}
