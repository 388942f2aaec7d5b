//! Survivor Run Core
//!
//! Deterministic simulation of a survivor roguelite run:
//! - Difficulty scalar (time, game mode, rage mode)
//! - Spawn scheduler (cadence, population cap, scheduled bosses, ring placement)
//! - Enemy stat resolution (HP / damage / speed scaling, payouts, drops)
//! - Player stat accumulation (20 stat dimensions, caps, XP curve, buffs)
//! - Upgrade economy (rarity by luck, level-up cards, chests, altars)
//! - Meta progression (soul-bought permanent bonuses)
//! - Monte-Carlo balance reports
//! - Bevy plugin adapter for hosting a run in an `App`

pub mod balance;
pub mod clock;
pub mod collab;
pub mod config;
pub mod constants;
pub mod difficulty;
pub mod economy;
pub mod enemy;
pub mod logging;
pub mod meta;
pub mod player;
pub mod plugin;
pub mod rng;
pub mod run;
pub mod spawn;
pub mod stats;
pub mod upgrades;

pub use config::{BalanceConfig, ConfigError};
pub use difficulty::{DifficultyScalar, GameMode};
pub use economy::RunSummary;
pub use plugin::{RunEndedEvent, RunResource, RunSimPlugin};
pub use run::{RunCollaborators, RunPhase, RunSession, RunSettings};
pub use stats::StatDimension;
