//! Centralized game constants for the survivor run core.
//!
//! Values here are structural: caps and limits the simulation relies on for
//! its invariants. Tunable balance numbers (growth rates, weights, radii)
//! live in the per-module tuning structs and can be overridden by
//! `BalanceConfig`.

// =====================================================
// Stat caps
// =====================================================

/// Lowest run bonus ReloadSpeed may reach (max 20% reload time reduction)
pub const RELOAD_SPEED_BONUS_FLOOR: f32 = -0.20;

/// Highest run bonus CritChance may reach (100%)
pub const CRIT_CHANCE_BONUS_CEILING: f32 = 1.0;

/// DamageReduction bonus is clamped into [0, DAMAGE_REDUCTION_CAP] on intake
pub const DAMAGE_REDUCTION_CAP: f32 = 0.8;

// =====================================================
// Player
// =====================================================

/// Multiplier applied to required XP every time a level is gained
pub const LEVEL_UP_XP_GROWTH: f32 = 1.2;

/// HP an altar sacrifice must leave the player with
pub const MIN_HP_AFTER_SACRIFICE: f32 = 1.0;

/// Levels at which each class receives its fixed milestone bonus
pub const CLASS_MILESTONE_LEVELS: [u32; 5] = [5, 15, 30, 50, 100];

// =====================================================
// Spawning
// =====================================================

/// Global ceiling on concurrently active enemies, independent of the ramp
pub const HARD_ENEMY_CAP: u32 = 250;

/// Difficulty multiplier applied on top of the run difficulty for bosses
pub const BOSS_DIFFICULTY_MULT: f32 = 2.5;

/// Attempts at finding an in-bounds spawn point before clamping
pub const SPAWN_POSITION_ATTEMPTS: u32 = 10;

// =====================================================
// Upgrades
// =====================================================

/// Number of upgrade cards offered on a level-up
pub const DEFAULT_UPGRADE_CHOICES: usize = 3;

/// Rejection sampling budget per valid pool entry when drawing upgrades
pub const UPGRADE_DRAW_ATTEMPT_FACTOR: usize = 3;
