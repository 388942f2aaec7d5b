//! Balance configuration: every tuning table in one serde document.
//!
//! Files may be RON (`.ron`) or JSON (anything else). Missing fields fall
//! back to the built-in defaults, so a config only needs the values it
//! changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::difficulty::DifficultyScalar;
use crate::economy::EconomyTuning;
use crate::enemy::EnemyScaling;
use crate::meta::MetaProgressionTable;
use crate::player::PlayerTuning;
use crate::spawn::SpawnTuning;
use crate::upgrades::{RarityTable, UpgradeCatalog};

/// Error type for loading balance configs
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub difficulty: DifficultyScalar,
    pub spawn: SpawnTuning,
    pub enemy: EnemyScaling,
    pub player: PlayerTuning,
    pub rarity: RarityTable,
    pub economy: EconomyTuning,
    pub meta: MetaProgressionTable,
    pub upgrades: UpgradeCatalog,
    pub chest_items: UpgradeCatalog,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyScalar::default(),
            spawn: SpawnTuning::default(),
            enemy: EnemyScaling::default(),
            player: PlayerTuning::default(),
            rarity: RarityTable::default(),
            economy: EconomyTuning::default(),
            meta: MetaProgressionTable::default(),
            upgrades: UpgradeCatalog::standard(),
            chest_items: UpgradeCatalog::chest_items(),
        }
    }
}

impl BalanceConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_ron = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ron"));
        let config = if is_ron {
            Self::from_ron(&content)?
        } else {
            Self::from_json(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.difficulty;
        if d.difficulty_growth <= 0.0 {
            return Err(invalid("difficulty.difficulty_growth", "must be positive"));
        }
        if d.spawn_acceleration_growth < 0.0 {
            return Err(invalid(
                "difficulty.spawn_acceleration_growth",
                "must not be negative",
            ));
        }
        if !(0.0..=1.0).contains(&d.rage_interval_shrink) || d.rage_interval_shrink == 0.0 {
            return Err(invalid(
                "difficulty.rage_interval_shrink",
                "must be in (0, 1]",
            ));
        }

        let s = &self.spawn;
        if s.hard_cap == 0 {
            return Err(invalid("spawn.hard_cap", "must be at least 1"));
        }
        if s.min_interval <= 0.0 || s.rage_min_interval <= 0.0 || s.base_interval <= 0.0 {
            return Err(invalid("spawn intervals", "must be positive"));
        }
        if s.min_spawn_radius < 0.0 || s.max_spawn_radius < s.min_spawn_radius {
            return Err(invalid(
                "spawn radius",
                format!("{} .. {} is not a valid ring", s.min_spawn_radius, s.max_spawn_radius),
            ));
        }
        if s.roster.iter().all(|a| a.spawn_weight <= 0.0) {
            return Err(invalid("spawn.roster", "needs a positive spawn weight"));
        }

        let e = &self.enemy;
        if e.hp_growth <= 0.0 || e.damage_growth <= 0.0 || e.xp_growth <= 0.0 {
            return Err(invalid("enemy growth", "must be positive"));
        }
        for (field, chance) in [
            ("enemy.soul_drop_chance", e.soul_drop_chance),
            ("enemy.chest_drop_chance", e.chest_drop_chance),
            ("enemy.special_drop_chance", e.special_drop_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(invalid(field, format!("{chance} is not a probability")));
            }
        }

        if self.player.base_xp_level1 <= 0.0 || self.player.xp_curve_growth <= 0.0 {
            return Err(invalid("player xp curve", "must be positive"));
        }
        if self.player.starting_level == 0 {
            return Err(invalid("player.starting_level", "must be at least 1"));
        }

        if self.rarity.base_weights.iter().sum::<f32>() <= 0.0 {
            return Err(invalid("rarity.base_weights", "must sum above zero"));
        }
        for i in 0..4 {
            if self.rarity.min_weights[i] > self.rarity.max_weights[i] {
                return Err(invalid("rarity weights", "min above max"));
            }
        }

        if self.economy.chest_price_growth <= 0.0 {
            return Err(invalid("economy.chest_price_growth", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.economy.altar_hp_cost) {
            return Err(invalid("economy.altar_hp_cost", "must be in [0, 1)"));
        }

        if self.upgrades.is_empty() {
            return Err(invalid("upgrades", "catalog is empty"));
        }
        Ok(())
    }
}
