//! Difficulty scaling over run time.
//!
//! Everything here is a pure function of elapsed minutes and the game mode:
//! - base difficulty scalar (enemy HP/damage/XP multiplier)
//! - spawn acceleration (drives cadence and population cap)
//! - rage mode, the late-run acceleration past the rage threshold

use serde::{Deserialize, Serialize};

/// Externally selected run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Normal,
    Madness,
}

impl GameMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "madness" => Some(Self::Madness),
            _ => None,
        }
    }
}

/// Difficulty curve tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyScalar {
    /// Difficulty gained per minute
    pub difficulty_growth: f32,
    /// Growth multiplier in Madness mode
    pub madness_difficulty_mult: f32,
    /// Spawn acceleration gained per minute
    pub spawn_acceleration_growth: f32,
    /// Spawn rate multiplier in Madness mode
    pub madness_spawn_rate_mult: f32,
    /// Minute at which rage mode starts
    pub rage_start_minutes: f32,
    /// Per-minute interval shrink factor during rage
    pub rage_interval_shrink: f32,
    /// Per-minute difficulty boost during rage
    pub rage_difficulty_growth: f32,
}

impl Default for DifficultyScalar {
    fn default() -> Self {
        Self {
            difficulty_growth: 0.08,
            madness_difficulty_mult: 1.5,
            spawn_acceleration_growth: 0.18,
            madness_spawn_rate_mult: 2.0,
            rage_start_minutes: 10.0,
            rage_interval_shrink: 0.65,
            rage_difficulty_growth: 0.45,
        }
    }
}

impl DifficultyScalar {
    fn mode_multiplier(&self, mode: GameMode) -> f32 {
        match mode {
            GameMode::Normal => 1.0,
            GameMode::Madness => self.madness_difficulty_mult,
        }
    }

    fn spawn_rate_multiplier(&self, mode: GameMode) -> f32 {
        match mode {
            GameMode::Normal => 1.0,
            GameMode::Madness => self.madness_spawn_rate_mult,
        }
    }

    /// `1 + minutes * growth * mode_mult`
    pub fn difficulty(&self, minutes: f32, mode: GameMode) -> f32 {
        1.0 + minutes.max(0.0) * self.difficulty_growth * self.mode_multiplier(mode)
    }

    /// `(1 + minutes * accel_growth) * spawn_rate_mult`
    pub fn spawn_acceleration(&self, minutes: f32, mode: GameMode) -> f32 {
        (1.0 + minutes.max(0.0) * self.spawn_acceleration_growth)
            * self.spawn_rate_multiplier(mode)
    }

    pub fn is_rage(&self, minutes: f32) -> bool {
        minutes >= self.rage_start_minutes
    }

    /// Minutes spent in rage mode, 0 before the threshold
    pub fn rage_minutes(&self, minutes: f32) -> f32 {
        (minutes - self.rage_start_minutes).max(0.0)
    }

    /// Exponential cadence shrink, 1.0 outside rage
    pub fn rage_interval_factor(&self, minutes: f32) -> f32 {
        if !self.is_rage(minutes) {
            return 1.0;
        }
        self.rage_interval_shrink.powf(self.rage_minutes(minutes))
    }

    /// Multiplicative difficulty boost, 1.0 outside rage
    pub fn rage_difficulty_boost(&self, minutes: f32) -> f32 {
        1.0 + self.rage_minutes(minutes) * self.rage_difficulty_growth
    }

    /// Difficulty including the rage boost; what enemy stats scale from
    pub fn effective_difficulty(&self, minutes: f32, mode: GameMode) -> f32 {
        self.difficulty(minutes, mode) * self.rage_difficulty_boost(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_at_zero() {
        let d = DifficultyScalar::default();
        assert_eq!(d.difficulty(0.0, GameMode::Normal), 1.0);
        assert_eq!(d.difficulty(0.0, GameMode::Madness), 1.0);
    }

    #[test]
    fn test_difficulty_linear_growth() {
        let d = DifficultyScalar::default();
        assert!((d.difficulty(5.0, GameMode::Normal) - 1.4).abs() < 1e-6);
        assert!((d.difficulty(5.0, GameMode::Madness) - 1.6).abs() < 1e-6);
    }

    #[test]
    fn test_spawn_acceleration() {
        let d = DifficultyScalar::default();
        assert!((d.spawn_acceleration(10.0, GameMode::Normal) - 2.8).abs() < 1e-5);
        assert!((d.spawn_acceleration(10.0, GameMode::Madness) - 5.6).abs() < 1e-5);
    }

    #[test]
    fn test_rage_only_after_threshold() {
        let d = DifficultyScalar::default();
        assert_eq!(d.rage_interval_factor(9.99), 1.0);
        assert_eq!(d.rage_difficulty_boost(9.99), 1.0);
        assert!((d.rage_interval_factor(12.0) - 0.65f32.powi(2)).abs() < 1e-6);
        assert!((d.rage_difficulty_boost(12.0) - 1.9).abs() < 1e-6);
    }

    #[test]
    fn test_effective_difficulty_monotonic() {
        let d = DifficultyScalar::default();
        let mut prev = 0.0;
        for step in 0..200 {
            let minutes = step as f32 * 0.1;
            let value = d.effective_difficulty(minutes, GameMode::Normal);
            assert!(value > prev);
            prev = value;
        }
    }

    #[test]
    fn test_mode_from_name() {
        assert_eq!(GameMode::from_name("Madness"), Some(GameMode::Madness));
        assert_eq!(GameMode::from_name("normal"), Some(GameMode::Normal));
        assert_eq!(GameMode::from_name("easy"), None);
    }
}
