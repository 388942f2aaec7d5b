//! Player classes: a per-level passive plus fixed milestone rewards.

use serde::{Deserialize, Serialize};

use crate::constants::CLASS_MILESTONE_LEVELS;
use crate::stats::StatDimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum PlayerClass {
    #[default]
    Vanguard,
    Ranger,
    Juggernaut,
    Scavenger,
}

/// A fixed reward granted when the player reaches a milestone level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMilestone {
    pub level: u32,
    pub stat: StatDimension,
    pub value: f32,
}

impl PlayerClass {
    pub const ALL: [PlayerClass; 4] = [
        Self::Vanguard,
        Self::Ranger,
        Self::Juggernaut,
        Self::Scavenger,
    ];

    /// Class index as stored in saves (0-3); out of range falls back to 0
    pub fn from_index(index: u32) -> Self {
        match index {
            1 => Self::Ranger,
            2 => Self::Juggernaut,
            3 => Self::Scavenger,
            _ => Self::Vanguard,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            Self::Vanguard => 0,
            Self::Ranger => 1,
            Self::Juggernaut => 2,
            Self::Scavenger => 3,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vanguard => "Vanguard",
            Self::Ranger => "Ranger",
            Self::Juggernaut => "Juggernaut",
            Self::Scavenger => "Scavenger",
        }
    }

    /// Bonus applied on every level-up
    pub fn passive(&self) -> (StatDimension, f32) {
        match self {
            Self::Vanguard => (StatDimension::Damage, 0.01),
            Self::Ranger => (StatDimension::FireRate, 0.01),
            Self::Juggernaut => (StatDimension::MaxHp, 2.0),
            Self::Scavenger => (StatDimension::GoldGain, 0.01),
        }
    }

    /// Milestone rewards in level order
    fn milestone_rewards(&self) -> [(StatDimension, f32); 5] {
        use StatDimension::*;
        match self {
            Self::Vanguard => [
                (Damage, 0.10),
                (CritChance, 0.05),
                (Damage, 0.15),
                (CritDamage, 0.25),
                (Damage, 0.50),
            ],
            Self::Ranger => [
                (FireRate, 0.10),
                (ProjectileCount, 1.0),
                (ProjectileSpeed, 0.20),
                (ProjectilePierce, 1.0),
                (FireRate, 0.50),
            ],
            Self::Juggernaut => [
                (MaxHp, 20.0),
                (DamageReduction, 0.05),
                (HpRegen, 0.50),
                (MaxHp, 50.0),
                (DamageReduction, 0.10),
            ],
            Self::Scavenger => [
                (PickupRange, 0.20),
                (GoldGain, 0.15),
                (Luck, 0.10),
                (XpGain, 0.25),
                (Luck, 0.30),
            ],
        }
    }

    pub fn milestone_at(&self, level: u32) -> Option<ClassMilestone> {
        let slot = CLASS_MILESTONE_LEVELS.iter().position(|l| *l == level)?;
        let (stat, value) = self.milestone_rewards()[slot];
        Some(ClassMilestone { level, stat, value })
    }

    pub fn milestones(&self) -> Vec<ClassMilestone> {
        CLASS_MILESTONE_LEVELS
            .iter()
            .filter_map(|l| self.milestone_at(*l))
            .collect()
    }
}
