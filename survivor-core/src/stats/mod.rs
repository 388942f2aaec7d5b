//! Stat catalog.
//!
//! The fixed set of upgradeable stat dimensions, how a raw bonus on each of
//! them is interpreted, and how values are rendered for display. These
//! mappings are plain `match` tables and never change at runtime.

use serde::{Deserialize, Serialize};

use crate::constants::{CRIT_CHANCE_BONUS_CEILING, RELOAD_SPEED_BONUS_FLOOR};

/// Upgradeable stat dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatDimension {
    MaxHp,
    HpRegen,
    MoveSpeed,
    Damage,
    FireRate,
    ReloadSpeed,
    ProjectileCount,
    ProjectilePierce,
    RicochetBounces,
    Knockback,
    AoeRadius,
    XpGain,
    GoldGain,
    DamageReduction,
    Luck,
    PickupRange,
    CritChance,
    CritDamage,
    MagazineSize,
    ProjectileSpeed,
}

/// How a bonus on a stat combines with the stat's base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatInterpretation {
    /// `base + bonus`
    Additive,
    /// `base * (1 + bonus)`
    Multiplicative,
}

/// How a stat value is rendered in upgrade cards and the meta shop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFormat {
    Percent,
    Flat,
    FlatWithUnit(&'static str),
}

impl StatDimension {
    pub const ALL: [StatDimension; 20] = [
        Self::MaxHp,
        Self::HpRegen,
        Self::MoveSpeed,
        Self::Damage,
        Self::FireRate,
        Self::ReloadSpeed,
        Self::ProjectileCount,
        Self::ProjectilePierce,
        Self::RicochetBounces,
        Self::Knockback,
        Self::AoeRadius,
        Self::XpGain,
        Self::GoldGain,
        Self::DamageReduction,
        Self::Luck,
        Self::PickupRange,
        Self::CritChance,
        Self::CritDamage,
        Self::MagazineSize,
        Self::ProjectileSpeed,
    ];

    /// Dense index, stable for the lifetime of the enum
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MaxHp => "Max HP",
            Self::HpRegen => "HP Regen",
            Self::MoveSpeed => "Move Speed",
            Self::Damage => "Damage",
            Self::FireRate => "Fire Rate",
            Self::ReloadSpeed => "Reload Speed",
            Self::ProjectileCount => "Projectiles",
            Self::ProjectilePierce => "Pierce",
            Self::RicochetBounces => "Ricochet",
            Self::Knockback => "Knockback",
            Self::AoeRadius => "Area",
            Self::XpGain => "XP Gain",
            Self::GoldGain => "Gold Gain",
            Self::DamageReduction => "Armor",
            Self::Luck => "Luck",
            Self::PickupRange => "Pickup Range",
            Self::CritChance => "Crit Chance",
            Self::CritDamage => "Crit Damage",
            Self::MagazineSize => "Magazine",
            Self::ProjectileSpeed => "Projectile Speed",
        }
    }

    pub fn interpretation(&self) -> StatInterpretation {
        match self {
            Self::MaxHp | Self::Luck => StatInterpretation::Additive,
            _ => StatInterpretation::Multiplicative,
        }
    }

    pub fn display_format(&self) -> DisplayFormat {
        match self {
            Self::MaxHp => DisplayFormat::FlatWithUnit("HP"),
            Self::ProjectileCount | Self::ProjectilePierce | Self::RicochetBounces => {
                DisplayFormat::Flat
            }
            Self::Luck => DisplayFormat::Flat,
            _ => DisplayFormat::Percent,
        }
    }

    /// Render a raw bonus value the way upgrade cards show it
    pub fn format_value(&self, value: f32) -> String {
        match self.display_format() {
            DisplayFormat::Percent => format!("{:+.0}%", value * 100.0),
            DisplayFormat::Flat => {
                if value.fract().abs() < f32::EPSILON {
                    format!("{:+.0}", value)
                } else {
                    format!("{:+.2}", value)
                }
            }
            DisplayFormat::FlatWithUnit(unit) => format!("{:+.0} {}", value, unit),
        }
    }

    /// Clamp an accumulated run bonus into the stat's hard cap, if it has one
    pub fn clamp_run_bonus(&self, bonus: f32) -> f32 {
        match self {
            Self::ReloadSpeed => bonus.max(RELOAD_SPEED_BONUS_FLOOR),
            Self::CritChance => bonus.min(CRIT_CHANCE_BONUS_CEILING),
            _ => bonus,
        }
    }

    /// Whether the run bonus has reached the stat's hard cap
    pub fn is_at_cap(&self, bonus: f32) -> bool {
        match self {
            Self::ReloadSpeed => bonus <= RELOAD_SPEED_BONUS_FLOOR,
            Self::CritChance => bonus >= CRIT_CHANCE_BONUS_CEILING,
            _ => false,
        }
    }
}

/// One f32 slot per stat dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBlock([f32; 20]);

impl Default for StatBlock {
    fn default() -> Self {
        Self([0.0; 20])
    }
}

impl StatBlock {
    pub fn get(&self, stat: StatDimension) -> f32 {
        self.0[stat.index()]
    }

    pub fn set(&mut self, stat: StatDimension, value: f32) {
        self.0[stat.index()] = value;
    }

    pub fn add(&mut self, stat: StatDimension, value: f32) {
        self.0[stat.index()] += value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatDimension, f32)> + '_ {
        StatDimension::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}
