//! Player run state and stat accumulation.
//!
//! Effective stats combine three sources:
//! - permanent run bonus (upgrades drawn this run, class rewards)
//! - meta bonus (bought between runs, snapshotted at run start)
//! - temporary buffs (timed, overwrite on refresh)
//!
//! The state also owns HP, XP/level and gold. Methods return outcome values
//! instead of notifying anyone; the run session forwards them to the
//! presentation layer. Once the player has died every mutator is a no-op.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{DAMAGE_REDUCTION_CAP, LEVEL_UP_XP_GROWTH, MIN_HP_AFTER_SACRIFICE};
use crate::meta::MetaBonuses;
use crate::stats::{StatBlock, StatDimension, StatInterpretation};

pub mod buffs;
pub mod class;

pub use buffs::{TemporaryBuff, TemporaryBuffs};
pub use class::{ClassMilestone, PlayerClass};

/// Player tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Base value of every stat before bonuses
    pub base_stats: BTreeMap<StatDimension, f32>,
    /// XP needed for level 2
    pub base_xp_level1: f32,
    /// Growth of the initial XP curve per level
    pub xp_curve_growth: f32,
    pub starting_level: u32,
    pub starting_gold: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        use StatDimension::*;
        let base_stats = [
            (MaxHp, 100.0),
            (HpRegen, 0.2),
            (MoveSpeed, 6.0),
            (Damage, 10.0),
            (FireRate, 4.0),
            (ReloadSpeed, 1.5),
            (ProjectileCount, 1.0),
            (ProjectilePierce, 1.0),
            (RicochetBounces, 1.0),
            (Knockback, 1.0),
            (AoeRadius, 1.0),
            (XpGain, 1.0),
            (GoldGain, 1.0),
            (DamageReduction, 0.0),
            (Luck, 0.0),
            (PickupRange, 3.0),
            (CritChance, 0.0),
            (CritDamage, 1.5),
            (MagazineSize, 12.0),
            (ProjectileSpeed, 40.0),
        ]
        .into_iter()
        .collect();

        Self {
            base_stats,
            base_xp_level1: 60.0,
            xp_curve_growth: 1.15,
            starting_level: 1,
            starting_gold: 0,
        }
    }
}

impl PlayerTuning {
    pub fn base(&self, stat: StatDimension) -> f32 {
        self.base_stats.get(&stat).copied().unwrap_or(0.0)
    }

    /// `base_xp_level1 * growth^(level - 1)`
    pub fn required_xp_for(&self, level: u32) -> f32 {
        let exponent = level.saturating_sub(1) as i32;
        self.base_xp_level1 * self.xp_curve_growth.powi(exponent)
    }
}

/// Result of an XP gain
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XpGain {
    pub added: f32,
    pub levelled_up: bool,
    pub new_level: u32,
    pub milestone: Option<ClassMilestone>,
}

/// Result of incoming damage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageTaken {
    pub dealt: f32,
    pub current_hp: f32,
    /// True only on the hit that ended the run
    pub died: bool,
}

#[derive(Debug, Clone)]
pub struct PlayerRunState {
    base: StatBlock,
    class: PlayerClass,
    meta: MetaBonuses,
    run_bonus: StatBlock,
    buffs: TemporaryBuffs,
    current_hp: f32,
    max_hp: f32,
    current_xp: f32,
    required_xp: f32,
    level: u32,
    gold: u64,
    alive: bool,
}

impl PlayerRunState {
    pub fn new(tuning: &PlayerTuning, class: PlayerClass, meta: MetaBonuses) -> Self {
        let mut base = StatBlock::default();
        for stat in StatDimension::ALL {
            base.set(stat, tuning.base(stat));
        }
        let level = tuning.starting_level.max(1);

        let mut state = Self {
            base,
            class,
            meta,
            run_bonus: StatBlock::default(),
            buffs: TemporaryBuffs::default(),
            current_hp: 0.0,
            max_hp: 0.0,
            current_xp: 0.0,
            required_xp: tuning.required_xp_for(level),
            level,
            gold: tuning.starting_gold,
            alive: true,
        };
        state.max_hp = state.effective_value(StatDimension::MaxHp).max(1.0);
        state.current_hp = state.max_hp;
        state
    }

    // =====================================================
    // Stat queries
    // =====================================================

    pub fn run_bonus(&self, stat: StatDimension) -> f32 {
        self.run_bonus.get(stat)
    }

    pub fn effective_bonus(&self, stat: StatDimension) -> f32 {
        self.run_bonus.get(stat) + self.meta.get(stat) + self.buffs.active_bonus(stat)
    }

    /// Stat value after bonuses, using the player's own base value
    pub fn effective_value(&self, stat: StatDimension) -> f32 {
        Self::combine(stat, self.base.get(stat), self.effective_bonus(stat))
    }

    /// Stat value after bonuses for an arbitrary base
    pub fn effective_value_with_base(&self, stat: StatDimension, base: f32) -> f32 {
        Self::combine(stat, base, self.effective_bonus(stat))
    }

    pub(crate) fn combine(stat: StatDimension, base: f32, bonus: f32) -> f32 {
        match stat.interpretation() {
            StatInterpretation::Additive => base + bonus,
            StatInterpretation::Multiplicative => base * (1.0 + bonus),
        }
    }

    pub fn base_value(&self, stat: StatDimension) -> f32 {
        self.base.get(stat)
    }

    pub fn damage_reduction(&self) -> f32 {
        self.effective_bonus(StatDimension::DamageReduction)
            .clamp(0.0, DAMAGE_REDUCTION_CAP)
    }

    pub fn crit_chance(&self) -> f32 {
        self.effective_bonus(StatDimension::CritChance).clamp(0.0, 1.0)
    }

    pub fn luck(&self) -> f32 {
        self.effective_value(StatDimension::Luck)
    }

    pub fn is_stat_capped(&self, stat: StatDimension) -> bool {
        stat.is_at_cap(self.run_bonus.get(stat))
    }

    // =====================================================
    // Run state queries
    // =====================================================

    pub fn class(&self) -> PlayerClass {
        self.class
    }

    pub fn current_hp(&self) -> f32 {
        self.current_hp
    }

    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    pub fn current_xp(&self) -> f32 {
        self.current_xp
    }

    pub fn required_xp(&self) -> f32 {
        self.required_xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn gold(&self) -> u64 {
        self.gold
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn buffs(&self) -> &TemporaryBuffs {
        &self.buffs
    }

    // =====================================================
    // Mutations
    // =====================================================

    /// Add an upgrade's value to the run bonus, honoring stat caps
    pub fn apply_upgrade(&mut self, stat: StatDimension, value: f32) {
        if !self.alive {
            return;
        }
        let bonus = stat.clamp_run_bonus(self.run_bonus.get(stat) + value);
        self.run_bonus.set(stat, bonus);
        if stat == StatDimension::MaxHp {
            self.refresh_max_hp();
        }
    }

    /// Start (or refresh) a timed buff
    pub fn apply_buff(&mut self, stat: StatDimension, value: f32, duration: f32) {
        if !self.alive {
            return;
        }
        self.buffs.apply(stat, value, duration);
        if stat == StatDimension::MaxHp {
            self.refresh_max_hp();
        }
    }

    /// Recompute max HP and keep the current/max ratio
    fn refresh_max_hp(&mut self) {
        let old_max = self.max_hp;
        let new_max = self.effective_value(StatDimension::MaxHp).max(1.0);
        let ratio = if old_max > 0.0 {
            self.current_hp / old_max
        } else {
            1.0
        };
        self.max_hp = new_max;
        self.current_hp = (new_max * ratio).clamp(0.0, new_max);
    }

    /// Advance buff timers and regenerate HP; returns true if HP changed
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.alive || !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        let expired = self.buffs.tick(dt);
        let before = self.current_hp;
        if expired.contains(&StatDimension::MaxHp) {
            self.refresh_max_hp();
        }
        let regen = self.effective_value(StatDimension::HpRegen).max(0.0);
        if regen > 0.0 {
            self.current_hp = (self.current_hp + regen * dt).min(self.max_hp);
        }
        (self.current_hp - before).abs() > f32::EPSILON
    }

    /// Heal up to max HP; returns the amount restored
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.alive || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
        self.current_hp - before
    }

    /// Apply incoming damage after damage reduction
    pub fn take_damage(&mut self, amount: f32) -> DamageTaken {
        if !self.alive || amount <= 0.0 {
            return DamageTaken {
                dealt: 0.0,
                current_hp: self.current_hp,
                died: false,
            };
        }
        let final_damage = amount * (1.0 - self.damage_reduction());
        self.current_hp = (self.current_hp - final_damage).max(0.0);
        let died = self.current_hp <= 0.0;
        if died {
            self.alive = false;
        }
        DamageTaken {
            dealt: final_damage,
            current_hp: self.current_hp,
            died,
        }
    }

    /// Grant XP. At most one level is gained per call even when the gain
    /// would cross several thresholds; the surplus stays banked in
    /// `current_xp` for the next gain.
    pub fn add_xp(&mut self, amount: f32) -> XpGain {
        if !self.alive || amount <= 0.0 {
            return XpGain {
                new_level: self.level,
                ..Default::default()
            };
        }
        let added = amount * (1.0 + self.effective_bonus(StatDimension::XpGain));
        self.current_xp += added;

        let mut gain = XpGain {
            added,
            levelled_up: false,
            new_level: self.level,
            milestone: None,
        };
        if self.current_xp >= self.required_xp {
            self.gain_level(&mut gain);
        }
        gain
    }

    /// Fill the XP bar and take exactly one level (altar reward)
    pub fn grant_level(&mut self) -> XpGain {
        let mut gain = XpGain {
            new_level: self.level,
            ..Default::default()
        };
        if !self.alive {
            return gain;
        }
        gain.added = (self.required_xp - self.current_xp).max(0.0);
        self.current_xp = self.current_xp.max(self.required_xp);
        self.gain_level(&mut gain);
        gain
    }

    fn gain_level(&mut self, gain: &mut XpGain) {
        self.level += 1;
        let (stat, value) = self.class.passive();
        self.apply_upgrade(stat, value);
        if let Some(milestone) = self.class.milestone_at(self.level) {
            self.apply_upgrade(milestone.stat, milestone.value);
            gain.milestone = Some(milestone);
        }
        self.current_xp -= self.required_xp;
        self.required_xp *= LEVEL_UP_XP_GROWTH;
        gain.levelled_up = true;
        gain.new_level = self.level;
    }

    /// Earn (positive, scaled by GoldGain) or spend (negative, face value)
    /// gold; balance never drops below zero. Returns the applied delta.
    pub fn add_gold(&mut self, amount: i64) -> i64 {
        if !self.alive || amount == 0 {
            return 0;
        }
        let delta = if amount > 0 {
            (amount as f32 * (1.0 + self.effective_bonus(StatDimension::GoldGain))).round() as i64
        } else {
            amount
        };
        let before = self.gold as i64;
        let after = (before + delta).max(0);
        self.gold = after as u64;
        after - before
    }

    /// Spend gold only if the full price is affordable
    pub fn try_spend_gold(&mut self, price: u64) -> bool {
        if !self.alive || self.gold < price {
            return false;
        }
        self.gold -= price;
        true
    }

    /// Altar sacrifice of a fraction of current HP. Refused (returns 0)
    /// when the player would be left below 1 HP.
    pub fn sacrifice_hp(&mut self, fraction: f32) -> f32 {
        if !self.alive || fraction <= 0.0 {
            return 0.0;
        }
        let cost = self.current_hp * fraction;
        if self.current_hp - cost < MIN_HP_AFTER_SACRIFICE {
            return 0.0;
        }
        self.current_hp = (self.current_hp - cost).max(MIN_HP_AFTER_SACRIFICE);
        cost
    }
}
