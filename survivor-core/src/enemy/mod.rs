//! Enemy archetypes and stat resolution.
//!
//! Stats are computed once at spawn from the difficulty scalar and archetype
//! flags:
//! - HP / damage grow exponentially with minutes (damage capped before the
//!   difficulty multiplier), then boss/elite multipliers apply
//! - move speed ramps with time, rage mode and difficulty
//! - payout (XP, gold) and death drop rolls

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::collab::InstanceHandle;
use crate::difficulty::{DifficultyScalar, GameMode};
use crate::rng;

/// Enemy class; doubles as the pool tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArchetypeKind {
    Grunt,
    Brute,
    Runner,
    Boss,
}

impl ArchetypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grunt => "grunt",
            Self::Brute => "brute",
            Self::Runner => "runner",
            Self::Boss => "boss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyArchetype {
    pub kind: ArchetypeKind,
    pub base_hp: f32,
    pub base_damage: f32,
    pub base_move_speed: f32,
    /// Relative weight in the regular spawn draw; bosses use 0
    pub spawn_weight: f32,
    pub is_boss: bool,
    pub is_elite: bool,
    pub is_map_unlock_boss: bool,
}

impl EnemyArchetype {
    pub fn grunt() -> Self {
        Self {
            kind: ArchetypeKind::Grunt,
            base_hp: 40.0,
            base_damage: 8.0,
            base_move_speed: 3.5,
            spawn_weight: 0.8,
            is_boss: false,
            is_elite: false,
            is_map_unlock_boss: false,
        }
    }

    pub fn brute() -> Self {
        Self {
            kind: ArchetypeKind::Brute,
            base_move_speed: 2.5,
            spawn_weight: 0.15,
            is_elite: true,
            ..Self::grunt()
        }
    }

    pub fn runner() -> Self {
        Self {
            kind: ArchetypeKind::Runner,
            base_move_speed: 6.0,
            spawn_weight: 0.5,
            ..Self::grunt()
        }
    }

    pub fn boss() -> Self {
        Self {
            kind: ArchetypeKind::Boss,
            base_move_speed: 3.0,
            spawn_weight: 0.0,
            is_boss: true,
            ..Self::grunt()
        }
    }

    /// Regular roster in draw order
    pub fn standard_roster() -> Vec<Self> {
        vec![Self::grunt(), Self::brute(), Self::runner()]
    }
}

/// Enemy scaling tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyScaling {
    pub hp_growth: f32,
    pub damage_growth: f32,
    /// Cap on time-grown damage, applied before the difficulty multiplier
    pub damage_cap: f32,
    pub boss_hp_mult: f32,
    pub boss_damage_mult: f32,
    pub elite_hp_mult: f32,
    pub elite_damage_mult: f32,
    pub speed_growth_per_minute: f32,
    pub rage_speed_mult: f32,
    /// Minutes of rage over which speed ramps to `rage_speed_mult`
    pub rage_speed_ramp_minutes: f32,
    pub difficulty_speed_mult: f32,
    pub base_xp: f32,
    pub xp_growth: f32,
    pub xp_linear_growth: f32,
    pub boss_xp_mult: f32,
    pub elite_xp_mult: f32,
    pub madness_xp_mult: f32,
    pub base_gold: u32,
    pub elite_gold_bonus: u32,
    pub boss_gold_bonus: u32,
    pub soul_drop_chance: f32,
    pub chest_drop_chance: f32,
    pub special_drop_chance: f32,
}

impl Default for EnemyScaling {
    fn default() -> Self {
        Self {
            hp_growth: 1.24,
            damage_growth: 1.16,
            damage_cap: 80.0,
            boss_hp_mult: 15.0,
            boss_damage_mult: 3.0,
            elite_hp_mult: 4.0,
            elite_damage_mult: 1.8,
            speed_growth_per_minute: 0.05,
            rage_speed_mult: 2.5,
            rage_speed_ramp_minutes: 5.0,
            difficulty_speed_mult: 1.25,
            base_xp: 16.0,
            xp_growth: 1.08,
            xp_linear_growth: 0.1,
            boss_xp_mult: 12.0,
            elite_xp_mult: 4.0,
            madness_xp_mult: 1.5,
            base_gold: 1,
            elite_gold_bonus: 2,
            boss_gold_bonus: 10,
            soul_drop_chance: 0.04,
            chest_drop_chance: 0.035,
            special_drop_chance: 0.01,
        }
    }
}

/// Combat stats fixed at spawn time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub max_hp: f32,
    pub damage: f32,
    pub move_speed: f32,
}

/// Rewards for killing an enemy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub xp: f32,
    pub gold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialPickup {
    Magnet,
    Rage,
}

/// Chest left behind by a dead enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestDrop {
    pub guaranteed_legendary: bool,
}

/// Outcome of the independent death drop rolls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRoll {
    pub soul: bool,
    pub chest: Option<ChestDrop>,
    pub special: Option<SpecialPickup>,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Computes spawn stats, payouts and drops
#[derive(Debug, Clone, Copy)]
pub struct EnemyStatResolver<'a> {
    scaling: &'a EnemyScaling,
    difficulty: &'a DifficultyScalar,
}

impl<'a> EnemyStatResolver<'a> {
    pub fn new(scaling: &'a EnemyScaling, difficulty: &'a DifficultyScalar) -> Self {
        Self {
            scaling,
            difficulty,
        }
    }

    /// HP before boss/elite multipliers
    pub fn normal_hp(&self, archetype: &EnemyArchetype, difficulty: f32, minutes: f32) -> f32 {
        let dm = difficulty.max(1.0);
        archetype.base_hp * self.scaling.hp_growth.powf(minutes.max(0.0)) * dm
    }

    /// Damage before boss/elite multipliers; growth capped before `dm`
    pub fn normal_damage(&self, archetype: &EnemyArchetype, difficulty: f32, minutes: f32) -> f32 {
        let dm = difficulty.max(1.0);
        let grown = archetype.base_damage * self.scaling.damage_growth.powf(minutes.max(0.0));
        grown.min(self.scaling.damage_cap) * dm
    }

    pub fn move_speed(&self, archetype: &EnemyArchetype, difficulty: f32, minutes: f32) -> f32 {
        let dm = difficulty.max(1.0);
        let minutes = minutes.max(0.0);
        let ramp = self.scaling.rage_speed_ramp_minutes.max(f32::EPSILON);
        let rage_t = (minutes - self.difficulty.rage_start_minutes) / ramp;
        archetype.base_move_speed
            * (1.0 + minutes * self.scaling.speed_growth_per_minute)
            * lerp(1.0, self.scaling.rage_speed_mult, rage_t)
            * lerp(1.0, self.scaling.difficulty_speed_mult, dm - 1.0)
    }

    /// Full spawn stats; flags must be final before calling
    pub fn resolve(&self, archetype: &EnemyArchetype, difficulty: f32, minutes: f32) -> EnemyStats {
        let mut max_hp = self.normal_hp(archetype, difficulty, minutes);
        let mut damage = self.normal_damage(archetype, difficulty, minutes);
        if archetype.is_boss {
            max_hp *= self.scaling.boss_hp_mult;
            damage *= self.scaling.boss_damage_mult;
        } else if archetype.is_elite {
            max_hp *= self.scaling.elite_hp_mult;
            damage *= self.scaling.elite_damage_mult;
        }
        EnemyStats {
            max_hp,
            damage,
            move_speed: self.move_speed(archetype, difficulty, minutes),
        }
    }

    pub fn payout(&self, archetype: &EnemyArchetype, minutes: f32, mode: GameMode) -> Payout {
        let minutes = minutes.max(0.0);
        let mut xp = self.scaling.base_xp
            * self.scaling.xp_growth.powf(minutes)
            * (1.0 + minutes * self.scaling.xp_linear_growth);
        if archetype.is_boss {
            xp *= self.scaling.boss_xp_mult;
        } else if archetype.is_elite {
            xp *= self.scaling.elite_xp_mult;
        }
        if mode == GameMode::Madness {
            xp *= self.scaling.madness_xp_mult;
        }

        let mut gold = self.scaling.base_gold;
        if archetype.is_elite {
            gold += self.scaling.elite_gold_bonus;
        }
        if archetype.is_boss {
            gold += self.scaling.boss_gold_bonus;
        }
        Payout { xp, gold }
    }

    /// Independent soul / chest / special rolls for one death
    pub fn roll_drops<R: Rng + ?Sized>(&self, archetype: &EnemyArchetype, rng: &mut R) -> DropRoll {
        let soul = rng::chance(rng, self.scaling.soul_drop_chance);
        let chest = if archetype.is_boss || rng::chance(rng, self.scaling.chest_drop_chance) {
            Some(ChestDrop {
                guaranteed_legendary: archetype.is_boss,
            })
        } else {
            None
        };
        let special = if rng::chance(rng, self.scaling.special_drop_chance) {
            if rng.gen_bool(0.5) {
                Some(SpecialPickup::Magnet)
            } else {
                Some(SpecialPickup::Rage)
            }
        } else {
            None
        };
        DropRoll {
            soul,
            chest,
            special,
        }
    }
}

/// A live enemy tracked by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyInstance {
    pub handle: InstanceHandle,
    pub archetype: EnemyArchetype,
    pub current_hp: f32,
    pub max_hp: f32,
    pub damage: f32,
    pub move_speed: f32,
    /// Difficulty the stats were resolved with
    pub difficulty: f32,
    pub spawned_at_minutes: f32,
}

impl EnemyInstance {
    pub fn new(
        handle: InstanceHandle,
        archetype: EnemyArchetype,
        stats: EnemyStats,
        difficulty: f32,
        minutes: f32,
    ) -> Self {
        Self {
            handle,
            archetype,
            current_hp: stats.max_hp,
            max_hp: stats.max_hp,
            damage: stats.damage,
            move_speed: stats.move_speed,
            difficulty,
            spawned_at_minutes: minutes,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current_hp <= 0.0
    }

    /// Returns the damage actually absorbed
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        if self.is_dead() || amount <= 0.0 {
            return 0.0;
        }
        let dealt = amount.min(self.current_hp);
        self.current_hp -= dealt;
        dealt
    }

    /// Re-resolve boss HP from its stored difficulty, keeping the HP ratio
    pub fn recalculate_boss_hp(&mut self, resolver: &EnemyStatResolver, minutes: f32) {
        if !self.archetype.is_boss {
            return;
        }
        let ratio = if self.max_hp > 0.0 {
            self.current_hp / self.max_hp
        } else {
            1.0
        };
        let stats = resolver.resolve(&self.archetype, self.difficulty, minutes);
        self.max_hp = stats.max_hp;
        self.current_hp = stats.max_hp * ratio;
    }
}
