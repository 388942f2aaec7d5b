//! Upgrade catalogs and the level-up / chest draw.
//!
//! A draw filters out definitions whose stat is already at its hard cap,
//! picks unique entries by bounded rejection sampling, then rolls a rarity
//! per slot independently. Chest draws use their own catalog and may force
//! Legendary, skipping the rarity roll.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::UPGRADE_DRAW_ATTEMPT_FACTOR;
use crate::player::PlayerRunState;
use crate::stats::StatDimension;

pub mod preview;
pub mod rarity;

pub use preview::{preview, UpgradePreview};
pub use rarity::{Rarity, RarityTable};

/// Static upgrade definition; magnitudes are indexed by rarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    pub stat: StatDimension,
    pub name: String,
    /// `{value}` is replaced with the formatted magnitude
    pub description_template: String,
    pub values: [f32; 4],
}

impl UpgradeDefinition {
    pub fn new(stat: StatDimension, name: &str, template: &str, values: [f32; 4]) -> Self {
        Self {
            stat,
            name: name.to_string(),
            description_template: template.to_string(),
            values,
        }
    }

    pub fn magnitude(&self, rarity: Rarity) -> f32 {
        self.values[rarity.index()]
    }

    pub fn describe(&self, rarity: Rarity) -> String {
        self.description_template
            .replace("{value}", &self.stat.format_value(self.magnitude(rarity)))
    }
}

/// A read-only list of upgrade definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradeCatalog {
    pub definitions: Vec<UpgradeDefinition>,
}

impl UpgradeCatalog {
    pub fn new(definitions: Vec<UpgradeDefinition>) -> Self {
        Self { definitions }
    }

    /// Level-up catalog, one entry per stat
    pub fn standard() -> Self {
        use StatDimension::*;
        let defs = vec![
            UpgradeDefinition::new(MaxHp, "Vitality", "Max HP {value}", [10.0, 20.0, 35.0, 60.0]),
            UpgradeDefinition::new(HpRegen, "Recovery", "HP regeneration {value}", [0.10, 0.20, 0.35, 0.60]),
            UpgradeDefinition::new(MoveSpeed, "Swiftness", "Move speed {value}", [0.05, 0.08, 0.12, 0.20]),
            UpgradeDefinition::new(Damage, "Power", "Damage {value}", [0.08, 0.15, 0.25, 0.40]),
            UpgradeDefinition::new(FireRate, "Trigger Finger", "Fire rate {value}", [0.08, 0.14, 0.22, 0.35]),
            UpgradeDefinition::new(ReloadSpeed, "Quick Hands", "Reload time {value}", [-0.03, -0.05, -0.08, -0.12]),
            UpgradeDefinition::new(ProjectileCount, "Multishot", "Projectiles {value}", [1.0, 1.0, 2.0, 3.0]),
            UpgradeDefinition::new(ProjectilePierce, "Piercing Rounds", "Pierce {value}", [1.0, 1.0, 2.0, 3.0]),
            UpgradeDefinition::new(RicochetBounces, "Ricochet", "Bounces {value}", [1.0, 1.0, 2.0, 3.0]),
            UpgradeDefinition::new(Knockback, "Impact", "Knockback {value}", [0.10, 0.20, 0.30, 0.50]),
            UpgradeDefinition::new(AoeRadius, "Blast Radius", "Area {value}", [0.08, 0.15, 0.25, 0.40]),
            UpgradeDefinition::new(XpGain, "Insight", "XP gain {value}", [0.08, 0.15, 0.25, 0.40]),
            UpgradeDefinition::new(GoldGain, "Greed", "Gold gain {value}", [0.10, 0.20, 0.30, 0.50]),
            UpgradeDefinition::new(DamageReduction, "Plating", "Damage reduction {value}", [0.02, 0.04, 0.06, 0.10]),
            UpgradeDefinition::new(Luck, "Four Leaf", "Luck {value}", [0.05, 0.10, 0.20, 0.30]),
            UpgradeDefinition::new(PickupRange, "Magnetism", "Pickup range {value}", [0.10, 0.20, 0.30, 0.50]),
            UpgradeDefinition::new(CritChance, "Precision", "Crit chance {value}", [0.03, 0.05, 0.08, 0.12]),
            UpgradeDefinition::new(CritDamage, "Lethality", "Crit damage {value}", [0.10, 0.20, 0.35, 0.60]),
            UpgradeDefinition::new(MagazineSize, "Extended Mag", "Magazine {value}", [0.10, 0.20, 0.30, 0.50]),
            UpgradeDefinition::new(ProjectileSpeed, "Velocity", "Projectile speed {value}", [0.08, 0.15, 0.25, 0.40]),
        ];
        Self::new(defs)
    }

    /// Chest items: fewer, stronger entries
    pub fn chest_items() -> Self {
        use StatDimension::*;
        let defs = vec![
            UpgradeDefinition::new(Damage, "Cursed Idol", "Damage {value}", [0.15, 0.25, 0.40, 0.75]),
            UpgradeDefinition::new(FireRate, "Overclock Chip", "Fire rate {value}", [0.12, 0.20, 0.35, 0.60]),
            UpgradeDefinition::new(MaxHp, "Troll Heart", "Max HP {value}", [20.0, 40.0, 70.0, 120.0]),
            UpgradeDefinition::new(CritChance, "Sniper Scope", "Crit chance {value}", [0.05, 0.08, 0.12, 0.20]),
            UpgradeDefinition::new(CritDamage, "Executioner's Mark", "Crit damage {value}", [0.20, 0.35, 0.60, 1.00]),
            UpgradeDefinition::new(ProjectileCount, "Split Barrel", "Projectiles {value}", [1.0, 2.0, 2.0, 4.0]),
            UpgradeDefinition::new(GoldGain, "Golden Tooth", "Gold gain {value}", [0.20, 0.35, 0.50, 1.00]),
            UpgradeDefinition::new(MoveSpeed, "Feather Boots", "Move speed {value}", [0.08, 0.12, 0.20, 0.35]),
        ];
        Self::new(defs)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// One card offered to the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeOffer {
    pub stat: StatDimension,
    pub name: String,
    pub rarity: Rarity,
    pub value: f32,
    pub description: String,
    pub preview: UpgradePreview,
}

impl UpgradeOffer {
    fn build(def: &UpgradeDefinition, rarity: Rarity, player: &PlayerRunState) -> Self {
        let value = def.magnitude(rarity);
        Self {
            stat: def.stat,
            name: def.name.clone(),
            rarity,
            value,
            description: def.describe(rarity),
            preview: preview(player, def.stat, value),
        }
    }
}

/// Draws offers from a catalog for a given player
pub struct UpgradeSelector<'a> {
    catalog: &'a UpgradeCatalog,
    rarity: &'a RarityTable,
}

impl<'a> UpgradeSelector<'a> {
    pub fn new(catalog: &'a UpgradeCatalog, rarity: &'a RarityTable) -> Self {
        Self { catalog, rarity }
    }

    /// Catalog indices whose stat is not capped for this player
    pub fn valid_pool(&self, player: &PlayerRunState) -> Vec<usize> {
        self.catalog
            .definitions
            .iter()
            .enumerate()
            .filter(|(_, def)| !player.is_stat_capped(def.stat))
            .map(|(i, _)| i)
            .collect()
    }

    /// Up to `count` unique offers, rarity rolled per slot from player luck
    pub fn draw<R: Rng + ?Sized>(
        &self,
        player: &PlayerRunState,
        count: usize,
        rng: &mut R,
    ) -> Vec<UpgradeOffer> {
        self.draw_inner(player, count, None, rng)
    }

    /// Single chest item; `force_legendary` skips the rarity roll
    pub fn draw_chest_item<R: Rng + ?Sized>(
        &self,
        player: &PlayerRunState,
        force_legendary: bool,
        rng: &mut R,
    ) -> Option<UpgradeOffer> {
        let forced = force_legendary.then_some(Rarity::Legendary);
        self.draw_inner(player, 1, forced, rng).into_iter().next()
    }

    fn draw_inner<R: Rng + ?Sized>(
        &self,
        player: &PlayerRunState,
        count: usize,
        forced_rarity: Option<Rarity>,
        rng: &mut R,
    ) -> Vec<UpgradeOffer> {
        let pool = self.valid_pool(player);
        if pool.is_empty() || count == 0 {
            return Vec::new();
        }
        let target = count.min(pool.len());
        let mut picked: Vec<usize> = Vec::with_capacity(target);
        let mut attempts = UPGRADE_DRAW_ATTEMPT_FACTOR * pool.len();

        while picked.len() < target && attempts > 0 {
            attempts -= 1;
            let candidate = pool[rng.gen_range(0..pool.len())];
            if !self.is_fresh(&picked, candidate) {
                continue;
            }
            picked.push(candidate);
        }
        // Rejection budget ran out: sweep the pool in order
        if picked.len() < target {
            for &candidate in &pool {
                if picked.len() >= target {
                    break;
                }
                if self.is_fresh(&picked, candidate) {
                    picked.push(candidate);
                }
            }
        }

        let luck = player.luck();
        picked
            .into_iter()
            .map(|index| {
                let def = &self.catalog.definitions[index];
                let rarity = forced_rarity.unwrap_or_else(|| self.rarity.roll(luck, rng));
                UpgradeOffer::build(def, rarity, player)
            })
            .collect()
    }

    /// Not already picked, and no picked entry shares its stat
    fn is_fresh(&self, picked: &[usize], candidate: usize) -> bool {
        let stat = self.catalog.definitions[candidate].stat;
        !picked
            .iter()
            .any(|&p| p == candidate || self.catalog.definitions[p].stat == stat)
    }
}
