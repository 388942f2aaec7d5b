//! Meta-progression (permanent, cross-run stat bonuses)
//!
//! The run core only READS purchased levels through [`MetaStore`]; raising a
//! level is the meta shop's job and happens between runs.
//!
//! - [`MetaProgressionTable`]: per-stat growth rate, level cap and shop cost curve
//! - [`MetaBonuses`]: snapshot of `level * rate` per stat, taken at run start
//! - [`InMemoryMetaStore`]: JSON-backed store used by the headless binary
//! - [`MetaShop`]: spends souls to raise a stat level

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::stats::{StatBlock, StatDimension};

#[derive(Debug, Error)]
pub enum MetaStoreError {
    #[error("meta save i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("meta save is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence collaborator for meta-progression
pub trait MetaStore: Send + Sync {
    fn stat_level(&self, stat: StatDimension) -> u32;
    fn increment_stat_level(&mut self, stat: StatDimension);
    fn souls(&self) -> u64;
    fn add_souls(&mut self, amount: u64);
    /// Returns false and leaves the balance untouched when short
    fn spend_souls(&mut self, amount: u64) -> bool;
    /// Called when the map-unlock boss dies
    fn record_map_unlock(&mut self) {}
}

/// Per-stat entry of the meta table
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetaStatRate {
    pub rate: f32,
    pub max_level: u32,
}

/// Meta-progression tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaProgressionTable {
    pub rates: BTreeMap<StatDimension, MetaStatRate>,
    pub base_cost: f32,
    pub cost_growth: f32,
}

impl Default for MetaProgressionTable {
    fn default() -> Self {
        let entries = [
            (StatDimension::MaxHp, 10.0, 10),
            (StatDimension::HpRegen, 0.10, 10),
            (StatDimension::MoveSpeed, 0.03, 10),
            (StatDimension::Damage, 0.05, 10),
            (StatDimension::FireRate, 0.04, 10),
            (StatDimension::ReloadSpeed, -0.02, 5),
            (StatDimension::XpGain, 0.05, 10),
            (StatDimension::GoldGain, 0.05, 10),
            (StatDimension::DamageReduction, 0.02, 10),
            (StatDimension::Luck, 0.02, 10),
            (StatDimension::PickupRange, 0.05, 10),
            (StatDimension::CritChance, 0.01, 10),
            (StatDimension::CritDamage, 0.05, 10),
        ];
        Self {
            rates: entries
                .into_iter()
                .map(|(stat, rate, max_level)| (stat, MetaStatRate { rate, max_level }))
                .collect(),
            base_cost: 50.0,
            cost_growth: 1.5,
        }
    }
}

impl MetaProgressionTable {
    pub fn rate(&self, stat: StatDimension) -> f32 {
        self.rates.get(&stat).map(|r| r.rate).unwrap_or(0.0)
    }

    pub fn max_level(&self, stat: StatDimension) -> u32 {
        self.rates.get(&stat).map(|r| r.max_level).unwrap_or(0)
    }

    /// Permanent bonus granted by `level` purchases of `stat`
    pub fn bonus(&self, stat: StatDimension, level: u32) -> f32 {
        level as f32 * self.rate(stat)
    }

    /// Shop label for the bonus at `level`, e.g. "+15%" or "+30 HP"
    pub fn format_bonus(&self, stat: StatDimension, level: u32) -> String {
        stat.format_value(self.bonus(stat, level))
    }

    /// Souls needed to buy the level after `current_level`
    pub fn upgrade_cost(&self, current_level: u32) -> u64 {
        (self.base_cost * self.cost_growth.powi(current_level as i32)).round() as u64
    }
}

/// Snapshot of permanent bonuses for one run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetaBonuses(StatBlock);

impl MetaBonuses {
    pub fn from_store(table: &MetaProgressionTable, store: &dyn MetaStore) -> Self {
        let mut block = StatBlock::default();
        for stat in StatDimension::ALL {
            let level = store.stat_level(stat).min(table.max_level(stat));
            block.set(stat, table.bonus(stat, level));
        }
        Self(block)
    }

    pub fn get(&self, stat: StatDimension) -> f32 {
        self.0.get(stat)
    }

    pub fn from_block(block: StatBlock) -> Self {
        Self(block)
    }
}

/// HashMap-style meta store with JSON persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryMetaStore {
    pub levels: BTreeMap<StatDimension, u32>,
    pub souls: u64,
    pub maps_unlocked: u32,
}

impl InMemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetaStoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Missing file yields a fresh profile
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, MetaStoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MetaStoreError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl MetaStore for InMemoryMetaStore {
    fn stat_level(&self, stat: StatDimension) -> u32 {
        self.levels.get(&stat).copied().unwrap_or(0)
    }

    fn increment_stat_level(&mut self, stat: StatDimension) {
        *self.levels.entry(stat).or_insert(0) += 1;
    }

    fn souls(&self) -> u64 {
        self.souls
    }

    fn add_souls(&mut self, amount: u64) {
        self.souls = self.souls.saturating_add(amount);
    }

    fn spend_souls(&mut self, amount: u64) -> bool {
        if self.souls < amount {
            return false;
        }
        self.souls -= amount;
        true
    }

    fn record_map_unlock(&mut self) {
        self.maps_unlocked += 1;
    }
}

/// Why a meta shop purchase did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseRefusal {
    NotPurchasable,
    MaxLevel,
    InsufficientSouls { cost: u64, souls: u64 },
}

/// Meta shop: the only writer of stat levels
pub struct MetaShop<'a> {
    table: &'a MetaProgressionTable,
}

impl<'a> MetaShop<'a> {
    pub fn new(table: &'a MetaProgressionTable) -> Self {
        Self { table }
    }

    /// Cost of the next level, `None` when the stat is maxed or not sold
    pub fn next_cost(&self, store: &dyn MetaStore, stat: StatDimension) -> Option<u64> {
        let max = self.table.max_level(stat);
        let level = store.stat_level(stat);
        if max == 0 || level >= max {
            return None;
        }
        Some(self.table.upgrade_cost(level))
    }

    /// Buy one level of `stat`; returns the new level
    pub fn purchase(
        &self,
        store: &mut dyn MetaStore,
        stat: StatDimension,
    ) -> Result<u32, PurchaseRefusal> {
        let max = self.table.max_level(stat);
        if max == 0 {
            return Err(PurchaseRefusal::NotPurchasable);
        }
        let level = store.stat_level(stat);
        if level >= max {
            return Err(PurchaseRefusal::MaxLevel);
        }
        let cost = self.table.upgrade_cost(level);
        if !store.spend_souls(cost) {
            return Err(PurchaseRefusal::InsufficientSouls {
                cost,
                souls: store.souls(),
            });
        }
        store.increment_stat_level(stat);
        tracing::info!(?stat, level = level + 1, cost, "meta level purchased");
        Ok(level + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonus_is_level_times_rate() {
        let table = MetaProgressionTable::default();
        assert!((table.bonus(StatDimension::Damage, 4) - 0.2).abs() < 1e-6);
        assert_eq!(table.bonus(StatDimension::MaxHp, 3), 30.0);
        assert_eq!(table.bonus(StatDimension::ProjectileCount, 5), 0.0);
    }

    #[test]
    fn test_format_bonus() {
        let table = MetaProgressionTable::default();
        assert_eq!(table.format_bonus(StatDimension::Damage, 3), "+15%");
        assert_eq!(table.format_bonus(StatDimension::MaxHp, 3), "+30 HP");
    }

    #[test]
    fn test_meta_bonuses_snapshot() {
        let table = MetaProgressionTable::default();
        let mut store = InMemoryMetaStore::new();
        store.increment_stat_level(StatDimension::Damage);
        store.increment_stat_level(StatDimension::Damage);
        let bonuses = MetaBonuses::from_store(&table, &store);
        assert!((bonuses.get(StatDimension::Damage) - 0.10).abs() < 1e-6);
        assert_eq!(bonuses.get(StatDimension::FireRate), 0.0);
    }

    #[test]
    fn test_levels_above_cap_are_ignored() {
        let table = MetaProgressionTable::default();
        let mut store = InMemoryMetaStore::new();
        store.levels.insert(StatDimension::ReloadSpeed, 50);
        let bonuses = MetaBonuses::from_store(&table, &store);
        assert!((bonuses.get(StatDimension::ReloadSpeed) + 0.10).abs() < 1e-6);
    }

    #[test]
    fn test_shop_purchase_flow() {
        let table = MetaProgressionTable::default();
        let shop = MetaShop::new(&table);
        let mut store = InMemoryMetaStore::new();

        assert_eq!(
            shop.purchase(&mut store, StatDimension::Damage),
            Err(PurchaseRefusal::InsufficientSouls { cost: 50, souls: 0 })
        );

        store.add_souls(200);
        assert_eq!(shop.purchase(&mut store, StatDimension::Damage), Ok(1));
        assert_eq!(store.souls(), 150);
        assert_eq!(shop.next_cost(&store, StatDimension::Damage), Some(75));
        assert_eq!(
            shop.purchase(&mut store, StatDimension::ProjectileCount),
            Err(PurchaseRefusal::NotPurchasable)
        );
    }

    #[test]
    fn test_shop_max_level() {
        let table = MetaProgressionTable::default();
        let shop = MetaShop::new(&table);
        let mut store = InMemoryMetaStore::new();
        store.levels.insert(StatDimension::ReloadSpeed, 5);
        store.add_souls(1_000_000);
        assert_eq!(shop.next_cost(&store, StatDimension::ReloadSpeed), None);
        assert_eq!(
            shop.purchase(&mut store, StatDimension::ReloadSpeed),
            Err(PurchaseRefusal::MaxLevel)
        );
    }

    #[test]
    fn test_store_json_roundtrip() {
        let mut store = InMemoryMetaStore::new();
        store.increment_stat_level(StatDimension::Luck);
        store.add_souls(42);
        store.record_map_unlock();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        store.save(&path).unwrap();

        let loaded = InMemoryMetaStore::load(&path).unwrap();
        assert_eq!(loaded.stat_level(StatDimension::Luck), 1);
        assert_eq!(loaded.souls(), 42);
        assert_eq!(loaded.maps_unlocked, 1);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryMetaStore::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.souls(), 0);
    }
}
