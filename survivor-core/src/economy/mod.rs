//! Run-scoped economy: kill and chest counters, the shared chest price
//! curve, chest pickups and the death-screen summary.
//!
//! The ledger is created at run start and passed by `&mut` to every chest
//! call site; `reset` puts it back to zero on restart.

use serde::{Deserialize, Serialize};

use crate::difficulty::GameMode;
use crate::enemy::EnemyArchetype;
use crate::player::{PlayerClass, PlayerRunState};

/// Economy tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTuning {
    pub chest_base_price: f32,
    pub chest_price_growth: f32,
    /// Share of current HP an altar takes
    pub altar_hp_cost: f32,
    /// Souls granted per soul pickup
    pub souls_per_pickup: u64,
    /// Seconds a magnet/rage special pickup buff lasts
    pub special_buff_duration: f32,
    pub rage_buff_damage: f32,
    pub magnet_buff_pickup_range: f32,
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            chest_base_price: 15.0,
            chest_price_growth: 1.25,
            altar_hp_cost: 0.10,
            souls_per_pickup: 1,
            special_buff_duration: 10.0,
            rage_buff_damage: 0.5,
            magnet_buff_pickup_range: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillCounts {
    pub normal: u32,
    pub elite: u32,
    pub boss: u32,
}

impl KillCounts {
    pub fn total(&self) -> u32 {
        self.normal + self.elite + self.boss
    }
}

/// Run counters feeding chest pricing and the run summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EconomyLedger {
    base_price: f32,
    price_growth: f32,
    kills: KillCounts,
    chests_opened: u32,
    souls_collected: u64,
    gold_earned: u64,
    gold_spent: u64,
    altars_used: u32,
    map_unlocked: bool,
}

impl EconomyLedger {
    pub fn new(tuning: &EconomyTuning) -> Self {
        Self {
            base_price: tuning.chest_base_price,
            price_growth: tuning.chest_price_growth,
            ..Default::default()
        }
    }

    /// Zero every counter; pricing parameters are kept
    pub fn reset(&mut self) {
        *self = Self {
            base_price: self.base_price,
            price_growth: self.price_growth,
            ..Default::default()
        };
    }

    /// `round(base * growth^chests_opened)`
    pub fn chest_price(&self) -> u64 {
        let price = self.base_price * self.price_growth.powi(self.chests_opened as i32);
        price.round().max(0.0) as u64
    }

    pub fn record_kill(&mut self, archetype: &EnemyArchetype) {
        if archetype.is_boss {
            self.kills.boss += 1;
        } else if archetype.is_elite {
            self.kills.elite += 1;
        } else {
            self.kills.normal += 1;
        }
        if archetype.is_map_unlock_boss {
            self.map_unlocked = true;
        }
    }

    pub fn record_chest_opened(&mut self, price_paid: u64) {
        self.chests_opened += 1;
        self.gold_spent += price_paid;
    }

    pub fn record_gold_earned(&mut self, amount: u64) {
        self.gold_earned += amount;
    }

    pub fn record_souls(&mut self, amount: u64) {
        self.souls_collected += amount;
    }

    pub fn record_altar(&mut self) {
        self.altars_used += 1;
    }

    pub fn kills(&self) -> KillCounts {
        self.kills
    }

    pub fn chests_opened(&self) -> u32 {
        self.chests_opened
    }

    pub fn souls_collected(&self) -> u64 {
        self.souls_collected
    }

    pub fn gold_earned(&self) -> u64 {
        self.gold_earned
    }

    pub fn gold_spent(&self) -> u64 {
        self.gold_spent
    }

    pub fn map_unlocked(&self) -> bool {
        self.map_unlocked
    }

    pub fn summary(&self, mode: GameMode, survived_seconds: f64, player: &PlayerRunState) -> RunSummary {
        RunSummary {
            mode,
            class: player.class(),
            survived_seconds,
            level: player.level(),
            kills: self.kills,
            chests_opened: self.chests_opened,
            altars_used: self.altars_used,
            souls_collected: self.souls_collected,
            gold_earned: self.gold_earned,
            gold_spent: self.gold_spent,
            final_gold: player.gold(),
            map_unlocked: self.map_unlocked,
        }
    }
}

/// Death-screen summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: GameMode,
    pub class: PlayerClass,
    pub survived_seconds: f64,
    pub level: u32,
    pub kills: KillCounts,
    pub chests_opened: u32,
    pub altars_used: u32,
    pub souls_collected: u64,
    pub gold_earned: u64,
    pub gold_spent: u64,
    pub final_gold: u64,
    pub map_unlocked: bool,
}

// ============================================================================
// Chests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestRefusal {
    /// No such chest, or the run is over
    Unavailable,
    /// Reveal animation has not finished
    NotReady,
    AlreadyOpened,
    CannotAfford { price: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChestOpened {
    pub price_paid: u64,
    pub guaranteed_legendary: bool,
}

/// A chest lying in the world.
///
/// Regular chests cost the ledger's current price. Boss chests are free
/// and always yield a legendary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestPickup {
    pub guaranteed_legendary: bool,
    ready: bool,
    opened: bool,
}

impl ChestPickup {
    pub fn new(guaranteed_legendary: bool) -> Self {
        Self {
            guaranteed_legendary,
            ready: false,
            opened: false,
        }
    }

    /// Called when the presentation layer finishes the reveal
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn price(&self, ledger: &EconomyLedger) -> u64 {
        if self.guaranteed_legendary {
            0
        } else {
            ledger.chest_price()
        }
    }

    pub fn try_open(
        &mut self,
        ledger: &mut EconomyLedger,
        player: &mut PlayerRunState,
    ) -> Result<ChestOpened, ChestRefusal> {
        if self.opened {
            return Err(ChestRefusal::AlreadyOpened);
        }
        if !self.ready {
            return Err(ChestRefusal::NotReady);
        }
        let price = self.price(ledger);
        if !player.try_spend_gold(price) {
            return Err(ChestRefusal::CannotAfford { price });
        }
        ledger.record_chest_opened(price);
        self.opened = true;
        Ok(ChestOpened {
            price_paid: price,
            guaranteed_legendary: self.guaranteed_legendary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaBonuses;
    use crate::player::PlayerTuning;

    fn player_with_gold(gold: i64) -> PlayerRunState {
        let mut p = PlayerRunState::new(
            &PlayerTuning::default(),
            PlayerClass::Scavenger,
            MetaBonuses::default(),
        );
        p.add_gold(gold);
        p
    }

    #[test]
    fn test_chest_price_curve() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        assert_eq!(ledger.chest_price(), 15);
        ledger.record_chest_opened(15);
        assert_eq!(ledger.chest_price(), 19);
        ledger.record_chest_opened(19);
        // round(15 * 1.25^2) = round(23.4375)
        assert_eq!(ledger.chest_price(), 23);
    }

    #[test]
    fn test_reset_clears_counters_keeps_curve() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        ledger.record_chest_opened(15);
        ledger.record_kill(&EnemyArchetype::grunt());
        ledger.record_souls(3);
        ledger.reset();
        assert_eq!(ledger.chests_opened(), 0);
        assert_eq!(ledger.kills().total(), 0);
        assert_eq!(ledger.souls_collected(), 0);
        assert_eq!(ledger.chest_price(), 15);
    }

    #[test]
    fn test_kill_classification() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        ledger.record_kill(&EnemyArchetype::grunt());
        ledger.record_kill(&EnemyArchetype::brute());
        let mut map_boss = EnemyArchetype::boss();
        map_boss.is_map_unlock_boss = true;
        ledger.record_kill(&map_boss);
        assert_eq!(
            ledger.kills(),
            KillCounts {
                normal: 1,
                elite: 1,
                boss: 1
            }
        );
        assert!(ledger.map_unlocked());
    }

    #[test]
    fn test_chest_waits_for_reveal() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        let mut player = player_with_gold(100);
        let mut chest = ChestPickup::new(false);
        assert_eq!(
            chest.try_open(&mut ledger, &mut player),
            Err(ChestRefusal::NotReady)
        );
        chest.mark_ready();
        let opened = chest.try_open(&mut ledger, &mut player);
        assert_eq!(
            opened,
            Ok(ChestOpened {
                price_paid: 15,
                guaranteed_legendary: false
            })
        );
        assert_eq!(player.gold(), 85);
        assert_eq!(
            chest.try_open(&mut ledger, &mut player),
            Err(ChestRefusal::AlreadyOpened)
        );
    }

    #[test]
    fn test_chest_refuses_when_broke() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        let mut player = player_with_gold(10);
        let mut chest = ChestPickup::new(false);
        chest.mark_ready();
        assert_eq!(
            chest.try_open(&mut ledger, &mut player),
            Err(ChestRefusal::CannotAfford { price: 15 })
        );
        assert_eq!(player.gold(), 10);
        assert_eq!(ledger.chests_opened(), 0);
    }

    #[test]
    fn test_boss_chest_is_free_but_counts() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        let mut player = player_with_gold(0);
        let mut chest = ChestPickup::new(true);
        chest.mark_ready();
        let opened = chest.try_open(&mut ledger, &mut player);
        assert_eq!(opened.map(|o| o.guaranteed_legendary), Ok(true));
        assert_eq!(ledger.chest_price(), 19);
    }

    #[test]
    fn test_summary_serializes() {
        let mut ledger = EconomyLedger::new(&EconomyTuning::default());
        ledger.record_gold_earned(42);
        let player = player_with_gold(0);
        let summary = ledger.summary(GameMode::Madness, 125.5, &player);
        let json = serde_json::to_string(&summary).unwrap_or_default();
        assert!(json.contains("\"mode\":\"Madness\""));
        assert!(json.contains("\"gold_earned\":42"));
    }
}
