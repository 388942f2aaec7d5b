//! One run of the game, from spawn to death screen.
//!
//! `RunSession` owns every piece of run state (clock, scheduler, player,
//! ledger, RNG) and the injected collaborators. The host drives it with
//! `tick` and reports what happened in the world: kills, hits on the
//! player, pickups, chest and altar interactions, upgrade choices.
//!
//! Calls that arrive after the run has ended are accepted and ignored.

use std::collections::BTreeMap;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::RunClock;
use crate::collab::{EnemyPool, InstanceHandle, NullPresentation, PlayableBounds, Presentation, SimplePool};
use crate::config::BalanceConfig;
use crate::constants::DEFAULT_UPGRADE_CHOICES;
use crate::difficulty::GameMode;
use crate::economy::{ChestPickup, ChestRefusal, EconomyLedger, RunSummary};
use crate::enemy::{DropRoll, EnemyStatResolver, Payout, SpecialPickup};
use crate::meta::{InMemoryMetaStore, MetaBonuses, MetaStore};
use crate::player::{DamageTaken, PlayerClass, PlayerRunState, XpGain};
use crate::rng::{seeded, SimRng};
use crate::spawn::{EnemyHit, SpawnContext, SpawnScheduler, SpawnTickReport};
use crate::stats::StatDimension;
use crate::upgrades::{UpgradeOffer, UpgradeSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Playing,
    /// Level-up screen is open; the clock is frozen
    ChoosingUpgrade,
    Ended,
}

/// Per-run choices made before the run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSettings {
    pub mode: GameMode,
    pub class: PlayerClass,
    pub seed: u64,
}

/// Collaborators injected at construction
pub struct RunCollaborators {
    pub pool: Box<dyn EnemyPool>,
    /// `None` treats every position as playable on flat ground
    pub bounds: Option<Box<dyn PlayableBounds>>,
    pub presentation: Box<dyn Presentation>,
    /// `None` runs without meta bonuses and drops collected souls
    pub meta: Option<Box<dyn MetaStore>>,
}

impl RunCollaborators {
    /// Standard pool, open field, no presentation, throwaway meta store
    pub fn headless() -> Self {
        Self {
            pool: Box::new(SimplePool::standard()),
            bounds: None,
            presentation: Box::new(NullPresentation),
            meta: Some(Box::new(InMemoryMetaStore::new())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChestId(pub u64);

/// Everything a kill paid out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillReward {
    pub payout: Payout,
    /// Gold actually added after GoldGain
    pub gold_gained: i64,
    pub xp: XpGain,
    pub drops: DropRoll,
    pub chest: Option<ChestId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub hit: EnemyHit,
    pub kill: Option<KillReward>,
}

#[derive(Debug, Clone)]
pub struct ChestReward {
    pub price_paid: u64,
    pub item: Option<UpgradeOffer>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AltarOutcome {
    Refused,
    Sacrificed { hp_cost: f32, new_level: u32 },
}

pub struct RunSession {
    config: BalanceConfig,
    settings: RunSettings,
    collab: RunCollaborators,
    clock: RunClock,
    scheduler: SpawnScheduler,
    player: PlayerRunState,
    ledger: EconomyLedger,
    rng: SimRng,
    phase: RunPhase,
    user_paused: bool,
    offers: Vec<UpgradeOffer>,
    pending_level_ups: u32,
    chests: BTreeMap<ChestId, ChestPickup>,
    next_chest: u64,
    player_position: Vec3,
    summary: Option<RunSummary>,
}

impl RunSession {
    pub fn new(config: BalanceConfig, settings: RunSettings, collab: RunCollaborators) -> Self {
        let player = Self::fresh_player(&config, &settings, &collab);
        let mut scheduler = SpawnScheduler::new(config.spawn.clone());
        scheduler.start();
        let ledger = EconomyLedger::new(&config.economy);
        info!(
            mode = ?settings.mode,
            class = settings.class.display_name(),
            seed = settings.seed,
            "run started"
        );
        Self {
            rng: seeded(settings.seed),
            config,
            settings,
            collab,
            clock: RunClock::new(),
            scheduler,
            player,
            ledger,
            phase: RunPhase::Playing,
            user_paused: false,
            offers: Vec::new(),
            pending_level_ups: 0,
            chests: BTreeMap::new(),
            next_chest: 0,
            player_position: Vec3::ZERO,
            summary: None,
        }
    }

    fn fresh_player(
        config: &BalanceConfig,
        settings: &RunSettings,
        collab: &RunCollaborators,
    ) -> PlayerRunState {
        let meta = collab
            .meta
            .as_deref()
            .map(|store| MetaBonuses::from_store(&config.meta, store))
            .unwrap_or_default();
        PlayerRunState::new(&config.player, settings.class, meta)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    pub fn settings(&self) -> RunSettings {
        self.settings
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn player(&self) -> &PlayerRunState {
        &self.player
    }

    pub fn ledger(&self) -> &EconomyLedger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    pub fn pool(&self) -> &dyn EnemyPool {
        self.collab.pool.as_ref()
    }

    pub fn meta_store(&self) -> Option<&dyn MetaStore> {
        self.collab.meta.as_deref()
    }

    pub fn minutes(&self) -> f32 {
        self.clock.minutes()
    }

    /// Difficulty regular spawns currently resolve with
    pub fn difficulty(&self) -> f32 {
        self.config
            .difficulty
            .effective_difficulty(self.minutes(), self.settings.mode)
    }

    pub fn offers(&self) -> &[UpgradeOffer] {
        &self.offers
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn chest(&self, id: ChestId) -> Option<&ChestPickup> {
        self.chests.get(&id)
    }

    pub fn chest_price(&self, id: ChestId) -> Option<u64> {
        self.chests.get(&id).map(|c| c.price(&self.ledger))
    }

    pub fn set_player_position(&mut self, position: Vec3) {
        self.player_position = position;
    }

    // ========================================================================
    // Time
    // ========================================================================

    pub fn pause(&mut self) {
        self.user_paused = true;
        self.sync_clock();
    }

    pub fn resume(&mut self) {
        self.user_paused = false;
        self.sync_clock();
    }

    fn sync_clock(&mut self) {
        if self.user_paused || self.phase != RunPhase::Playing {
            self.clock.pause();
        } else {
            self.clock.resume();
        }
    }

    /// Advance the run by `dt` seconds of play
    pub fn tick(&mut self, dt: f32) -> SpawnTickReport {
        if self.phase != RunPhase::Playing || self.clock.is_paused() || !dt.is_finite() {
            return SpawnTickReport::default();
        }
        self.clock.tick(dt);
        let minutes = self.clock.minutes();

        if self.player.tick(dt) {
            self.notify_hp();
        }

        let mut ctx = SpawnContext {
            minutes,
            mode: self.settings.mode,
            difficulty: &self.config.difficulty,
            scaling: &self.config.enemy,
            player_position: self.player_position,
            pool: self.collab.pool.as_mut(),
            bounds: self.collab.bounds.as_deref(),
        };
        let report = self.scheduler.tick(dt, &mut ctx, &mut self.rng);

        for handle in &report.bosses {
            if let Some(boss) = self.scheduler.enemy(*handle) {
                self.collab.presentation.boss_spawned(
                    *handle,
                    boss.max_hp,
                    boss.archetype.is_map_unlock_boss,
                );
            }
        }
        report
    }

    // ========================================================================
    // Enemies
    // ========================================================================

    /// Player hit an enemy; kills are settled immediately
    pub fn hit_enemy(&mut self, handle: InstanceHandle, amount: f32) -> Option<HitOutcome> {
        if self.phase == RunPhase::Ended {
            return None;
        }
        let hit = self.scheduler.damage_enemy(handle, amount)?;
        self.collab.presentation.damage_dealt(handle, hit.dealt);
        if hit.is_boss {
            self.collab
                .presentation
                .boss_health_changed(handle, hit.current_hp, hit.max_hp);
        }
        let kill = if hit.killed {
            self.enemy_killed(handle)
        } else {
            None
        };
        Some(HitOutcome { hit, kill })
    }

    /// Re-resolve a boss's HP at the current run time, keeping its HP ratio
    pub fn recalculate_boss_hp(&mut self, handle: InstanceHandle) -> Option<(f32, f32)> {
        if self.phase == RunPhase::Ended {
            return None;
        }
        let resolver = EnemyStatResolver::new(&self.config.enemy, &self.config.difficulty);
        let (current, max) = self
            .scheduler
            .recalculate_boss_hp(handle, &resolver, self.clock.minutes())?;
        debug!(handle = handle.0, max_hp = max, "boss hp recalculated");
        self.collab
            .presentation
            .boss_health_changed(handle, current, max);
        Some((current, max))
    }

    /// An enemy died; pays out XP and gold and rolls its drops
    pub fn enemy_killed(&mut self, handle: InstanceHandle) -> Option<KillReward> {
        if self.phase == RunPhase::Ended {
            return None;
        }
        let enemy = self.scheduler.despawn(handle, self.collab.pool.as_mut())?;
        let archetype = enemy.archetype;
        let resolver = EnemyStatResolver::new(&self.config.enemy, &self.config.difficulty);
        let payout = resolver.payout(&archetype, self.clock.minutes(), self.settings.mode);
        let drops = resolver.roll_drops(&archetype, &mut self.rng);

        self.ledger.record_kill(&archetype);
        if archetype.is_map_unlock_boss {
            info!("map unlock boss defeated");
            if let Some(meta) = self.collab.meta.as_mut() {
                meta.record_map_unlock();
            }
        }

        let gold_gained = self.player.add_gold(payout.gold as i64);
        if gold_gained > 0 {
            self.ledger.record_gold_earned(gold_gained as u64);
            self.collab.presentation.gold_changed(self.player.gold());
        }
        let xp = self.player.add_xp(payout.xp);
        self.on_xp_gain(xp);

        let chest = drops
            .chest
            .map(|c| self.place_chest(c.guaranteed_legendary));
        Some(KillReward {
            payout,
            gold_gained,
            xp,
            drops,
            chest,
        })
    }

    // ========================================================================
    // Player
    // ========================================================================

    pub fn damage_player(&mut self, amount: f32) -> DamageTaken {
        if self.phase == RunPhase::Ended {
            return DamageTaken {
                dealt: 0.0,
                current_hp: self.player.current_hp(),
                died: false,
            };
        }
        let taken = self.player.take_damage(amount);
        if taken.dealt > 0.0 {
            self.notify_hp();
        }
        if taken.died {
            self.end();
        }
        taken
    }

    /// Pick one of the offered upgrade cards
    pub fn choose_upgrade(&mut self, index: usize) -> Option<UpgradeOffer> {
        if self.phase != RunPhase::ChoosingUpgrade {
            return None;
        }
        let offer = self.offers.get(index).cloned()?;
        self.player.apply_upgrade(offer.stat, offer.value);
        if offer.stat == StatDimension::MaxHp {
            self.notify_hp();
        }
        debug!(stat = ?offer.stat, rarity = ?offer.rarity, "upgrade chosen");

        self.offers.clear();
        self.phase = RunPhase::Playing;
        if self.pending_level_ups > 0 {
            self.pending_level_ups -= 1;
            self.open_upgrade_choice();
        }
        self.sync_clock();
        Some(offer)
    }

    fn on_xp_gain(&mut self, gain: XpGain) {
        if !gain.levelled_up {
            return;
        }
        info!(level = gain.new_level, "player levelled up");
        if let Some(milestone) = gain.milestone {
            info!(level = milestone.level, stat = ?milestone.stat, "class milestone reached");
            self.collab.presentation.milestone_reached(&milestone);
        }
        let max_hp_grew = self.player.class().passive().0 == StatDimension::MaxHp
            || gain.milestone.map(|m| m.stat) == Some(StatDimension::MaxHp);
        if max_hp_grew {
            self.notify_hp();
        }
        match self.phase {
            RunPhase::Playing => self.open_upgrade_choice(),
            RunPhase::ChoosingUpgrade => self.pending_level_ups += 1,
            RunPhase::Ended => {}
        }
    }

    fn open_upgrade_choice(&mut self) {
        let selector = UpgradeSelector::new(&self.config.upgrades, &self.config.rarity);
        let offers = selector.draw(&self.player, DEFAULT_UPGRADE_CHOICES, &mut self.rng);
        if offers.is_empty() {
            debug!("no upgrades left to offer");
            return;
        }
        self.collab
            .presentation
            .level_up(self.player.level(), &offers);
        self.offers = offers;
        self.phase = RunPhase::ChoosingUpgrade;
        self.sync_clock();
    }

    /// Altar: trade a share of current HP for an immediate level
    pub fn use_altar(&mut self) -> AltarOutcome {
        if self.phase != RunPhase::Playing {
            return AltarOutcome::Refused;
        }
        let hp_cost = self.player.sacrifice_hp(self.config.economy.altar_hp_cost);
        if hp_cost <= 0.0 {
            return AltarOutcome::Refused;
        }
        self.notify_hp();
        self.ledger.record_altar();
        let gain = self.player.grant_level();
        self.on_xp_gain(gain);
        AltarOutcome::Sacrificed {
            hp_cost,
            new_level: gain.new_level,
        }
    }

    /// Soul pickup; banked in the meta store when one is present
    pub fn collect_soul(&mut self) -> u64 {
        if self.phase == RunPhase::Ended {
            return 0;
        }
        let souls = self.config.economy.souls_per_pickup;
        self.ledger.record_souls(souls);
        if let Some(meta) = self.collab.meta.as_mut() {
            meta.add_souls(souls);
        }
        souls
    }

    pub fn collect_special(&mut self, pickup: SpecialPickup) {
        if self.phase == RunPhase::Ended {
            return;
        }
        let tuning = &self.config.economy;
        let (stat, value) = match pickup {
            SpecialPickup::Magnet => (StatDimension::PickupRange, tuning.magnet_buff_pickup_range),
            SpecialPickup::Rage => (StatDimension::Damage, tuning.rage_buff_damage),
        };
        self.player
            .apply_buff(stat, value, tuning.special_buff_duration);
    }

    // ========================================================================
    // Chests
    // ========================================================================

    /// Put a chest in the world; it opens once marked ready
    pub fn place_chest(&mut self, guaranteed_legendary: bool) -> ChestId {
        self.next_chest += 1;
        let id = ChestId(self.next_chest);
        self.chests
            .insert(id, ChestPickup::new(guaranteed_legendary));
        id
    }

    /// Reveal animation finished
    pub fn chest_ready(&mut self, id: ChestId) {
        if let Some(chest) = self.chests.get_mut(&id) {
            chest.mark_ready();
        }
    }

    pub fn open_chest(&mut self, id: ChestId) -> Result<ChestReward, ChestRefusal> {
        if self.phase == RunPhase::Ended {
            return Err(ChestRefusal::Unavailable);
        }
        let chest = self.chests.get_mut(&id).ok_or(ChestRefusal::Unavailable)?;
        let opened = chest.try_open(&mut self.ledger, &mut self.player)?;
        self.chests.remove(&id);
        if opened.price_paid > 0 {
            self.collab.presentation.gold_changed(self.player.gold());
        }

        let selector = UpgradeSelector::new(&self.config.chest_items, &self.config.rarity);
        let item = selector.draw_chest_item(&self.player, opened.guaranteed_legendary, &mut self.rng);
        if let Some(item) = &item {
            self.player.apply_upgrade(item.stat, item.value);
            if item.stat == StatDimension::MaxHp {
                self.notify_hp();
            }
        }
        Ok(ChestReward {
            price_paid: opened.price_paid,
            item,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// End the run (death or quit); only the first call has an effect
    pub fn end(&mut self) {
        if self.phase == RunPhase::Ended {
            return;
        }
        self.phase = RunPhase::Ended;
        self.scheduler.stop();
        self.offers.clear();
        self.pending_level_ups = 0;
        self.sync_clock();

        let summary = self
            .ledger
            .summary(self.settings.mode, self.clock.seconds(), &self.player);
        info!(
            seconds = summary.survived_seconds,
            level = summary.level,
            kills = summary.kills.total(),
            "run ended"
        );
        self.collab.presentation.run_ended(&summary);
        self.summary = Some(summary);
    }

    /// Start over in the same session; all run state returns to zero
    pub fn restart(&mut self) {
        self.scheduler.reset(self.collab.pool.as_mut());
        self.clock.reset();
        self.ledger.reset();
        self.player = Self::fresh_player(&self.config, &self.settings, &self.collab);
        self.chests.clear();
        self.offers.clear();
        self.pending_level_ups = 0;
        self.summary = None;
        self.user_paused = false;
        self.phase = RunPhase::Playing;
        self.scheduler.start();
        self.notify_hp();
        info!("run restarted");
    }

    fn notify_hp(&mut self) {
        self.collab
            .presentation
            .hp_changed(self.player.current_hp(), self.player.max_hp());
    }
}
