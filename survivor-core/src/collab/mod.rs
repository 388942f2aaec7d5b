//! Contracts for the systems the simulation drives but does not own.
//!
//! The pool hands out enemy instances, the bounds answer terrain queries and
//! the presentation layer receives fire-and-forget notifications. All three
//! are injected into `RunSession` once at construction.

pub mod pool;

pub use pool::SimplePool;

use std::sync::{Arc, Mutex};

use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::economy::RunSummary;
use crate::enemy::ArchetypeKind;
use crate::player::ClassMilestone;
use crate::upgrades::UpgradeOffer;

/// Opaque id of a pooled enemy instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceHandle(pub u64);

/// Object pool for enemy instances.
///
/// Exhaustion is reported with `None`, never a panic.
pub trait EnemyPool: Send + Sync {
    fn acquire(&mut self, tag: ArchetypeKind, position: Vec3, rotation: Quat)
        -> Option<InstanceHandle>;
    fn release(&mut self, handle: InstanceHandle);
    fn count_active(&self, tag: ArchetypeKind) -> u32;
}

/// Terrain queries used for spawn placement
pub trait PlayableBounds: Send + Sync {
    fn is_within_playable_bounds(&self, position: Vec3) -> bool;
    fn clamp_to_playable_bounds(&self, position: Vec3) -> Vec3;
    fn ground_height(&self, position: Vec3) -> f32;
}

/// Flat square arena centred on the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareArena {
    pub half_extent: f32,
    pub ground: f32,
}

impl Default for SquareArena {
    fn default() -> Self {
        Self {
            half_extent: 60.0,
            ground: 0.0,
        }
    }
}

impl PlayableBounds for SquareArena {
    fn is_within_playable_bounds(&self, position: Vec3) -> bool {
        position.x.abs() <= self.half_extent && position.z.abs() <= self.half_extent
    }

    fn clamp_to_playable_bounds(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            position.x.clamp(-self.half_extent, self.half_extent),
            position.y,
            position.z.clamp(-self.half_extent, self.half_extent),
        )
    }

    fn ground_height(&self, _position: Vec3) -> f32 {
        self.ground
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// HUD / VFX / audio sink. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait Presentation: Send + Sync {
    fn hp_changed(&mut self, current: f32, max: f32) {}
    fn level_up(&mut self, level: u32, offers: &[UpgradeOffer]) {}
    fn milestone_reached(&mut self, milestone: &ClassMilestone) {}
    fn boss_spawned(&mut self, handle: InstanceHandle, max_hp: f32, map_unlock: bool) {}
    fn boss_health_changed(&mut self, handle: InstanceHandle, current: f32, max: f32) {}
    fn damage_dealt(&mut self, handle: InstanceHandle, amount: f32) {}
    fn gold_changed(&mut self, gold: u64) {}
    fn run_ended(&mut self, summary: &RunSummary) {}
}

/// Presentation that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {}

/// Notification captured by `PresentationLog`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresentationEvent {
    HpChanged { current: f32, max: f32 },
    LevelUp { level: u32, offers: usize },
    MilestoneReached(ClassMilestone),
    BossSpawned { handle: InstanceHandle, max_hp: f32, map_unlock: bool },
    BossHealthChanged { handle: InstanceHandle, current: f32, max: f32 },
    DamageDealt { handle: InstanceHandle, amount: f32 },
    GoldChanged(u64),
    RunEnded(RunSummary),
}

/// Buffers notifications for a consumer that polls
#[derive(Debug, Clone, Default)]
pub struct PresentationLog {
    events: Vec<PresentationEvent>,
}

impl PresentationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[PresentationEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Presentation for PresentationLog {
    fn hp_changed(&mut self, current: f32, max: f32) {
        self.events.push(PresentationEvent::HpChanged { current, max });
    }

    fn level_up(&mut self, level: u32, offers: &[UpgradeOffer]) {
        self.events.push(PresentationEvent::LevelUp {
            level,
            offers: offers.len(),
        });
    }

    fn milestone_reached(&mut self, milestone: &ClassMilestone) {
        self.events
            .push(PresentationEvent::MilestoneReached(*milestone));
    }

    fn boss_spawned(&mut self, handle: InstanceHandle, max_hp: f32, map_unlock: bool) {
        self.events.push(PresentationEvent::BossSpawned {
            handle,
            max_hp,
            map_unlock,
        });
    }

    fn boss_health_changed(&mut self, handle: InstanceHandle, current: f32, max: f32) {
        self.events.push(PresentationEvent::BossHealthChanged {
            handle,
            current,
            max,
        });
    }

    fn damage_dealt(&mut self, handle: InstanceHandle, amount: f32) {
        self.events
            .push(PresentationEvent::DamageDealt { handle, amount });
    }

    fn gold_changed(&mut self, gold: u64) {
        self.events.push(PresentationEvent::GoldChanged(gold));
    }

    fn run_ended(&mut self, summary: &RunSummary) {
        self.events.push(PresentationEvent::RunEnded(summary.clone()));
    }
}

/// Log shared with a consumer outside the run (e.g. a Bevy system)
pub type SharedPresentationLog = Arc<Mutex<PresentationLog>>;

macro_rules! forward_locked {
    ($($name:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            fn $name(&mut self, $($arg: $ty),*) {
                if let Ok(mut inner) = self.lock() {
                    inner.$name($($arg),*);
                }
            }
        )*
    };
}

/// Any presentation behind a shared lock; a poisoned lock drops the notification
impl<P: Presentation> Presentation for Arc<Mutex<P>> {
    forward_locked! {
        hp_changed(current: f32, max: f32);
        level_up(level: u32, offers: &[UpgradeOffer]);
        milestone_reached(milestone: &ClassMilestone);
        boss_spawned(handle: InstanceHandle, max_hp: f32, map_unlock: bool);
        boss_health_changed(handle: InstanceHandle, current: f32, max: f32);
        damage_dealt(handle: InstanceHandle, amount: f32);
        gold_changed(gold: u64);
        run_ended(summary: &RunSummary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_log_forwards() {
        let shared: SharedPresentationLog = Arc::new(Mutex::new(PresentationLog::new()));
        let mut sink: Box<dyn Presentation> = Box::new(shared.clone());
        sink.gold_changed(12);
        let events = shared.lock().map(|mut l| l.drain()).unwrap_or_default();
        assert_eq!(events, vec![PresentationEvent::GoldChanged(12)]);
    }

    #[derive(Default)]
    struct Counter {
        calls: usize,
    }

    impl Presentation for Counter {
        fn hp_changed(&mut self, _current: f32, _max: f32) {
            self.calls += 1;
        }
    }

    #[test]
    fn test_any_locked_presentation_forwards() {
        let shared = Arc::new(Mutex::new(Counter::default()));
        let mut sink: Box<dyn Presentation> = Box::new(shared.clone());
        sink.hp_changed(50.0, 100.0);
        sink.gold_changed(3);
        sink.hp_changed(60.0, 100.0);
        assert_eq!(shared.lock().map(|c| c.calls).unwrap_or_default(), 2);
    }

    #[test]
    fn test_square_arena_bounds() {
        let arena = SquareArena {
            half_extent: 10.0,
            ground: 2.0,
        };
        assert!(arena.is_within_playable_bounds(Vec3::new(9.0, 50.0, -9.0)));
        assert!(!arena.is_within_playable_bounds(Vec3::new(11.0, 0.0, 0.0)));
        let clamped = arena.clamp_to_playable_bounds(Vec3::new(15.0, 1.0, -30.0));
        assert_eq!(clamped, Vec3::new(10.0, 1.0, -10.0));
        assert_eq!(arena.ground_height(Vec3::ZERO), 2.0);
    }

    #[test]
    fn test_null_presentation_accepts_everything() {
        let mut p = NullPresentation;
        p.hp_changed(1.0, 2.0);
        p.gold_changed(5);
        p.damage_dealt(InstanceHandle(3), 4.0);
    }

    #[test]
    fn test_log_records_and_drains() {
        let mut log = PresentationLog::new();
        log.hp_changed(50.0, 100.0);
        log.gold_changed(7);
        assert_eq!(log.events().len(), 2);
        let drained = log.drain();
        assert_eq!(
            drained[0],
            PresentationEvent::HpChanged {
                current: 50.0,
                max: 100.0
            }
        );
        assert!(log.events().is_empty());
    }
}
