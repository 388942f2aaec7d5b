//! Timed stat buffs (rage pickup, shrine blessings).
//!
//! One slot per stat. A new buff on a stat overwrites the old one instead of
//! stacking.

use serde::{Deserialize, Serialize};

use crate::stats::StatDimension;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporaryBuff {
    pub value: f32,
    pub remaining: f32,
}

impl TemporaryBuff {
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemporaryBuffs {
    slots: [TemporaryBuff; 20],
}

impl TemporaryBuffs {
    /// Overwrites any buff already running on `stat`
    pub fn apply(&mut self, stat: StatDimension, value: f32, duration: f32) {
        self.slots[stat.index()] = TemporaryBuff {
            value,
            remaining: duration.max(0.0),
        };
    }

    /// Bonus contributed right now, 0 when the timer has run out
    pub fn active_bonus(&self, stat: StatDimension) -> f32 {
        let buff = &self.slots[stat.index()];
        if buff.is_active() {
            buff.value
        } else {
            0.0
        }
    }

    pub fn remaining(&self, stat: StatDimension) -> f32 {
        self.slots[stat.index()].remaining.max(0.0)
    }

    /// Advance timers; returns the stats whose buff expired this tick
    pub fn tick(&mut self, dt: f32) -> Vec<StatDimension> {
        let mut expired = Vec::new();
        for stat in StatDimension::ALL {
            let buff = &mut self.slots[stat.index()];
            if !buff.is_active() {
                continue;
            }
            buff.remaining -= dt;
            if buff.remaining <= 0.0 {
                *buff = TemporaryBuff::default();
                expired.push(stat);
            }
        }
        expired
    }

    pub fn clear(&mut self) {
        self.slots = [TemporaryBuff::default(); 20];
    }
}
