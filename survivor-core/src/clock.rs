//! Run-scoped elapsed time, accumulated from frame deltas.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunClock {
    elapsed: f64,
    paused: bool,
}

impl RunClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds unless paused; negative deltas are ignored
    pub fn tick(&mut self, dt: f32) {
        if self.paused || dt <= 0.0 || !dt.is_finite() {
            return;
        }
        self.elapsed += dt as f64;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn minutes(&self) -> f32 {
        (self.elapsed / 60.0) as f32
    }
}
