//! Spawn placement on a ring around the player.

use std::f32::consts::TAU;

use bevy::math::{Quat, Vec3};
use rand::Rng;

use crate::collab::PlayableBounds;

/// Ring placement parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRing {
    pub min_radius: f32,
    pub max_radius: f32,
    pub attempts: u32,
}

impl SpawnRing {
    fn candidate<R: Rng + ?Sized>(&self, center: Vec3, rng: &mut R) -> Vec3 {
        let angle = rng.gen::<f32>() * TAU;
        let distance = if self.max_radius > self.min_radius {
            rng.gen_range(self.min_radius..=self.max_radius)
        } else {
            self.min_radius
        };
        center + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
    }

    /// Pick a grounded point on the ring.
    ///
    /// Without a bounds collaborator every point counts as playable and the
    /// ground sits at height 0. When every attempt lands out of bounds the
    /// last candidate is clamped back inside.
    pub fn place<R: Rng + ?Sized>(
        &self,
        center: Vec3,
        bounds: Option<&dyn PlayableBounds>,
        rng: &mut R,
    ) -> Vec3 {
        let Some(bounds) = bounds else {
            let mut p = self.candidate(center, rng);
            p.y = 0.0;
            return p;
        };

        let mut last = center;
        for _ in 0..self.attempts.max(1) {
            last = self.candidate(center, rng);
            if bounds.is_within_playable_bounds(last) {
                last.y = bounds.ground_height(last);
                return last;
            }
        }
        let mut clamped = bounds.clamp_to_playable_bounds(last);
        clamped.y = bounds.ground_height(clamped);
        clamped
    }
}

/// Yaw rotation looking from `from` toward `to` on the ground plane
pub fn facing(from: Vec3, to: Vec3) -> Quat {
    let dir = to - from;
    if dir.x.abs() < f32::EPSILON && dir.z.abs() < f32::EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y(dir.x.atan2(dir.z))
}
