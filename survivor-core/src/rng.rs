//! Deterministic random source for the run simulation.
//!
//! Every draw in the core goes through `rand::Rng`; the concrete generator is
//! Xoshiro256++ so a seed reproduces a whole run.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

pub type SimRng = Xoshiro256PlusPlus;

pub fn seeded(seed: u64) -> SimRng {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// Uniform draw in `[0, 1)`
pub fn unit<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>()
}

/// Independent Bernoulli trial; `chance` outside [0, 1] saturates
pub fn chance<R: Rng + ?Sized>(rng: &mut R, chance: f32) -> bool {
    if chance <= 0.0 {
        return false;
    }
    if chance >= 1.0 {
        return true;
    }
    unit(rng) < chance
}
