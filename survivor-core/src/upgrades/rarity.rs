//! Rarity tiers and the luck-weighted tier roll.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upgrade rarity tiers, in roll order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }
}

/// Luck-adjusted rarity weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RarityTable {
    /// Weights at zero luck, Common..Legendary
    pub base_weights: [f32; 4],
    /// Luck amount that counts as one step of adjustment
    pub luck_step: f32,
    /// Weight shift per luck step
    pub shift_per_step: [f32; 4],
    pub min_weights: [f32; 4],
    pub max_weights: [f32; 4],
}

impl Default for RarityTable {
    fn default() -> Self {
        Self {
            base_weights: [60.0, 25.0, 10.0, 5.0],
            luck_step: 0.1,
            shift_per_step: [-5.0, 2.5, 1.5, 1.0],
            min_weights: [5.0, 10.0, 5.0, 3.0],
            max_weights: [60.0, 50.0, 40.0, 30.0],
        }
    }
}

impl RarityTable {
    /// Weights after luck adjustment and clamping
    pub fn weights(&self, luck: f32) -> [f32; 4] {
        let luck_factor = if self.luck_step > 0.0 {
            luck.max(0.0) / self.luck_step
        } else {
            0.0
        };
        let mut weights = [0.0; 4];
        for (i, w) in weights.iter_mut().enumerate() {
            let adjusted = self.base_weights[i] + self.shift_per_step[i] * luck_factor;
            *w = adjusted.clamp(self.min_weights[i], self.max_weights[i]);
        }
        weights
    }

    /// Draw a tier; first cumulative bucket containing the draw wins
    pub fn roll<R: Rng + ?Sized>(&self, luck: f32, rng: &mut R) -> Rarity {
        let weights = self.weights(luck);
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            return Rarity::Common;
        }
        let draw = rng.gen::<f32>() * total;
        let mut cumulative = 0.0;
        for (rarity, weight) in Rarity::ALL.iter().zip(weights.iter()) {
            cumulative += weight;
            if draw < cumulative {
                return *rarity;
            }
        }
        Rarity::Legendary
    }
}
