//! Before/after text shown on an upgrade card.

use serde::{Deserialize, Serialize};

use crate::constants::DAMAGE_REDUCTION_CAP;
use crate::player::PlayerRunState;
use crate::stats::{DisplayFormat, StatDimension};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePreview {
    pub before: String,
    pub after: String,
}

impl UpgradePreview {
    pub fn summary(&self) -> String {
        format!("{} -> {}", self.before, self.after)
    }
}

/// Preview what taking `value` on `stat` would do for this player
pub fn preview(player: &PlayerRunState, stat: StatDimension, value: f32) -> UpgradePreview {
    let bonus = player.effective_bonus(stat);
    let base = player.base_value(stat);

    let (before, after) = match stat {
        StatDimension::MaxHp => {
            let before = player.max_hp();
            let after = PlayerRunState::combine(stat, base, bonus + value).max(1.0);
            (format!("{:.0}", before), format!("{:.0}", after))
        }
        StatDimension::MagazineSize => {
            let before = (base * (1.0 + bonus)).round();
            let after = (base * (1.0 + bonus + value)).round();
            (format!("{:.0}", before), format!("{:.0}", after))
        }
        StatDimension::DamageReduction => {
            // Shown as share of damage still taken
            let taken = |b: f32| (1.0 - b.clamp(0.0, DAMAGE_REDUCTION_CAP)) * 100.0;
            (
                format!("{:.0}%", taken(bonus)),
                format!("{:.0}%", taken(bonus + value)),
            )
        }
        StatDimension::ReloadSpeed => {
            // Negative bonus shortens the reload
            let seconds = |b: f32| base * (1.0 + stat.clamp_run_bonus(b));
            (
                format!("{:.2}s", seconds(bonus)),
                format!("{:.2}s", seconds(bonus + value)),
            )
        }
        StatDimension::CritChance => {
            let chance = |b: f32| b.clamp(0.0, 1.0) * 100.0;
            (
                format!("{:.0}%", chance(bonus)),
                format!("{:.0}%", chance(bonus + value)),
            )
        }
        _ => match stat.display_format() {
            DisplayFormat::Flat => (stat.format_value(bonus), stat.format_value(bonus + value)),
            _ => (
                format!("{:.0}%", (1.0 + bonus) * 100.0),
                format!("{:.0}%", (1.0 + bonus + value) * 100.0),
            ),
        },
    };
    UpgradePreview { before, after }
}
