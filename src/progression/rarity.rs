//! Rarity tiers, streak bonuses, and the weighted reward roll
//!
//! Weights are static and theme-independent; only the draw is influenced
//! by streak bonuses. A guarantee restricts and renormalizes the draw; an
//! odds multiplier inflates one tier's weight; a guarantee always takes
//! precedence over a multiplier.

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reward rarity tiers, lowest to highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Canonical draw order, lowest to highest
    pub const ORDER: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// Static draw weight
    pub fn weight(&self) -> u32 {
        match self {
            Rarity::Common => 50,
            Rarity::Uncommon => 30,
            Rarity::Rare => 15,
            Rarity::Epic => 4,
            Rarity::Legendary => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }
}

/// A streak threshold and the reward-odds modifier it unlocks
#[derive(Debug, Clone)]
pub struct StreakBonus {
    pub threshold_days: u32,
    /// Restrict the draw to this tier or above
    pub guarantee_min_rarity: Option<Rarity>,
    /// Multiply one tier's weight by the given factor
    pub odds_multiplier: Option<(Rarity, u32)>,
    pub badge_id: Option<&'static str>,
    pub description: &'static str,
}

/// Streak bonus thresholds, ascending
pub static STREAK_BONUSES: Lazy<Vec<StreakBonus>> = Lazy::new(|| {
    vec![
        StreakBonus {
            threshold_days: 3,
            guarantee_min_rarity: Some(Rarity::Uncommon),
            odds_multiplier: None,
            badge_id: Some("novice"),
            description: "Guaranteed Uncommon+",
        },
        StreakBonus {
            threshold_days: 7,
            guarantee_min_rarity: Some(Rarity::Rare),
            odds_multiplier: None,
            badge_id: Some("apprentice"),
            description: "Guaranteed Rare+",
        },
        StreakBonus {
            threshold_days: 14,
            guarantee_min_rarity: None,
            odds_multiplier: Some((Rarity::Epic, 2)),
            badge_id: Some("expert"),
            description: "Epic chance doubled",
        },
        StreakBonus {
            threshold_days: 30,
            guarantee_min_rarity: Some(Rarity::Legendary),
            odds_multiplier: None,
            badge_id: Some("master"),
            description: "Guaranteed Legendary!",
        },
    ]
});

/// Badge display metadata
#[derive(Debug, Clone)]
pub struct BadgeInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Badge registry, one entry per streak bonus threshold
pub static BADGES: [BadgeInfo; 4] = [
    BadgeInfo {
        id: "novice",
        name: "Novice Rhythm",
        description: "Practice for 3 days in a row",
    },
    BadgeInfo {
        id: "apprentice",
        name: "Rhythm Keeper",
        description: "Practice for 7 days in a row",
    },
    BadgeInfo {
        id: "expert",
        name: "Sonic Virtuoso",
        description: "Practice for 14 days in a row",
    },
    BadgeInfo {
        id: "master",
        name: "Metronome Master",
        description: "Practice for 30 days in a row",
    },
];

/// Look up badge display metadata by id
pub fn badge_info(id: &str) -> Option<&'static BadgeInfo> {
    BADGES.iter().find(|b| b.id == id)
}

/// Bonus with the largest threshold at or below `streak`, if any
///
/// Pure function, no side effects.
pub fn get_streak_bonus(streak: u32) -> Option<&'static StreakBonus> {
    STREAK_BONUSES
        .iter()
        .filter(|b| b.threshold_days <= streak)
        .max_by_key(|b| b.threshold_days)
}

/// Weighted random rarity draw with streak bonuses applied
///
/// Draw mechanics: a uniform value in `[0, total_weight)` walks the tiers
/// in canonical order, subtracting each weight until the remainder is
/// spent.
pub fn roll_rarity<R: Rng + ?Sized>(streak: u32, rng: &mut R) -> Rarity {
    let bonus = get_streak_bonus(streak);

    if let Some(min) = bonus.and_then(|b| b.guarantee_min_rarity) {
        // Guarantee: renormalize over eligible tiers, multiplier ignored
        let min_index = Rarity::ORDER.iter().position(|&r| r == min).unwrap_or(0);
        return weighted_draw(&Rarity::ORDER[min_index..], |r| r.weight(), rng);
    }

    if let Some((boosted, factor)) = bonus.and_then(|b| b.odds_multiplier) {
        return weighted_draw(
            &Rarity::ORDER,
            |r| {
                if r == boosted {
                    r.weight() * factor
                } else {
                    r.weight()
                }
            },
            rng,
        );
    }

    weighted_draw(&Rarity::ORDER, |r| r.weight(), rng)
}

fn weighted_draw<R: Rng + ?Sized>(
    tiers: &[Rarity],
    weight_of: impl Fn(Rarity) -> u32,
    rng: &mut R,
) -> Rarity {
    let total: u32 = tiers.iter().map(|&t| weight_of(t)).sum();
    let mut roll = rng.gen_range(0.0..total as f64);
    for &tier in tiers {
        roll -= weight_of(tier) as f64;
        if roll <= 0.0 {
            return tier;
        }
    }
    *tiers.last().expect("tier set is never empty")
}
