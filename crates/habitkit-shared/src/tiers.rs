//! Streak tiers.
//!
//! A tier is a named band of habit maturity derived from streak length.
//! Higher tiers scale the XP earned per completed task.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Spark,
    Ember,
    Flame,
    Blaze,
    Inferno,
    Legend,
}

/// (tier, minimum streak, XP multiplier in percent)
const TIER_TABLE: &[(Tier, u32, u64)] = &[
    (Tier::Spark, 0, 100),
    (Tier::Ember, 3, 110),
    (Tier::Flame, 7, 125),
    (Tier::Blaze, 21, 150),
    (Tier::Inferno, 60, 175),
    (Tier::Legend, 180, 200),
];

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Spark => "Spark",
            Tier::Ember => "Ember",
            Tier::Flame => "Flame",
            Tier::Blaze => "Blaze",
            Tier::Inferno => "Inferno",
            Tier::Legend => "Legend",
        }
    }

    /// Streak length at which this tier starts
    pub fn min_streak(&self) -> u32 {
        self.entry().1
    }

    /// XP multiplier in percent (100 = 1.0x)
    pub fn multiplier_pct(&self) -> u64 {
        self.entry().2
    }

    fn entry(&self) -> (Tier, u32, u64) {
        TIER_TABLE
            .iter()
            .copied()
            .find(|(t, _, _)| t == self)
            .unwrap_or(TIER_TABLE[0])
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tier earned by a streak of this length
pub fn tier_for_streak(streak: u32) -> Tier {
    TIER_TABLE
        .iter()
        .rev()
        .find(|(_, min, _)| streak >= *min)
        .map(|(t, _, _)| *t)
        .unwrap_or(Tier::Spark)
}

/// Next tier and the days still needed to reach it
pub fn next_tier(streak: u32) -> Option<(Tier, u32)> {
    TIER_TABLE
        .iter()
        .find(|(_, min, _)| *min > streak)
        .map(|(t, min, _)| (*t, min - streak))
}

/// Base XP scaled by the tier of the current streak, rounded down
pub fn streak_xp(base: u64, streak: u32) -> u64 {
    base * tier_for_streak(streak).multiplier_pct() / 100
}
