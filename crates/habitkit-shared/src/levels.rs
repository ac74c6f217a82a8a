//! Level System
//!
//! Maps accumulated XP to a level using a banded, convex cost curve.
//!
//! ## XP Curve
//!
//! Each band is linear in the level, starting from the previous band's last cost:
//!
//! | Levels | Increment per level | Cost range   |
//! |--------|---------------------|--------------|
//! | 1-5    | 20                  | 100 - 180    |
//! | 6-10   | 40                  | 220 - 380    |
//! | 11-15  | 80                  | 460 - 780    |
//! | 16-20  | 120                 | 900 - 1380   |
//! | 21-25  | 200                 | 1580 - 2380  |
//! | 26-30  | 300                 | 2680 - 3880  |
//! | 31-35  | 400                 | 4280 - 5880  |
//! | 36+    | 500                 | 6380 - ...   |
//!
//! Early levels are cheap for onboarding; later levels get expensive quickly.

use serde::{Deserialize, Serialize};

/// Cost of level 1 -> 2
const BASE_COST: u64 = 100;

/// (first level of band, per-level increment)
const BANDS: &[(u32, u64)] = &[
    (1, 20),
    (6, 40),
    (11, 80),
    (16, 120),
    (21, 200),
    (26, 300),
    (31, 400),
    (36, 500),
];

/// XP needed to go from `level` to `level + 1`. Levels below 1 are treated as 1.
pub fn xp_for_next_level(level: u32) -> u64 {
    let level = level.max(1);
    // Level 1 costs BASE_COST; each later level adds its band's increment.
    let mut cost = BASE_COST;
    for (i, &(start, step)) in BANDS.iter().enumerate() {
        let end = BANDS.get(i + 1).map(|&(next, _)| next - 1).unwrap_or(u32::MAX);
        let from = start.max(2);
        if level < from {
            break;
        }
        let upto = level.min(end);
        cost += (upto - from + 1) as u64 * step;
    }
    cost
}

/// Total XP required to reach `target` from zero (sum of costs of levels 1..target)
pub fn total_xp_for_level(target: u32) -> u64 {
    (1..target.max(1)).map(xp_for_next_level).sum()
}

/// Percentage of the way through a level, clamped to 0-100
pub fn progress_pct(current_level_xp: u64, xp_needed: u64) -> f64 {
    if xp_needed == 0 {
        return 100.0;
    }
    (current_level_xp as f64 / xp_needed as f64 * 100.0).clamp(0.0, 100.0)
}

/// Level position derived from a total XP amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level (>= 1)
    pub level: u32,
    /// XP earned inside the current level
    pub current_level_xp: u64,
    /// XP the current level costs
    pub xp_for_next_level: u64,
    /// 0-100
    pub progress_pct: f64,
}

/// Derive level and in-level progress from lifetime XP
pub fn level_from_total_xp(total_xp: u64) -> LevelProgress {
    let mut level = 1u32;
    let mut remaining = total_xp;
    loop {
        let cost = xp_for_next_level(level);
        if remaining < cost {
            return LevelProgress {
                level,
                current_level_xp: remaining,
                xp_for_next_level: cost,
                progress_pct: progress_pct(remaining, cost),
            };
        }
        remaining -= cost;
        level += 1;
    }
}
