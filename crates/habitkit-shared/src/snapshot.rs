//! Stats snapshot shown on the progression surfaces.
//!
//! A snapshot is an immutable value. Refreshes replace it wholesale and optimistic
//! updates derive a new one from the previous value plus an XP delta.

use crate::levels::{level_from_total_xp, progress_pct, xp_for_next_level};
use crate::titles::current_title;
use serde::{Deserialize, Serialize};

/// How an optimistic XP delta rolls over level boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// Keep rolling until the remainder fits in the current level
    #[default]
    Loop,
    /// Roll over at most once per update (legacy behavior)
    Single,
}

/// Aggregated progression figures for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub title: String,
    /// >= 1
    pub level: u32,
    /// XP earned within the current level
    pub current_level_xp: u64,
    /// XP the current level costs
    pub xp_for_next_level: u64,
    /// 0-100
    pub progress_pct: f64,
    /// Sum of live streaks across habits
    pub total_streak_days: u64,
    pub active_habits: u32,
    pub today_completed: u32,
    pub today_total: u32,
    /// Lifetime XP
    pub total_xp: u64,
    #[serde(default)]
    pub total_completions: u64,
    #[serde(default)]
    pub perfect_days: u32,
    #[serde(default)]
    pub global_streak: u32,
    /// Distinct days with any check-in
    #[serde(default)]
    pub days_tracked: u32,
    /// XP attributed to habit check-ins, as reported by the store
    #[serde(default)]
    pub habit_xp: u64,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self::from_total_xp(0)
    }
}

/// Result of an optimistic XP update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisticOutcome {
    pub leveled_up: bool,
    pub new_level: u32,
}

impl StatsSnapshot {
    /// Snapshot with level fields derived from lifetime XP and everything else zeroed
    pub fn from_total_xp(total_xp: u64) -> Self {
        let progress = level_from_total_xp(total_xp);
        Self {
            title: current_title(progress.level).title.to_string(),
            level: progress.level,
            current_level_xp: progress.current_level_xp,
            xp_for_next_level: progress.xp_for_next_level,
            progress_pct: progress.progress_pct,
            total_streak_days: 0,
            active_habits: 0,
            today_completed: 0,
            today_total: 0,
            total_xp,
            total_completions: 0,
            perfect_days: 0,
            global_streak: 0,
            days_tracked: 0,
            habit_xp: 0,
        }
    }

    /// Predict the snapshot after earning `xp_delta`, without touching `self`
    pub fn with_xp_delta(&self, xp_delta: u64, policy: RolloverPolicy) -> (Self, OptimisticOutcome) {
        let mut next = self.clone();
        next.total_xp = self.total_xp.saturating_add(xp_delta);
        next.current_level_xp = self.current_level_xp.saturating_add(xp_delta);

        let mut leveled_up = false;
        while next.xp_for_next_level > 0 && next.current_level_xp >= next.xp_for_next_level {
            next.current_level_xp -= next.xp_for_next_level;
            next.level += 1;
            next.xp_for_next_level = xp_for_next_level(next.level);
            leveled_up = true;
            if policy == RolloverPolicy::Single {
                break;
            }
        }

        next.title = current_title(next.level).title.to_string();
        next.progress_pct = progress_pct(next.current_level_xp, next.xp_for_next_level);

        let outcome = OptimisticOutcome {
            leveled_up,
            new_level: next.level,
        };
        (next, outcome)
    }

    /// Today's completion ratio, 0-100
    pub fn today_pct(&self) -> f64 {
        if self.today_total == 0 {
            0.0
        } else {
            progress_pct(self.today_completed as u64, self.today_total as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(level: u32, current: u64, needed: u64) -> StatsSnapshot {
        StatsSnapshot {
            level,
            current_level_xp: current,
            xp_for_next_level: needed,
            ..StatsSnapshot::default()
        }
    }

    #[test]
    fn test_default_is_level_one() {
        let s = StatsSnapshot::default();
        assert_eq!(s.level, 1);
        assert_eq!(s.title, "Novice");
        assert_eq!(s.xp_for_next_level, 100);
    }

    #[test]
    fn test_optimistic_rollover() {
        let before = snapshot(3, 90, 100);
        let (after, outcome) = before.with_xp_delta(30, RolloverPolicy::Loop);
        assert!(outcome.leveled_up);
        assert_eq!(outcome.new_level, 4);
        assert_eq!(after.level, 4);
        assert_eq!(after.current_level_xp, 20);
        assert_eq!(after.xp_for_next_level, xp_for_next_level(4));
        // Previous value untouched
        assert_eq!(before.level, 3);
        assert_eq!(before.current_level_xp, 90);
    }

    #[test]
    fn test_no_rollover() {
        let (after, outcome) = snapshot(1, 10, 100).with_xp_delta(5, RolloverPolicy::Loop);
        assert!(!outcome.leveled_up);
        assert_eq!(after.current_level_xp, 15);
        assert_eq!(after.progress_pct, 15.0);
    }

    #[test]
    fn test_exact_threshold_levels_up() {
        let (after, outcome) = snapshot(1, 90, 100).with_xp_delta(10, RolloverPolicy::Loop);
        assert!(outcome.leveled_up);
        assert_eq!(after.current_level_xp, 0);
    }

    #[test]
    fn test_loop_crosses_multiple_levels() {
        // Level 1 costs 100, level 2 costs 120
        let (after, outcome) = snapshot(1, 0, 100).with_xp_delta(250, RolloverPolicy::Loop);
        assert_eq!(outcome.new_level, 3);
        assert_eq!(after.current_level_xp, 30);
    }

    #[test]
    fn test_single_rollover_legacy() {
        let (after, outcome) = snapshot(1, 0, 100).with_xp_delta(250, RolloverPolicy::Single);
        assert_eq!(outcome.new_level, 2);
        assert_eq!(after.current_level_xp, 150);
        assert_eq!(after.progress_pct, 100.0);
    }

    #[test]
    fn test_title_recomputed() {
        let (after, _) = snapshot(4, 170, 180).with_xp_delta(20, RolloverPolicy::Loop);
        assert_eq!(after.level, 5);
        assert_eq!(after.title, "Habit Builder");
    }

    #[test]
    fn test_today_pct() {
        let mut s = StatsSnapshot::default();
        assert_eq!(s.today_pct(), 0.0);
        s.today_completed = 1;
        s.today_total = 4;
        assert_eq!(s.today_pct(), 25.0);
    }
}
