//! Streak calculation for habits.
//!
//! A date counts toward a streak when the habit has any recorded progress that date
//! (`StreakRule::AnyProgress`). The stricter "every task done" rule is kept as
//! `StreakRule::FullCompletion` for callers that want it.
//!
//! The current streak may start from yesterday when today has no progress yet
//! (one-day grace). Holiday days without progress are skipped: they neither extend
//! nor break a run.

use crate::habit::Habit;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which daily records count as a streak day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakRule {
    #[default]
    AnyProgress,
    FullCompletion,
}

/// Streak evaluation options
#[derive(Debug, Clone, Default)]
pub struct StreakOptions {
    pub rule: StreakRule,
    /// Time-off days that are skipped rather than breaking a streak
    pub holidays: BTreeSet<NaiveDate>,
}

impl StreakOptions {
    pub fn with_rule(rule: StreakRule) -> Self {
        Self {
            rule,
            ..Default::default()
        }
    }
}

/// Streak statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    /// Consecutive days with progress ending today or yesterday
    pub current_streak: u32,
    /// Longest run ever, never below the current streak
    pub best_streak: u32,
    /// Distinct days with progress
    pub active_days: u32,
}

/// Calculate streaks from progress dates with no holidays
pub fn calculate_streaks(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakStats {
    calculate_streaks_with(dates, today, &StreakOptions::default())
}

/// Calculate streaks from progress dates, honoring holidays
pub fn calculate_streaks_with(
    dates: &BTreeSet<NaiveDate>,
    today: NaiveDate,
    options: &StreakOptions,
) -> StreakStats {
    if dates.is_empty() {
        return StreakStats::default();
    }

    let current_streak = current_streak(dates, today, &options.holidays);
    let best_seen = best_streak(dates, &options.holidays);

    StreakStats {
        current_streak,
        best_streak: best_seen.max(current_streak),
        active_days: dates.len() as u32,
    }
}

/// Streaks for a habit under the given options
pub fn habit_streaks(habit: &Habit, today: NaiveDate, options: &StreakOptions) -> StreakStats {
    calculate_streaks_with(&habit.progress_dates(options.rule), today, options)
}

fn current_streak(
    dates: &BTreeSet<NaiveDate>,
    today: NaiveDate,
    holidays: &BTreeSet<NaiveDate>,
) -> u32 {
    let first = match dates.first() {
        Some(d) => *d,
        None => return 0,
    };

    let mut cursor = skip_holidays(today, dates, holidays, first);
    if !dates.contains(&cursor) {
        // Grace: today not done yet, yesterday may still carry the streak
        cursor = step_back(cursor, dates, holidays, first);
        if !dates.contains(&cursor) {
            return 0;
        }
    }

    let mut count = 0u32;
    while dates.contains(&cursor) {
        count += 1;
        if cursor <= first {
            break;
        }
        cursor = step_back(cursor, dates, holidays, first);
    }
    count
}

fn best_streak(dates: &BTreeSet<NaiveDate>, holidays: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        run = match prev {
            Some(p) if adjacent(p, date, holidays) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }
    best
}

/// Two progress dates are adjacent when every day strictly between them is a holiday
fn adjacent(earlier: NaiveDate, later: NaiveDate, holidays: &BTreeSet<NaiveDate>) -> bool {
    let gap = (later - earlier).num_days();
    if gap == 1 {
        return true;
    }
    if gap < 1 {
        return false;
    }
    earlier
        .iter_days()
        .skip(1)
        .take_while(|d| *d < later)
        .all(|d| holidays.contains(&d))
}

/// Move past holidays without progress, never earlier than `floor`
fn skip_holidays(
    mut date: NaiveDate,
    dates: &BTreeSet<NaiveDate>,
    holidays: &BTreeSet<NaiveDate>,
    floor: NaiveDate,
) -> NaiveDate {
    while date > floor && holidays.contains(&date) && !dates.contains(&date) {
        match date.pred_opt() {
            Some(prev) => date = prev,
            None => break,
        }
    }
    date
}

fn step_back(
    date: NaiveDate,
    dates: &BTreeSet<NaiveDate>,
    holidays: &BTreeSet<NaiveDate>,
    floor: NaiveDate,
) -> NaiveDate {
    match date.pred_opt() {
        Some(prev) => skip_holidays(prev, dates, holidays, floor),
        None => date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn set(days: &[u32]) -> BTreeSet<NaiveDate> {
        days.iter().map(|&x| d(x)).collect()
    }

    #[test]
    fn test_empty_streaks() {
        let stats = calculate_streaks(&BTreeSet::new(), d(10));
        assert_eq!(stats, StreakStats::default());
    }

    #[test]
    fn test_consecutive_including_today() {
        let stats = calculate_streaks(&set(&[8, 9, 10]), d(10));
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.best_streak, 3);
        assert_eq!(stats.active_days, 3);
    }

    #[test]
    fn test_grace_window_from_yesterday() {
        let stats = calculate_streaks(&set(&[8, 9]), d(10));
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn test_grace_window_exhausted() {
        let stats = calculate_streaks(&set(&[7, 8]), d(10));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.best_streak, 2);
    }

    #[test]
    fn test_gap_not_bridged() {
        let stats = calculate_streaks(&set(&[1, 4]), d(20));
        assert_eq!(stats.best_streak, 1);
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn test_best_tracks_longest_run() {
        let stats = calculate_streaks(&set(&[1, 2, 3, 4, 6, 7, 10]), d(10));
        assert_eq!(stats.best_streak, 4);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn test_holiday_bridges_gap() {
        let options = StreakOptions {
            holidays: set(&[5, 6]),
            ..Default::default()
        };
        let stats = calculate_streaks_with(&set(&[3, 4, 7, 8]), d(8), &options);
        assert_eq!(stats.best_streak, 4);
        assert_eq!(stats.current_streak, 4);
    }

    #[test]
    fn test_holiday_today_keeps_streak() {
        let options = StreakOptions {
            holidays: set(&[9, 10]),
            ..Default::default()
        };
        // Today and yesterday are holidays; the run ending on the 8th is still live
        let stats = calculate_streaks_with(&set(&[6, 7, 8]), d(10), &options);
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn test_future_dates_do_not_count_as_today() {
        let stats = calculate_streaks(&set(&[12]), d(10));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.best_streak, 1);
    }
}
