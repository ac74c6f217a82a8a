//! Habit milestones.
//!
//! Milestones are a fixed catalogue keyed by day threshold. Unlock state is derived from
//! the habit's age on each call and never stored, so the count only grows with wall-clock
//! time and is independent of actual completions.

use crate::tiers::{tier_for_streak, Tier};
use chrono::NaiveDate;
use serde::Serialize;

/// Catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub days: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub reward_xp: u64,
    pub tier: Tier,
}

impl Milestone {
    const fn new(days: u32, title: &'static str, description: &'static str, reward_xp: u64) -> Self {
        Self {
            days,
            title,
            description,
            reward_xp,
            tier: Tier::Spark,
        }
    }
}

const CATALOGUE: &[Milestone] = &[
    Milestone::new(3, "Getting Started", "Three days in", 25),
    Milestone::new(7, "Week One", "A full week with this habit", 50),
    Milestone::new(14, "Fortnight", "Two weeks of practice", 100),
    Milestone::new(21, "Habit Formed", "Three weeks, the classic habit mark", 150),
    Milestone::new(30, "Monthly Master", "One month strong", 250),
    Milestone::new(60, "Two Months", "Sixty days and counting", 400),
    Milestone::new(90, "Quarter Year", "Ninety days of commitment", 600),
    Milestone::new(180, "Half Year", "Six months of consistency", 1000),
    Milestone::new(365, "Full Year", "A whole year with this habit", 2500),
];

/// All milestones, ascending by day threshold, with their tier filled in
pub fn all_milestones() -> Vec<Milestone> {
    CATALOGUE
        .iter()
        .map(|m| Milestone {
            tier: tier_for_streak(m.days),
            ..*m
        })
        .collect()
}

/// Age in days counting the creation date itself (created today = 1)
pub fn habit_age_days(created_on: NaiveDate, today: NaiveDate) -> u32 {
    let diff = (today - created_on).num_days();
    if diff < 0 {
        0
    } else {
        diff as u32 + 1
    }
}

/// Milestones whose threshold is within the given age
pub fn unlocked_at_age(age_days: u32) -> Vec<Milestone> {
    all_milestones()
        .into_iter()
        .filter(|m| m.days <= age_days)
        .collect()
}

pub fn unlocked_milestones(created_on: NaiveDate, today: NaiveDate) -> Vec<Milestone> {
    unlocked_at_age(habit_age_days(created_on, today))
}

pub fn unlocked_count(created_on: NaiveDate, today: NaiveDate) -> usize {
    unlocked_milestones(created_on, today).len()
}

/// First milestone not yet reached at this age
pub fn next_milestone(age_days: u32) -> Option<Milestone> {
    all_milestones().into_iter().find(|m| m.days > age_days)
}

/// Milestones crossed when the age moves from `previous_age` to `current_age`
pub fn newly_unlocked(previous_age: u32, current_age: u32) -> Vec<Milestone> {
    all_milestones()
        .into_iter()
        .filter(|m| m.days > previous_age && m.days <= current_age)
        .collect()
}
