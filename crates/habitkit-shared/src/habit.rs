//! Habit and per-day task progress records.
//!
//! Habits are owned by the external store; the pipeline only reads snapshots.
//! The mutation helpers here back the in-memory store used by tests and the demo.

use crate::streaks::StreakRule;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Whether a habit is something to build or something to break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Good,
    Bad,
}

/// Tasks completed for one habit on one date
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyTaskProgress {
    /// Task identifiers checked off that date
    pub completed_tasks: BTreeSet<String>,
    /// Every task of the habit was completed that date
    pub all_completed: bool,
}

impl DailyTaskProgress {
    /// Build a record, deriving `all_completed` from the habit's task count
    pub fn new(completed_tasks: BTreeSet<String>, total_tasks: usize) -> Self {
        let all_completed = total_tasks > 0 && completed_tasks.len() == total_tasks;
        Self {
            completed_tasks,
            all_completed,
        }
    }

    /// Any task at all was recorded
    pub fn has_progress(&self) -> bool {
        !self.completed_tasks.is_empty()
    }

    fn counts_for(&self, rule: StreakRule) -> bool {
        match rule {
            StreakRule::AnyProgress => self.has_progress(),
            StreakRule::FullCompletion => self.all_completed,
        }
    }
}

/// A tracked routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub polarity: Polarity,
    pub category: String,
    /// Ordered task identifiers
    pub tasks: Vec<String>,
    /// Per-date progress, keyed by ISO date
    #[serde(default)]
    pub completions: BTreeMap<NaiveDate, DailyTaskProgress>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
}

impl Habit {
    pub fn new(id: &str, name: &str, tasks: &[&str], created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            polarity: Polarity::Good,
            category: "general".to_string(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            completions: BTreeMap::new(),
            created_at,
            current_streak: 0,
            best_streak: 0,
        }
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Date the habit was created on (UTC)
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Progress for a date. A missing record means no progress.
    pub fn progress_on(&self, date: NaiveDate) -> Option<&DailyTaskProgress> {
        self.completions.get(&date)
    }

    /// Mark a task done on a date. Returns false if the task is unknown.
    pub fn record_task(&mut self, date: NaiveDate, task_id: &str) -> bool {
        if !self.tasks.iter().any(|t| t == task_id) {
            return false;
        }
        let total = self.tasks.len();
        let entry = self.completions.entry(date).or_default();
        let mut completed = std::mem::take(&mut entry.completed_tasks);
        completed.insert(task_id.to_string());
        *entry = DailyTaskProgress::new(completed, total);
        true
    }

    /// Un-mark a task. Empty records are removed so they don't count as progress.
    pub fn clear_task(&mut self, date: NaiveDate, task_id: &str) {
        let total = self.tasks.len();
        if let Some(entry) = self.completions.get_mut(&date) {
            let mut completed = std::mem::take(&mut entry.completed_tasks);
            completed.remove(task_id);
            if completed.is_empty() {
                self.completions.remove(&date);
            } else {
                *entry = DailyTaskProgress::new(completed, total);
            }
        }
    }

    /// Dates that count toward a streak under the given rule, ascending
    pub fn progress_dates(&self, rule: StreakRule) -> BTreeSet<NaiveDate> {
        self.completions
            .iter()
            .filter(|(_, p)| p.counts_for(rule))
            .map(|(d, _)| *d)
            .collect()
    }

    /// Days on which every task was done
    pub fn perfect_days(&self) -> u32 {
        self.completions.values().filter(|p| p.all_completed).count() as u32
    }

    /// Total task check-offs across all dates
    pub fn total_completions(&self) -> u64 {
        self.completions
            .values()
            .map(|p| p.completed_tasks.len() as u64)
            .sum()
    }

    /// Restore `best_streak >= current_streak`
    pub fn reconcile_streaks(&mut self) {
        self.best_streak = self.best_streak.max(self.current_streak);
    }
}
