//! Collaborator traits for the external habit and XP stores.
//!
//! The pipeline never talks to a backend directly. Production code plugs in a client for
//! the hosted store; tests and the demo use `InMemoryStore`.

use async_trait::async_trait;
use chrono::NaiveDate;
use habitkit_shared::{Habit, Result};
use serde::{Deserialize, Serialize};

/// Streak figures for one habit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStreak {
    pub habit_id: String,
    pub current_streak: u32,
    pub best_streak: u32,
}

/// Totals across all of a user's habits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_completions: u64,
    pub total_days_tracked: u32,
    pub streak_data: Vec<HabitStreak>,
    pub total_habit_xp: u64,
}

impl AggregatedStats {
    /// Sum of live streaks
    pub fn total_streak_days(&self) -> u64 {
        self.streak_data.iter().map(|s| s.current_streak as u64).sum()
    }
}

/// Today's task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayStats {
    pub completed: u32,
    pub total: u32,
}

/// XP profile as stored for a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserXpStats {
    pub total_xp: u64,
    pub current_level: u32,
    pub current_level_xp: u64,
    pub xp_for_next_level: u64,
    pub level_progress: f64,
}

/// Habits, completions and derived habit figures
#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn fetch_habits(&self, user_id: &str) -> Result<Vec<Habit>>;

    async fn get_aggregated_stats(&self, user_id: &str) -> Result<AggregatedStats>;

    async fn get_active_habits_count(&self, user_id: &str) -> Result<u32>;

    async fn get_today_stats(&self, user_id: &str) -> Result<TodayStats>;

    async fn get_global_streak(&self, user_id: &str) -> Result<u32>;

    /// Check or uncheck one task for one date
    async fn set_task_completion(
        &self,
        habit_id: &str,
        user_id: &str,
        date: NaiveDate,
        task_id: &str,
        completed: bool,
    ) -> Result<()>;
}

/// User XP profile
#[async_trait]
pub trait XpStore: Send + Sync {
    async fn get_user_xp_stats(&self, user_id: &str) -> Result<UserXpStats>;

    /// Credit XP earned on the client
    async fn add_xp(&self, user_id: &str, amount: u64) -> Result<UserXpStats>;
}
