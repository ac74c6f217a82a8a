//! In-memory habit and XP store.
//!
//! Backs the demo binary and the tests. Supports injected failures and latency so the
//! aggregator's failure absorption and race behavior can be exercised without a backend.

use crate::store::{AggregatedStats, HabitStore, HabitStreak, TodayStats, UserXpStats, XpStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use habitkit_shared::levels::level_from_total_xp;
use habitkit_shared::streaks::{calculate_streaks_with, habit_streaks, StreakOptions};
use habitkit_shared::tiers::streak_xp;
use habitkit_shared::{Habit, HabitError, Result, BASE_TASK_XP};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Default)]
struct StoreState {
    habits: HashMap<String, Vec<Habit>>,
    xp: HashMap<String, u64>,
    /// Number of upcoming reads that fail
    fail_reads: u32,
    /// XP reads fail until cleared
    fail_xp: bool,
    latency: Duration,
}

/// Store kept entirely in process memory
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    today: Mutex<NaiveDate>,
    streak_options: StreakOptions,
}

impl InMemoryStore {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            today: Mutex::new(today),
            streak_options: StreakOptions::default(),
        }
    }

    pub fn with_streak_options(mut self, options: StreakOptions) -> Self {
        self.streak_options = options;
        self
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_today(&self, today: NaiveDate) {
        *self.today.lock().unwrap_or_else(PoisonError::into_inner) = today;
    }

    pub fn insert_habit(&self, user_id: &str, habit: Habit) {
        self.state()
            .habits
            .entry(user_id.to_string())
            .or_default()
            .push(habit);
    }

    pub fn set_xp(&self, user_id: &str, total_xp: u64) {
        self.state().xp.insert(user_id.to_string(), total_xp);
    }

    pub fn xp(&self, user_id: &str) -> u64 {
        self.state().xp.get(user_id).copied().unwrap_or(0)
    }

    pub fn habit(&self, user_id: &str, habit_id: &str) -> Option<Habit> {
        self.state()
            .habits
            .get(user_id)
            .and_then(|hs| hs.iter().find(|h| h.id == habit_id).cloned())
    }

    /// Make the next `n` reads fail with a store error
    pub fn fail_next(&self, n: u32) {
        self.state().fail_reads = n;
    }

    /// Make XP reads fail until turned off
    pub fn fail_xp_reads(&self, fail: bool) {
        self.state().fail_xp = fail;
    }

    /// Delay every call by this much
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    async fn simulate_io(&self) -> Result<()> {
        let latency = self.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state();
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(HabitError::Store("injected failure".to_string()));
        }
        Ok(())
    }

    fn habits_for(&self, user_id: &str) -> Vec<Habit> {
        self.state().habits.get(user_id).cloned().unwrap_or_default()
    }

    fn streaks_for(&self, habits: &[Habit]) -> Vec<HabitStreak> {
        let today = self.today();
        habits
            .iter()
            .map(|h| {
                let stats = habit_streaks(h, today, &self.streak_options);
                HabitStreak {
                    habit_id: h.id.clone(),
                    current_streak: stats.current_streak,
                    best_streak: stats.best_streak,
                }
            })
            .collect()
    }
}

#[async_trait]
impl HabitStore for InMemoryStore {
    async fn fetch_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        self.simulate_io().await?;
        let mut habits = self.habits_for(user_id);
        let streaks = self.streaks_for(&habits);
        for (habit, streak) in habits.iter_mut().zip(streaks) {
            habit.current_streak = streak.current_streak;
            habit.best_streak = habit.best_streak.max(streak.best_streak);
            habit.reconcile_streaks();
        }
        Ok(habits)
    }

    async fn get_aggregated_stats(&self, user_id: &str) -> Result<AggregatedStats> {
        self.simulate_io().await?;
        let habits = self.habits_for(user_id);
        let days: BTreeSet<NaiveDate> = habits
            .iter()
            .flat_map(|h| h.completions.keys().copied())
            .collect();
        let streak_data = self.streaks_for(&habits);
        let total_habit_xp = habits
            .iter()
            .zip(&streak_data)
            .map(|(h, s)| h.total_completions() * streak_xp(BASE_TASK_XP, s.current_streak))
            .sum();

        Ok(AggregatedStats {
            total_completions: habits.iter().map(|h| h.total_completions()).sum(),
            total_days_tracked: days.len() as u32,
            streak_data,
            total_habit_xp,
        })
    }

    async fn get_active_habits_count(&self, user_id: &str) -> Result<u32> {
        self.simulate_io().await?;
        Ok(self.habits_for(user_id).len() as u32)
    }

    async fn get_today_stats(&self, user_id: &str) -> Result<TodayStats> {
        self.simulate_io().await?;
        let today = self.today();
        let habits = self.habits_for(user_id);
        let total = habits.iter().map(|h| h.tasks.len() as u32).sum();
        let completed = habits
            .iter()
            .filter_map(|h| h.progress_on(today))
            .map(|p| p.completed_tasks.len() as u32)
            .sum();
        Ok(TodayStats { completed, total })
    }

    async fn get_global_streak(&self, user_id: &str) -> Result<u32> {
        self.simulate_io().await?;
        let habits = self.habits_for(user_id);
        let dates: BTreeSet<NaiveDate> = habits
            .iter()
            .flat_map(|h| h.progress_dates(self.streak_options.rule))
            .collect();
        let stats = calculate_streaks_with(&dates, self.today(), &self.streak_options);
        Ok(stats.current_streak)
    }

    async fn set_task_completion(
        &self,
        habit_id: &str,
        user_id: &str,
        date: NaiveDate,
        task_id: &str,
        completed: bool,
    ) -> Result<()> {
        self.simulate_io().await?;
        let mut state = self.state();
        let habit = state
            .habits
            .get_mut(user_id)
            .and_then(|hs| hs.iter_mut().find(|h| h.id == habit_id))
            .ok_or_else(|| HabitError::NotFound(format!("habit {}", habit_id)))?;

        if completed {
            if !habit.record_task(date, task_id) {
                return Err(HabitError::NotFound(format!("task {}", task_id)));
            }
        } else {
            habit.clear_task(date, task_id);
        }
        debug!(habit_id, task_id, %date, completed, "task completion stored");
        Ok(())
    }
}

#[async_trait]
impl XpStore for InMemoryStore {
    async fn get_user_xp_stats(&self, user_id: &str) -> Result<UserXpStats> {
        self.simulate_io().await?;
        if self.state().fail_xp {
            return Err(HabitError::Store("xp profile unavailable".to_string()));
        }
        Ok(xp_stats(self.xp(user_id)))
    }

    async fn add_xp(&self, user_id: &str, amount: u64) -> Result<UserXpStats> {
        self.simulate_io().await?;
        let total = {
            let mut state = self.state();
            let entry = state.xp.entry(user_id.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
            *entry
        };
        Ok(xp_stats(total))
    }
}

fn xp_stats(total_xp: u64) -> UserXpStats {
    let progress = level_from_total_xp(total_xp);
    UserXpStats {
        total_xp,
        current_level: progress.level,
        current_level_xp: progress.current_level_xp,
        xp_for_next_level: progress.xp_for_next_level,
        level_progress: progress.progress_pct,
    }
}
