//! Per-user session.
//!
//! A `Session` owns the whole progression pipeline for one signed-in user: stats
//! aggregator, celebration queue, level-up watcher and toast queue. `SessionManager`
//! follows the identity channel and builds or tears down sessions as the user changes,
//! so no pipeline state outlives the user it was built for.

use crate::aggregator::StatsAggregator;
use crate::celebration_queue::CelebrationQueue;
use crate::config::Config;
use crate::level_watcher::LevelUpWatcher;
use crate::store::{HabitStore, XpStore};
use crate::toast_queue::QuestToastQueue;
use chrono::NaiveDate;
use habitkit_shared::milestones::{habit_age_days, newly_unlocked};
use habitkit_shared::streaks::{habit_streaks, StreakOptions};
use habitkit_shared::tiers::streak_xp;
use habitkit_shared::{Habit, HabitError, QuestReward, Result, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What completing one task produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub xp_gained: u64,
    pub streak: u32,
    /// Predicted by the optimistic update; the refresh is authoritative
    pub leveled_up: bool,
    pub milestones_unlocked: usize,
}

pub struct Session {
    user_id: UserId,
    habits: Arc<dyn HabitStore>,
    xp: Arc<dyn XpStore>,
    aggregator: StatsAggregator,
    celebrations: CelebrationQueue,
    watcher: LevelUpWatcher,
    watcher_task: JoinHandle<()>,
    toasts: QuestToastQueue,
    base_task_xp: u64,
    streak_options: StreakOptions,
    /// Habit age already checked for milestones, per habit id
    milestone_ages: Mutex<HashMap<String, u32>>,
}

impl Session {
    /// Build the pipeline for `user_id` and load the first snapshot
    pub async fn start(
        user_id: UserId,
        habits: Arc<dyn HabitStore>,
        xp: Arc<dyn XpStore>,
        config: &Config,
    ) -> Self {
        let aggregator = StatsAggregator::new(habits.clone(), xp.clone(), config);
        aggregator.set_user(Some(user_id.clone()));

        let celebrations = CelebrationQueue::new(config.timing.celebration_settle());
        let watcher = LevelUpWatcher::new(celebrations.clone(), config.timing.watcher_grace());
        let watcher_task = watcher.spawn(aggregator.subscribe());

        let session = Self {
            user_id,
            habits,
            xp,
            aggregator,
            celebrations,
            watcher,
            watcher_task,
            toasts: QuestToastQueue::new(config.timing.toast_timings()),
            base_task_xp: config.progression.base_task_xp,
            streak_options: StreakOptions::with_rule(config.progression.streak_rule),
            milestone_ages: Mutex::new(HashMap::new()),
        };

        info!(user = %session.user_id, "Session started");
        session.aggregator.refresh_stats(true).await;
        session
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn aggregator(&self) -> &StatsAggregator {
        &self.aggregator
    }

    pub fn celebrations(&self) -> &CelebrationQueue {
        &self.celebrations
    }

    pub fn watcher(&self) -> &LevelUpWatcher {
        &self.watcher
    }

    pub fn toasts(&self) -> &QuestToastQueue {
        &self.toasts
    }

    /// Check off a task and run the reward pipeline.
    ///
    /// The store write must succeed; XP crediting failures are logged and left for the
    /// authoritative refresh to reconcile. Fails with `Unauthenticated` once the session
    /// has ended.
    pub async fn complete_task(
        &self,
        habit_id: &str,
        task_id: &str,
        date: NaiveDate,
    ) -> Result<TaskOutcome> {
        if self.aggregator.user_id().is_none() {
            return Err(HabitError::Unauthenticated);
        }
        self.habits
            .set_task_completion(habit_id, &self.user_id, date, task_id, true)
            .await?;

        let habit = self
            .habits
            .fetch_habits(&self.user_id)
            .await?
            .into_iter()
            .find(|h| h.id == habit_id)
            .ok_or_else(|| HabitError::NotFound(format!("habit {}", habit_id)))?;

        let streak = habit_streaks(&habit, date, &self.streak_options).current_streak;
        let xp_gained = streak_xp(self.base_task_xp, streak);
        debug!(habit_id, task_id, streak, xp_gained, "Task completed");

        let leveled_up = self
            .aggregator
            .update_stats_optimistically(xp_gained)
            .map(|o| o.leveled_up)
            .unwrap_or(false);

        if let Err(e) = self.xp.add_xp(&self.user_id, xp_gained).await {
            warn!("Failed to credit {} XP: {}", xp_gained, e);
        }

        let milestones_unlocked = self.celebrate_milestones(&habit, date);
        self.aggregator.refresh_stats(true).await;

        Ok(TaskOutcome {
            xp_gained,
            streak,
            leveled_up,
            milestones_unlocked,
        })
    }

    /// Queue celebrations for milestones the habit reached since it was last checked.
    ///
    /// The first check in a session only looks at the current day.
    fn celebrate_milestones(&self, habit: &Habit, date: NaiveDate) -> usize {
        let age = habit_age_days(habit.created_on(), date);
        let previous = {
            let mut ages = self
                .milestone_ages
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let seen = ages.entry(habit.id.clone()).or_insert(age.saturating_sub(1));
            let previous = *seen;
            *seen = (*seen).max(age);
            previous
        };

        let fresh = newly_unlocked(previous, age);
        match fresh.as_slice() {
            [] => 0,
            [single] => usize::from(self.celebrations.queue_milestone_single(single, &habit.name)),
            many => {
                if self.celebrations.queue_milestone_multiple(many, &habit.name) {
                    many.len()
                } else {
                    0
                }
            }
        }
    }

    /// Show a quest toast; XP rewards also bump the snapshot optimistically
    pub async fn complete_quest(&self, quest_name: &str, reward: QuestReward) -> Uuid {
        let xp = reward.xp();
        let id = self.toasts.show(quest_name, reward);
        if let Some(amount) = xp {
            self.aggregator.update_stats_optimistically(amount);
            if let Err(e) = self.xp.add_xp(&self.user_id, amount).await {
                warn!("Failed to credit quest XP: {}", e);
            }
        }
        id
    }

    /// Tear down derived state. The session is unusable afterwards.
    pub fn end(&self) {
        info!(user = %self.user_id, "Session ended");
        self.watcher_task.abort();
        self.watcher.reset();
        self.aggregator.set_user(None);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.watcher_task.abort();
    }
}

/// Follows the signed-in user and keeps one `Session` per user
pub struct SessionManager {
    habits: Arc<dyn HabitStore>,
    xp: Arc<dyn XpStore>,
    config: Config,
    session_tx: watch::Sender<Option<Arc<Session>>>,
}

impl SessionManager {
    pub fn new(habits: Arc<dyn HabitStore>, xp: Arc<dyn XpStore>, config: Config) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            habits,
            xp,
            config,
            session_tx,
        }
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.session_tx.subscribe()
    }

    /// Replace the current session. Same user is a no-op.
    pub async fn switch_user(&self, user_id: Option<UserId>) {
        let current = self.session();
        if current.as_ref().map(|s| s.user_id()) == user_id.as_deref() {
            return;
        }
        if let Some(old) = current {
            old.end();
            self.session_tx.send_replace(None);
        }

        let next = match user_id {
            Some(user_id) => Some(Arc::new(
                Session::start(user_id, self.habits.clone(), self.xp.clone(), &self.config)
                    .await,
            )),
            None => None,
        };
        self.session_tx.send_replace(next);
    }

    /// Drive sessions from the identity channel until it closes
    pub async fn run(&self, mut identity: watch::Receiver<Option<UserId>>) {
        let initial = identity.borrow_and_update().clone();
        self.switch_user(initial).await;
        while identity.changed().await.is_ok() {
            let user_id = identity.borrow_and_update().clone();
            self.switch_user(user_id).await;
        }
        debug!("Identity channel closed");
        self.switch_user(None).await;
    }
}
