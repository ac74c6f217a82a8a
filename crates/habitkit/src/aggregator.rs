//! Stats aggregator.
//!
//! Combines parallel reads from the habit and XP stores into one `StatsSnapshot` and
//! publishes it on a watch channel. Two mutation paths exist:
//!
//! - `refresh_stats` replaces the snapshot with an authoritative one (debounced).
//! - `update_stats_optimistically` predicts the next snapshot locally.
//!
//! Whichever write lands last wins. A refresh that resolves after an optimistic update
//! overwrites the prediction; no version check is applied.

use crate::config::Config;
use crate::store::{AggregatedStats, HabitStore, TodayStats, UserXpStats, XpStore};
use habitkit_shared::levels::level_from_total_xp;
use habitkit_shared::titles::current_title;
use habitkit_shared::{
    Habit, HabitError, OptimisticOutcome, RolloverPolicy, StatsSnapshot, UserId,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Shared, immutable snapshot as seen by subscribers
pub type SharedSnapshot = Option<Arc<StatsSnapshot>>;

#[derive(Default)]
struct AggregatorState {
    user_id: Option<UserId>,
    last_refresh: Option<Instant>,
}

pub struct StatsAggregator {
    habits: Arc<dyn HabitStore>,
    xp: Arc<dyn XpStore>,
    state: Mutex<AggregatorState>,
    snapshot_tx: watch::Sender<SharedSnapshot>,
    debounce: Duration,
    rollover: RolloverPolicy,
}

impl StatsAggregator {
    pub fn new(habits: Arc<dyn HabitStore>, xp: Arc<dyn XpStore>, config: &Config) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            habits,
            xp,
            state: Mutex::new(AggregatorState::default()),
            snapshot_tx,
            debounce: config.timing.refresh_debounce(),
            rollover: config.progression.rollover,
        }
    }

    fn state(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot, if one has loaded
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Observe snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.state().user_id.clone()
    }

    /// Switch the signed-in user. Any change clears the snapshot; the next refresh loads
    /// the new user's stats.
    pub fn set_user(&self, user_id: Option<UserId>) {
        let mut state = self.state();
        if state.user_id == user_id {
            return;
        }
        state.last_refresh = None;
        state.user_id = user_id;
        let signed_out = state.user_id.is_none();
        drop(state);

        if signed_out {
            info!("Session ended, clearing stats");
        } else {
            debug!("User changed, clearing stats");
        }
        let loaded = self.snapshot_tx.borrow().is_some();
        if loaded {
            self.snapshot_tx.send_replace(None);
        }
    }

    /// Fetch fresh stats and replace the snapshot.
    ///
    /// Non-forced calls within the debounce window of the last successful refresh are
    /// skipped. Failures are logged and the previous snapshot is kept.
    pub async fn refresh_stats(&self, force_refresh: bool) {
        let user_id = {
            let state = self.state();
            let Some(user_id) = state.user_id.clone() else {
                debug!("No user, skipping refresh");
                return;
            };
            if !force_refresh {
                if let Some(last) = state.last_refresh {
                    if last.elapsed() < self.debounce {
                        debug!("Refresh debounced");
                        return;
                    }
                }
            }
            user_id
        };

        let (xp, aggregated, active, today, global_streak, habits) = tokio::join!(
            self.xp.get_user_xp_stats(&user_id),
            self.habits.get_aggregated_stats(&user_id),
            self.habits.get_active_habits_count(&user_id),
            self.habits.get_today_stats(&user_id),
            self.habits.get_global_streak(&user_id),
            self.habits.fetch_habits(&user_id),
        );

        // Session may have changed while the reads were in flight
        if self.state().user_id.as_deref() != Some(user_id.as_str()) {
            debug!("User changed during refresh, dropping result");
            return;
        }

        let xp = match xp {
            Ok(xp) => xp,
            Err(e) => {
                warn!("XP stats fetch failed, keeping previous snapshot: {}", e);
                return;
            }
        };

        let previous = self.snapshot();
        let snapshot = compose_snapshot(
            previous.as_deref(),
            &xp,
            absorb("aggregated stats", aggregated),
            absorb("active habits", active),
            absorb("today stats", today),
            absorb("global streak", global_streak),
            absorb("habits", habits),
        );

        info!(
            level = snapshot.level,
            total_xp = snapshot.total_xp,
            "Stats refreshed"
        );
        self.state().last_refresh = Some(Instant::now());
        self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// Apply an unconfirmed XP gain to the current snapshot.
    ///
    /// Returns `None` when no snapshot has loaded yet.
    pub fn update_stats_optimistically(&self, xp_delta: u64) -> Option<OptimisticOutcome> {
        let mut outcome = None;
        // Read and replace under the channel's lock so concurrent deltas all land
        self.snapshot_tx.send_if_modified(|current| {
            let Some(snapshot) = current.as_ref() else {
                return false;
            };
            let (next, applied) = snapshot.with_xp_delta(xp_delta, self.rollover);
            *current = Some(Arc::new(next));
            outcome = Some(applied);
            true
        });
        let outcome = outcome?;
        debug!(
            xp_delta,
            new_level = outcome.new_level,
            leveled_up = outcome.leveled_up,
            "Optimistic stats update"
        );
        Some(outcome)
    }
}

fn absorb<T>(what: &str, result: Result<T, HabitError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to fetch {}: {}", what, e);
            None
        }
    }
}

/// Build a snapshot from fresh reads, falling back to the previous snapshot's values for
/// any read that failed
fn compose_snapshot(
    previous: Option<&StatsSnapshot>,
    xp: &UserXpStats,
    aggregated: Option<AggregatedStats>,
    active_habits: Option<u32>,
    today: Option<TodayStats>,
    global_streak: Option<u32>,
    habits: Option<Vec<Habit>>,
) -> StatsSnapshot {
    let progress = level_from_total_xp(xp.total_xp);
    if xp.current_level != 0 && xp.current_level != progress.level {
        debug!(
            stored = xp.current_level,
            derived = progress.level,
            "Stored level disagrees with XP curve, using curve"
        );
    }

    let fallback = previous.cloned().unwrap_or_default();
    let (today_completed, today_total) = today
        .map(|t| (t.completed, t.total))
        .unwrap_or((fallback.today_completed, fallback.today_total));

    StatsSnapshot {
        title: current_title(progress.level).title.to_string(),
        level: progress.level,
        current_level_xp: progress.current_level_xp,
        xp_for_next_level: progress.xp_for_next_level,
        progress_pct: progress.progress_pct,
        total_streak_days: aggregated
            .as_ref()
            .map(|a| a.total_streak_days())
            .unwrap_or(fallback.total_streak_days),
        active_habits: active_habits.unwrap_or(fallback.active_habits),
        today_completed,
        today_total,
        total_xp: xp.total_xp,
        total_completions: aggregated
            .as_ref()
            .map(|a| a.total_completions)
            .unwrap_or(fallback.total_completions),
        perfect_days: habits
            .map(|hs| hs.iter().map(|h| h.perfect_days()).sum())
            .unwrap_or(fallback.perfect_days),
        global_streak: global_streak.unwrap_or(fallback.global_streak),
        days_tracked: aggregated
            .as_ref()
            .map(|a| a.total_days_tracked)
            .unwrap_or(fallback.days_tracked),
        habit_xp: aggregated
            .as_ref()
            .map(|a| a.total_habit_xp)
            .unwrap_or(fallback.habit_xp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_uses_curve() {
        let xp = UserXpStats {
            total_xp: 250,
            current_level: 3,
            ..Default::default()
        };
        let s = compose_snapshot(None, &xp, None, Some(2), None, None, None);
        assert_eq!(s.level, 3);
        assert_eq!(s.current_level_xp, 30);
        assert_eq!(s.active_habits, 2);
        assert_eq!(s.title, "Apprentice");
    }

    #[test]
    fn test_compose_falls_back_to_previous() {
        let previous = StatsSnapshot {
            active_habits: 4,
            today_completed: 2,
            today_total: 6,
            global_streak: 9,
            ..StatsSnapshot::default()
        };
        let xp = UserXpStats::default();
        let s = compose_snapshot(Some(&previous), &xp, None, None, None, None, None);
        assert_eq!(s.active_habits, 4);
        assert_eq!(s.today_completed, 2);
        assert_eq!(s.today_total, 6);
        assert_eq!(s.global_streak, 9);
    }

    #[test]
    fn test_compose_carries_store_totals() {
        let aggregated = AggregatedStats {
            total_completions: 12,
            total_days_tracked: 8,
            total_habit_xp: 140,
            ..Default::default()
        };
        let xp = UserXpStats::default();
        let s = compose_snapshot(None, &xp, Some(aggregated), None, None, None, None);
        assert_eq!(s.total_completions, 12);
        assert_eq!(s.days_tracked, 8);
        assert_eq!(s.habit_xp, 140);

        // A failed aggregated read keeps the previous totals
        let again = compose_snapshot(Some(&s), &xp, None, None, None, None, None);
        assert_eq!(again.days_tracked, 8);
        assert_eq!(again.habit_xp, 140);
    }
}
