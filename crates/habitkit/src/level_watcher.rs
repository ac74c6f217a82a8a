//! Level-up watcher.
//!
//! Follows the aggregator's level and turns upward transitions into level-up
//! celebrations. The first level seen is a baseline and never celebrated; changes during
//! the grace period after the baseline only move the baseline.

use crate::aggregator::SharedSnapshot;
use crate::celebration_queue::CelebrationQueue;
use habitkit_shared::titles::title_unlocked_at;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Default)]
struct WatcherState {
    previous_level: Option<u32>,
    shown_for_level: HashSet<u32>,
    /// When the baseline was taken; changes before `baseline_at + grace` are absorbed
    baseline_at: Option<Instant>,
}

#[derive(Clone)]
pub struct LevelUpWatcher {
    state: Arc<Mutex<WatcherState>>,
    queue: CelebrationQueue,
    grace: Duration,
}

impl LevelUpWatcher {
    pub fn new(queue: CelebrationQueue, grace: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(WatcherState::default())),
            queue,
            grace,
        }
    }

    fn state(&self) -> MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn previous_level(&self) -> Option<u32> {
        self.state().previous_level
    }

    /// Baseline taken and grace period over
    pub fn is_initialized(&self) -> bool {
        match self.state().baseline_at {
            Some(at) => at.elapsed() >= self.grace,
            None => false,
        }
    }

    /// Feed the latest level. `None` means the session ended.
    ///
    /// Returns true when a celebration was queued.
    pub fn observe(&self, level: Option<u32>) -> bool {
        let Some(level) = level else {
            self.reset();
            return false;
        };

        let mut state = self.state();
        let Some(baseline_at) = state.baseline_at else {
            debug!(level, "Level baseline recorded");
            state.previous_level = Some(level);
            state.baseline_at = Some(Instant::now());
            return false;
        };

        let previous = state.previous_level;
        state.previous_level = Some(level);

        if baseline_at.elapsed() < self.grace {
            debug!(level, "Level change during grace period");
            return false;
        }

        let rose = previous.map_or(false, |p| level > p);
        if !rose || !state.shown_for_level.insert(level) {
            return false;
        }
        drop(state);

        info!(level, previous = ?previous, "Level up detected");
        self.queue
            .queue_level_up(level, previous, title_unlocked_at(level))
    }

    /// Queue a level-up directly, skipping watcher state (support tooling)
    pub fn trigger_manual(&self, level: u32, previous: Option<u32>) -> bool {
        self.queue
            .queue_level_up(level, previous, title_unlocked_at(level))
    }

    /// Forget the baseline so the next session starts fresh
    pub fn reset(&self) {
        debug!("Level watcher reset");
        *self.state() = WatcherState::default();
    }

    /// Drive the watcher from snapshot updates until the sender is dropped
    pub fn spawn(&self, mut rx: watch::Receiver<SharedSnapshot>) -> JoinHandle<()> {
        let watcher = self.clone();
        tokio::spawn(async move {
            let initial = level_of(&rx.borrow_and_update());
            if initial.is_some() {
                watcher.observe(initial);
            }
            while rx.changed().await.is_ok() {
                let level = level_of(&rx.borrow_and_update());
                watcher.observe(level);
            }
            debug!("Snapshot channel closed, level watcher stopping");
        })
    }
}

fn level_of(snapshot: &SharedSnapshot) -> Option<u32> {
    snapshot.as_ref().map(|s| s.level)
}
