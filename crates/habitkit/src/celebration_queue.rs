//! Celebration queue.
//!
//! Single-consumer FIFO for blocking reward celebrations. Exactly one celebration is
//! current at a time. Each producer keeps a set of keys it has already shown for the
//! lifetime of the queue; repeats are dropped silently.
//!
//! Lifecycle: queued -> current -> dismissed. Dismissing clears `current` at once and
//! promotes the next item after a short settle delay.

use habitkit_shared::milestones::Milestone;
use habitkit_shared::titles::LevelTitle;
use habitkit_shared::{Celebration, CelebrationKind, MilestoneBadge};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Default)]
struct QueueState {
    current: Option<Celebration>,
    queue: VecDeque<Celebration>,
    shown_levels: HashSet<u32>,
    shown_milestones: HashSet<String>,
    promotion: Option<JoinHandle<()>>,
    /// Bumped whenever a promotion is armed; a timer only acts on its own generation
    promotion_seq: u64,
}

struct Shared {
    state: Mutex<QueueState>,
    current_tx: watch::Sender<Option<Celebration>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, current: Option<Celebration>) {
        self.current_tx.send_replace(current);
    }

    /// Promote the queue head if nothing is current and `seq` is still the armed timer
    fn promote_next(&self, seq: u64) {
        let mut state = self.state();
        if state.promotion_seq != seq {
            return;
        }
        state.promotion = None;
        if state.current.is_some() {
            return;
        }
        if let Some(next) = state.queue.pop_front() {
            info!("Showing celebration: {}", next.headline());
            state.current = Some(next.clone());
            drop(state);
            self.publish(Some(next));
        }
    }
}

/// Cloneable handle; clones share the same queue
#[derive(Clone)]
pub struct CelebrationQueue {
    shared: Arc<Shared>,
    settle: Duration,
}

impl CelebrationQueue {
    pub fn new(settle: Duration) -> Self {
        let (current_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                current_tx,
            }),
            settle,
        }
    }

    /// Celebration currently on screen
    pub fn current(&self) -> Option<Celebration> {
        self.shared.state().current.clone()
    }

    /// Observe the current celebration
    pub fn subscribe(&self) -> watch::Receiver<Option<Celebration>> {
        self.shared.current_tx.subscribe()
    }

    /// Items waiting behind the current one
    pub fn queued_len(&self) -> usize {
        self.shared.state().queue.len()
    }

    /// Add a celebration, showing it at once if nothing is current or waiting
    pub fn enqueue(&self, celebration: Celebration) {
        let mut state = self.shared.state();
        if state.current.is_none() && state.queue.is_empty() {
            info!("Showing celebration: {}", celebration.headline());
            // A pending promotion belongs to the previous dismiss
            if let Some(stale) = state.promotion.take() {
                stale.abort();
                state.promotion_seq += 1;
            }
            state.current = Some(celebration.clone());
            drop(state);
            self.shared.publish(Some(celebration));
        } else {
            debug!("Queued celebration: {}", celebration.headline());
            state.queue.push_back(celebration);
        }
    }

    /// Queue a level-up unless this level was already celebrated.
    ///
    /// Returns whether the celebration was accepted.
    pub fn queue_level_up(
        &self,
        new_level: u32,
        previous_level: Option<u32>,
        unlocked: Option<&LevelTitle>,
    ) -> bool {
        if !self.shared.state().shown_levels.insert(new_level) {
            debug!(new_level, "Level-up already celebrated");
            return false;
        }
        self.enqueue(Celebration::LevelUp {
            new_level,
            previous_level,
            unlocked_title: unlocked.map(|t| t.title.to_string()),
        });
        true
    }

    /// Queue one milestone unless its title was already celebrated
    pub fn queue_milestone_single(&self, milestone: &Milestone, habit_name: &str) -> bool {
        if !self
            .shared
            .state()
            .shown_milestones
            .insert(milestone.title.to_string())
        {
            debug!(title = milestone.title, "Milestone already celebrated");
            return false;
        }
        self.enqueue(Celebration::MilestoneSingle {
            habit_name: habit_name.to_string(),
            milestone: milestone.into(),
        });
        true
    }

    /// Queue a batch of milestones, dropping titles already celebrated.
    ///
    /// Nothing is queued when every title was seen before.
    pub fn queue_milestone_multiple(&self, milestones: &[Milestone], habit_name: &str) -> bool {
        let fresh: Vec<MilestoneBadge> = {
            let mut state = self.shared.state();
            milestones
                .iter()
                .filter(|m| state.shown_milestones.insert(m.title.to_string()))
                .map(MilestoneBadge::from)
                .collect()
        };
        if fresh.is_empty() {
            debug!("All milestones already celebrated");
            return false;
        }
        self.enqueue(Celebration::MilestoneMultiple {
            habit_name: habit_name.to_string(),
            milestones: fresh,
        });
        true
    }

    /// Close the current celebration and show the next one after the settle delay.
    ///
    /// The delay always runs from the latest dismiss of a shown item. Dismissing with
    /// nothing current keeps any promotion already pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dismiss_current_celebration(&self) {
        let mut state = self.shared.state();
        if let Some(dismissed) = state.current.take() {
            debug!("Dismissed celebration: {}", dismissed.headline());
            if let Some(stale) = state.promotion.take() {
                stale.abort();
            }
        }
        if state.promotion.is_none() {
            state.promotion_seq += 1;
            let seq = state.promotion_seq;
            let shared = Arc::downgrade(&self.shared);
            let settle = self.settle;
            state.promotion = Some(tokio::spawn(async move {
                tokio::time::sleep(settle).await;
                if let Some(shared) = shared.upgrade() {
                    shared.promote_next(seq);
                }
            }));
        }
        drop(state);
        self.shared.publish(None);
    }

    /// Whether a celebration of this kind is showing or waiting
    pub fn has_pending_celebration(&self, kind: CelebrationKind) -> bool {
        let state = self.shared.state();
        state.current.as_ref().map(|c| c.kind()) == Some(kind)
            || state.queue.iter().any(|c| c.kind() == kind)
    }
}
