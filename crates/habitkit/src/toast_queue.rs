//! Quest toast queue.
//!
//! FIFO of auto-dismissing reward toasts. One toast is on screen at a time; it stays
//! visible for the display duration, then hides, and after the hide animation plus a
//! short gap the next toast is promoted. Toasts are not deduplicated.

use crate::config::ToastTimings;
use habitkit_shared::{QuestReward, QuestToast};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// What the toast surface renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastView {
    pub toast: QuestToast,
    /// False while the hide animation runs
    pub visible: bool,
}

#[derive(Default)]
struct ToastState {
    queue: VecDeque<QuestToast>,
    current: Option<QuestToast>,
    visible: bool,
    /// Between hide and clear
    processing: bool,
    timer: Option<JoinHandle<()>>,
}

impl ToastState {
    fn view(&self) -> Option<ToastView> {
        self.current.as_ref().map(|toast| ToastView {
            toast: toast.clone(),
            visible: self.visible,
        })
    }
}

struct Shared {
    state: Mutex<ToastState>,
    view_tx: watch::Sender<Option<ToastView>>,
    timings: ToastTimings,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ToastState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show the queue head. Caller checks nothing is current.
    fn promote_locked(self: &Arc<Self>, state: &mut ToastState) {
        if let Some(next) = state.queue.pop_front() {
            info!(quest = %next.quest_name, reward = %next.reward.describe(), "Showing toast");
            state.current = Some(next);
            state.visible = true;
            state.timer = Some(spawn_lifecycle(self, Some(self.timings.display)));
        }
    }

    /// Start the hide animation. Returns false if nothing is visible.
    fn hide(&self) -> bool {
        let mut state = self.state();
        if !hide_locked(&mut state) {
            return false;
        }
        let view = state.view();
        drop(state);
        self.view_tx.send_replace(view);
        true
    }

    fn clear_and_promote(self: &Arc<Self>) {
        let mut state = self.state();
        if let Some(done) = state.current.take() {
            debug!(id = %done.id, "Toast cleared");
        }
        state.visible = false;
        state.processing = false;
        state.timer = None;
        self.promote_locked(&mut state);
        let view = state.view();
        drop(state);
        self.view_tx.send_replace(view);
    }
}

fn hide_locked(state: &mut ToastState) -> bool {
    if state.current.is_none() || !state.visible {
        return false;
    }
    state.visible = false;
    state.processing = true;
    true
}

/// Display, then hide, then clear. `show_for` is `None` when the toast is already hidden.
fn spawn_lifecycle(shared: &Arc<Shared>, show_for: Option<Duration>) -> JoinHandle<()> {
    let weak = Arc::downgrade(shared);
    let settle = shared.timings.hide + shared.timings.gap;
    tokio::spawn(async move {
        if let Some(display) = show_for {
            tokio::time::sleep(display).await;
            match weak.upgrade() {
                Some(shared) => {
                    shared.hide();
                }
                None => return,
            }
        }
        tokio::time::sleep(settle).await;
        if let Some(shared) = weak.upgrade() {
            shared.clear_and_promote();
        }
    })
}

/// Cloneable handle; clones share the same queue
#[derive(Clone)]
pub struct QuestToastQueue {
    shared: Arc<Shared>,
}

impl QuestToastQueue {
    pub fn new(timings: ToastTimings) -> Self {
        let (view_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ToastState::default()),
                view_tx,
                timings,
            }),
        }
    }

    /// Queue a toast for a completed quest.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, quest_name: &str, reward: QuestReward) -> Uuid {
        let toast = QuestToast::new(quest_name, reward);
        let id = toast.id;

        let mut state = self.shared.state();
        state.queue.push_back(toast);
        if state.current.is_none() && !state.processing {
            self.shared.promote_locked(&mut state);
            let view = state.view();
            drop(state);
            self.shared.view_tx.send_replace(view);
        } else {
            debug!(%id, pending = state.queue.len(), "Toast queued");
        }
        id
    }

    /// Hide the current toast now instead of waiting for the display timer.
    ///
    /// No-op when nothing is visible, including while a hide is already running.
    pub fn dismiss(&self) {
        let mut state = self.shared.state();
        if !hide_locked(&mut state) {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        debug!("Toast dismissed");
        state.timer = Some(spawn_lifecycle(&self.shared, None));
        let view = state.view();
        drop(state);
        self.shared.view_tx.send_replace(view);
    }

    pub fn current(&self) -> Option<ToastView> {
        self.shared.state().view()
    }

    /// Toasts waiting behind the current one
    pub fn pending_len(&self) -> usize {
        self.shared.state().queue.len()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ToastView>> {
        self.shared.view_tx.subscribe()
    }
}
