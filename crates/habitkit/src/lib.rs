//! habitkit library - progression and celebration pipeline, exposes modules for testing.

pub mod aggregator;
pub mod celebration_queue;
pub mod config;
pub mod level_watcher;
pub mod memory_store;
pub mod session;
pub mod store;
pub mod toast_queue;

pub use aggregator::{SharedSnapshot, StatsAggregator};
pub use celebration_queue::CelebrationQueue;
pub use config::{Config, ToastTimings};
pub use level_watcher::LevelUpWatcher;
pub use memory_store::InMemoryStore;
pub use session::{Session, SessionManager, TaskOutcome};
pub use store::{HabitStore, XpStore};
pub use toast_queue::{QuestToastQueue, ToastView};
