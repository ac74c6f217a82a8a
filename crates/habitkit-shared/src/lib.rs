//! Shared types and calculators for habitkit.
//!
//! Everything here is pure and synchronous: the XP/level curve, titles, tiers,
//! milestones, streaks and the value types that flow through the async pipeline.

pub mod celebration;
pub mod error;
pub mod habit;
pub mod levels;
pub mod milestones;
pub mod reward;
pub mod snapshot;
pub mod streaks;
pub mod tiers;
pub mod titles;

pub use celebration::{Celebration, CelebrationKind, MilestoneBadge};
pub use error::{HabitError, Result};
pub use habit::{DailyTaskProgress, Habit, Polarity};
pub use levels::{level_from_total_xp, total_xp_for_level, xp_for_next_level, LevelProgress};
pub use milestones::Milestone;
pub use reward::{QuestReward, QuestToast};
pub use snapshot::{OptimisticOutcome, RolloverPolicy, StatsSnapshot};
pub use streaks::{StreakOptions, StreakRule, StreakStats};
pub use tiers::Tier;

/// Identifier of an authenticated user
pub type UserId = String;

/// Base XP for one completed task before the tier multiplier
pub const BASE_TASK_XP: u64 = 10;
