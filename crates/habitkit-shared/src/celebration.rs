//! Celebration payloads.
//!
//! Celebrations are blocking, one-at-a-time reward notifications. Each carries the
//! semantic keys used to drop repeats: the level number or the milestone titles.

use crate::milestones::Milestone;
use crate::tiers::Tier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationKind {
    LevelUp,
    MilestoneSingle,
    MilestoneMultiple,
}

/// Display data for an unlocked milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneBadge {
    pub days: u32,
    pub title: String,
    pub description: String,
    pub reward_xp: u64,
    pub tier: Tier,
}

impl From<&Milestone> for MilestoneBadge {
    fn from(m: &Milestone) -> Self {
        Self {
            days: m.days,
            title: m.title.to_string(),
            description: m.description.to_string(),
            reward_xp: m.reward_xp,
            tier: m.tier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Celebration {
    LevelUp {
        new_level: u32,
        previous_level: Option<u32>,
        /// Title unlocked at this level, if any
        unlocked_title: Option<String>,
    },
    MilestoneSingle {
        habit_name: String,
        milestone: MilestoneBadge,
    },
    MilestoneMultiple {
        habit_name: String,
        milestones: Vec<MilestoneBadge>,
    },
}

impl Celebration {
    pub fn kind(&self) -> CelebrationKind {
        match self {
            Celebration::LevelUp { .. } => CelebrationKind::LevelUp,
            Celebration::MilestoneSingle { .. } => CelebrationKind::MilestoneSingle,
            Celebration::MilestoneMultiple { .. } => CelebrationKind::MilestoneMultiple,
        }
    }

    /// De-duplication keys carried by this celebration
    pub fn dedup_keys(&self) -> Vec<String> {
        match self {
            Celebration::LevelUp { new_level, .. } => vec![new_level.to_string()],
            Celebration::MilestoneSingle { milestone, .. } => vec![milestone.title.clone()],
            Celebration::MilestoneMultiple { milestones, .. } => {
                milestones.iter().map(|m| m.title.clone()).collect()
            }
        }
    }

    /// Total XP reward shown with the celebration
    pub fn reward_xp(&self) -> u64 {
        match self {
            Celebration::LevelUp { .. } => 0,
            Celebration::MilestoneSingle { milestone, .. } => milestone.reward_xp,
            Celebration::MilestoneMultiple { milestones, .. } => {
                milestones.iter().map(|m| m.reward_xp).sum()
            }
        }
    }

    /// One-line summary for logs
    pub fn headline(&self) -> String {
        match self {
            Celebration::LevelUp {
                new_level,
                unlocked_title: Some(title),
                ..
            } => format!("Level {} reached - new title: {}", new_level, title),
            Celebration::LevelUp { new_level, .. } => format!("Level {} reached", new_level),
            Celebration::MilestoneSingle {
                habit_name,
                milestone,
            } => format!("{}: {} ({} days)", habit_name, milestone.title, milestone.days),
            Celebration::MilestoneMultiple {
                habit_name,
                milestones,
            } => format!("{}: {} milestones unlocked", habit_name, milestones.len()),
        }
    }
}
