//! Level titles.
//!
//! Static, ordered table of titles unlocked by reaching a level. Thresholds are strictly
//! increasing; the current title is the last entry at or below the current level.

use serde::Serialize;

/// A title unlocked at a level threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelTitle {
    pub level: u32,
    pub title: &'static str,
    pub description: &'static str,
}

impl LevelTitle {
    const fn new(level: u32, title: &'static str, description: &'static str) -> Self {
        Self {
            level,
            title,
            description,
        }
    }
}

pub const LEVEL_TITLES: &[LevelTitle] = &[
    LevelTitle::new(1, "Novice", "Every streak starts with a single day"),
    LevelTitle::new(3, "Apprentice", "Showing up is becoming a habit"),
    LevelTitle::new(5, "Habit Builder", "Routines are taking shape"),
    LevelTitle::new(10, "Consistent", "Ten levels of steady effort"),
    LevelTitle::new(15, "Dedicated", "Discipline over motivation"),
    LevelTitle::new(20, "Disciplined", "Habits run on autopilot"),
    LevelTitle::new(25, "Master of Routine", "Consistency is second nature"),
    LevelTitle::new(30, "Habit Sage", "Others look to you for advice"),
    LevelTitle::new(40, "Legend", "A living example of persistence"),
    LevelTitle::new(50, "Mythic", "Beyond the curve"),
];

/// Title for a level. Levels below the first threshold get the first title.
pub fn current_title(level: u32) -> &'static LevelTitle {
    LEVEL_TITLES
        .iter()
        .rev()
        .find(|t| t.level <= level)
        .unwrap_or(&LEVEL_TITLES[0])
}

/// Next title still to unlock, if any
pub fn next_title(level: u32) -> Option<&'static LevelTitle> {
    LEVEL_TITLES.iter().find(|t| t.level > level)
}

/// Title unlocked exactly at this level
pub fn title_unlocked_at(level: u32) -> Option<&'static LevelTitle> {
    LEVEL_TITLES.iter().find(|t| t.level == level)
}
