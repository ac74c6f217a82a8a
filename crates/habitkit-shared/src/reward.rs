//! Quest rewards and toast payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a completed quest grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum QuestReward {
    Xp { amount: u64 },
    /// Temporary XP multiplier, in percent
    Boost {
        multiplier_pct: u32,
        duration_minutes: u32,
    },
    Title { title: String },
}

impl QuestReward {
    /// XP granted immediately, if any
    pub fn xp(&self) -> Option<u64> {
        match self {
            QuestReward::Xp { amount } => Some(*amount),
            QuestReward::Boost { .. } | QuestReward::Title { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            QuestReward::Xp { amount } => format!("+{} XP", amount),
            QuestReward::Boost {
                multiplier_pct,
                duration_minutes,
            } => format!(
                "{}.{:02}x XP boost for {} min",
                multiplier_pct / 100,
                multiplier_pct % 100,
                duration_minutes
            ),
            QuestReward::Title { title } => format!("New title: {}", title),
        }
    }
}

/// Auto-dismissing notification for a completed quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestToast {
    pub id: Uuid,
    pub quest_name: String,
    pub reward: QuestReward,
}

impl QuestToast {
    pub fn new(quest_name: &str, reward: QuestReward) -> Self {
        Self {
            id: Uuid::new_v4(),
            quest_name: quest_name.to_string(),
            reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(QuestReward::Xp { amount: 50 }.describe(), "+50 XP");
        let boost = QuestReward::Boost {
            multiplier_pct: 150,
            duration_minutes: 30,
        };
        assert_eq!(boost.describe(), "1.50x XP boost for 30 min");
        assert_eq!(boost.xp(), None);
    }

    #[test]
    fn test_serde_tag() {
        let json = serde_json::to_value(QuestReward::Title {
            title: "Early Riser".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "TITLE");

        let back: QuestReward = serde_json::from_str(r#"{"kind":"XP","amount":20}"#).unwrap();
        assert_eq!(back, QuestReward::Xp { amount: 20 });
    }

    #[test]
    fn test_toast_ids_unique() {
        let a = QuestToast::new("Hydrate", QuestReward::Xp { amount: 10 });
        let b = QuestToast::new("Hydrate", QuestReward::Xp { amount: 10 });
        assert_ne!(a.id, b.id);
    }
}
