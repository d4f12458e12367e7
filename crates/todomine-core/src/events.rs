use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{AchievementId, CompletionReward};
use crate::todo::Priority;

/// Every state change in the game produces an Event.
/// Clients poll for events to drive toasts and the mine animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TodoCreated {
        todo_id: String,
        title: String,
        at: DateTime<Utc>,
    },
    TodoCompleted {
        todo_id: String,
        priority: Priority,
        reward: CompletionReward,
        at: DateTime<Utc>,
    },
    TodoReopened {
        todo_id: String,
        at: DateTime<Utc>,
    },
    TodoDeleted {
        todo_id: String,
        at: DateTime<Utc>,
    },
    StatsEdited {
        at: DateTime<Utc>,
    },
    UpgradePurchased {
        upgrade_id: String,
        cost: i64,
        new_level: u32,
        at: DateTime<Utc>,
    },
    AutoMined {
        coins_earned: i64,
        new_total: i64,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        achievement_id: AchievementId,
        name: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TodoCreated { at, .. }
            | Event::TodoCompleted { at, .. }
            | Event::TodoReopened { at, .. }
            | Event::TodoDeleted { at, .. }
            | Event::StatsEdited { at }
            | Event::UpgradePurchased { at, .. }
            | Event::AutoMined { at, .. }
            | Event::AchievementUnlocked { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_wire_format() {
        let now = Utc::now();
        let event = Event::AchievementUnlocked {
            achievement_id: AchievementId::FirstTask,
            name: "Novice Miner".into(),
            at: now,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "achievement_unlocked");
        assert_eq!(json["achievement_id"], "first_task");
        assert_eq!(event.at(), now);
    }
}
