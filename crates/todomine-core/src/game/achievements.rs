//! Achievement catalog and unlock checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::GameStats;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstTask,
    TaskMaster,
    StreakChampion,
    CoinCollector,
    AutomationMaster,
}

impl AchievementId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::FirstTask => "first_task",
            AchievementId::TaskMaster => "task_master",
            AchievementId::StreakChampion => "streak_champion",
            AchievementId::CoinCollector => "coin_collector",
            AchievementId::AutomationMaster => "automation_master",
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ACHIEVEMENTS
            .iter()
            .map(|a| a.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CoreError::not_found("Achievement", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    #[serde(skip)]
    condition: fn(&GameStats) -> bool,
}

impl Achievement {
    pub fn is_met(&self, stats: &GameStats) -> bool {
        (self.condition)(stats)
    }
}

pub const ACHIEVEMENTS: [Achievement; 5] = [
    Achievement {
        id: AchievementId::FirstTask,
        name: "Novice Miner",
        description: "Complete your first task",
        icon: "⛏️",
        condition: |s| s.total_todos_completed >= 1,
    },
    Achievement {
        id: AchievementId::TaskMaster,
        name: "Task Master",
        description: "Complete 10 tasks",
        icon: "👑",
        condition: |s| s.total_todos_completed >= 10,
    },
    Achievement {
        id: AchievementId::StreakChampion,
        name: "Streak Champion",
        description: "Complete 5 tasks in a row",
        icon: "🔥",
        condition: |s| s.current_streak >= 5,
    },
    Achievement {
        id: AchievementId::CoinCollector,
        name: "Coin Collector",
        description: "Collect 1000 coins",
        icon: "💰",
        condition: |s| s.coins >= 1000,
    },
    Achievement {
        id: AchievementId::AutomationMaster,
        name: "Automation Master",
        description: "Buy your first auto miner",
        icon: "🤖",
        condition: |s| s.auto_miners >= 1,
    },
];

pub fn get(id: AchievementId) -> &'static Achievement {
    // The catalog holds every id exactly once.
    ACHIEVEMENTS
        .iter()
        .find(|a| a.id == id)
        .unwrap_or(&ACHIEVEMENTS[0])
}

/// Achievements whose condition now holds and which are not yet unlocked,
/// in catalog order.
pub fn check(stats: &GameStats, unlocked: &[AchievementId]) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !unlocked.contains(&a.id) && a.is_met(stats))
        .collect()
}

/// Catalog entry joined with its unlock record.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl AchievementStatus {
    pub fn unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_for_fresh_player() {
        assert!(check(&GameStats::default(), &[]).is_empty());
    }

    #[test]
    fn first_completion_unlocks_first_task() {
        let mut stats = GameStats::default();
        stats.total_todos_completed = 1;
        let ids: Vec<_> = check(&stats, &[]).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![AchievementId::FirstTask]);
    }

    #[test]
    fn already_unlocked_are_skipped() {
        let mut stats = GameStats::default();
        stats.total_todos_completed = 12;
        stats.coins = 5000;
        let ids: Vec<_> = check(&stats, &[AchievementId::FirstTask])
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![AchievementId::TaskMaster, AchievementId::CoinCollector]);
    }

    #[test]
    fn thresholds() {
        let mut stats = GameStats::default();
        stats.current_streak = 4;
        stats.coins = 999;
        assert!(check(&stats, &[]).is_empty());
        stats.current_streak = 5;
        stats.coins = 1000;
        stats.auto_miners = 1;
        assert_eq!(check(&stats, &[]).len(), 3);
    }

    #[test]
    fn ids_roundtrip_through_strings() {
        for a in ACHIEVEMENTS.iter() {
            assert_eq!(a.id.as_str().parse::<AchievementId>().unwrap(), a.id);
            assert_eq!(get(a.id).name, a.name);
        }
        assert!("gold_rush".parse::<AchievementId>().is_err());
    }

    #[test]
    fn status_serializes_flat() {
        let status = AchievementStatus {
            achievement: *get(AchievementId::CoinCollector),
            unlocked_at: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["id"], "coin_collector");
        assert_eq!(json["name"], "Coin Collector");
        assert!(json["unlocked_at"].is_null());
    }
}
