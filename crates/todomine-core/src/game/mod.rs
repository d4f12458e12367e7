//! Game progression: coins, levels, streaks.
//!
//! Everything here is pure arithmetic over [`GameStats`]. Persistence and
//! event emission live in [`crate::service`].

pub mod achievements;
pub mod auto_mine;
pub mod upgrades;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::todo::Priority;

pub use achievements::{Achievement, AchievementId, AchievementStatus, ACHIEVEMENTS};
pub use auto_mine::AutoMineOutcome;
pub use upgrades::{PurchaseReceipt, Upgrade, UpgradeDef, UpgradeEffect, UPGRADES};

/// Single-user deployment: every stats row belongs to this id.
pub const DEFAULT_USER: &str = "default_user";

/// Experience granted per completion when deriving the level.
const EXP_PER_COMPLETION: u64 = 10;
const EXP_PER_LEVEL: u64 = 100;

/// Multiplier applied to the auto mining rate per efficiency level.
pub const EFFICIENCY_MULTIPLIER: f64 = 1.5;

/// Base coins for completing a todo, before mining power.
pub fn coin_reward(priority: Priority) -> i64 {
    match priority {
        Priority::Low => 10,
        Priority::Medium => 25,
        Priority::High => 50,
    }
}

/// Experience points for completing a todo.
pub fn exp_reward(priority: Priority) -> u64 {
    match priority {
        Priority::Low => 5,
        Priority::Medium => 15,
        Priority::High => 30,
    }
}

pub fn level_from_exp(total_exp: u64) -> u32 {
    ((total_exp / EXP_PER_LEVEL) + 1).max(1) as u32
}

/// Level is derived from the completion count, not accumulated experience.
pub fn level_for_completions(total_completed: u64) -> u32 {
    level_from_exp(total_completed * EXP_PER_COMPLETION)
}

/// Coins per auto-mine tick for the given miner count and efficiency.
pub fn auto_mining_rate(auto_miners: u32, efficiency_level: u32) -> f64 {
    auto_miners as f64 * EFFICIENCY_MULTIPLIER.powi(efficiency_level as i32)
}

/// Tunables that are not part of the stats themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// A completion continues the streak when the previous one happened at
    /// most this many UTC calendar days earlier.
    pub streak_grace_days: i64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            streak_grace_days: 1,
        }
    }
}

/// Persistent progression state of the player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStats {
    pub user_id: String,
    pub level: u32,
    pub coins: i64,
    pub mining_power: u32,
    pub auto_miners: u32,
    /// Coins granted per auto-mine tick.
    pub auto_mining_rate: f64,
    #[serde(default)]
    pub efficiency_level: u32,
    pub total_todos_completed: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub last_completion_at: Option<DateTime<Utc>>,
}

impl Default for GameStats {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

/// Rewards granted for one completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompletionReward {
    pub coins: i64,
    pub experience: u64,
    pub new_level: u32,
    pub leveled_up: bool,
    pub current_streak: u32,
}

/// Direct stats edit. Absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mining_power: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_miners: Option<i64>,
}

impl GameStats {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            user_id: DEFAULT_USER.to_string(),
            level: 1,
            coins: 0,
            mining_power: 1,
            auto_miners: 0,
            auto_mining_rate: 0.0,
            efficiency_level: 0,
            total_todos_completed: 0,
            current_streak: 0,
            best_streak: 0,
            last_activity: now,
            last_completion_at: None,
        }
    }

    pub fn recompute_auto_mining_rate(&mut self) {
        self.auto_mining_rate = auto_mining_rate(self.auto_miners, self.efficiency_level);
    }

    /// Apply the rewards for completing a todo of `priority` at `now`.
    pub fn award_completion(
        &mut self,
        priority: Priority,
        rules: &GameRules,
        now: DateTime<Utc>,
    ) -> CompletionReward {
        let coins = coin_reward(priority).saturating_mul(self.mining_power as i64);
        let previous_level = self.level;

        // Coins are capped at i64::MAX rather than wrapping negative.
        self.coins = self.coins.saturating_add(coins);
        self.total_todos_completed += 1;
        self.level = level_for_completions(self.total_todos_completed);
        self.current_streak = self.next_streak(rules, now);
        self.best_streak = self.best_streak.max(self.current_streak);
        self.last_completion_at = Some(now);
        self.last_activity = now;

        CompletionReward {
            coins,
            experience: exp_reward(priority),
            new_level: self.level,
            leveled_up: self.level > previous_level,
            current_streak: self.current_streak,
        }
    }

    fn next_streak(&self, rules: &GameRules, now: DateTime<Utc>) -> u32 {
        let Some(previous) = self.last_completion_at else {
            return 1;
        };
        let gap_days = (now.date_naive() - previous.date_naive()).num_days();
        if (0..=rules.streak_grace_days).contains(&gap_days) {
            self.current_streak + 1
        } else {
            1
        }
    }

    /// Apply a direct edit, validating every present field first.
    pub fn apply_patch(
        &mut self,
        patch: &StatsPatch,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        check_min("coins", patch.coins, 0)?;
        check_min("mining_power", patch.mining_power, 1)?;
        check_min("auto_miners", patch.auto_miners, 0)?;

        if let Some(coins) = patch.coins {
            self.coins = coins;
        }
        if let Some(power) = patch.mining_power {
            self.mining_power = to_u32("mining_power", power)?;
        }
        if let Some(miners) = patch.auto_miners {
            self.auto_miners = to_u32("auto_miners", miners)?;
            self.recompute_auto_mining_rate();
        }
        self.last_activity = now;
        Ok(())
    }
}

fn check_min(field: &str, value: Option<i64>, min: i64) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < min => Err(ValidationError::BelowMinimum {
            field: field.to_string(),
            min,
            value: v,
        }),
        _ => Ok(()),
    }
}

fn to_u32(field: &str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("{value} is out of range"),
    })
}
