//! Passive income from auto miners.
//!
//! One call is one tick, nominally a minute. The server drives ticks on an
//! interval; clients may also trigger them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GameStats;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutoMineOutcome {
    pub coins_earned: i64,
    pub new_total: i64,
}

/// Coins one tick yields for the current rate.
pub fn coins_per_tick(stats: &GameStats) -> i64 {
    if stats.auto_miners == 0 {
        return 0;
    }
    (stats.auto_mining_rate.round() as i64).max(stats.auto_miners as i64)
}

impl GameStats {
    /// Run one auto-mine tick. Without miners nothing changes, not even
    /// `last_activity`. The balance saturates at `i64::MAX` and
    /// `coins_earned` reports what was actually credited.
    pub fn auto_mine(&mut self, now: DateTime<Utc>) -> AutoMineOutcome {
        let per_tick = coins_per_tick(self);
        let mut coins_earned = 0;
        if per_tick > 0 {
            let before = self.coins;
            self.coins = self.coins.saturating_add(per_tick);
            coins_earned = self.coins - before;
            self.last_activity = now;
        }
        AutoMineOutcome {
            coins_earned,
            new_total: self.coins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_miners_no_coins() {
        let mut stats = GameStats::default();
        stats.coins = 42;
        let before = stats.clone();
        let outcome = stats.auto_mine(Utc::now());
        assert_eq!(outcome, AutoMineOutcome { coins_earned: 0, new_total: 42 });
        assert_eq!(stats, before);
    }

    #[test]
    fn one_coin_per_miner() {
        let mut stats = GameStats::default();
        stats.auto_miners = 3;
        stats.recompute_auto_mining_rate();
        let outcome = stats.auto_mine(Utc::now());
        assert_eq!(outcome.coins_earned, 3);
        assert_eq!(stats.coins, 3);
    }

    #[test]
    fn balance_saturates_at_max() {
        let mut stats = GameStats::default();
        stats.auto_miners = 2;
        stats.recompute_auto_mining_rate();
        stats.coins = i64::MAX - 1;
        let outcome = stats.auto_mine(Utc::now());
        assert_eq!(outcome.coins_earned, 1);
        assert_eq!(outcome.new_total, i64::MAX);

        let outcome = stats.auto_mine(Utc::now());
        assert_eq!(outcome.coins_earned, 0);
        assert_eq!(stats.coins, i64::MAX);
    }

    #[test]
    fn efficiency_rounds_rate() {
        let mut stats = GameStats::default();
        stats.auto_miners = 1;
        stats.efficiency_level = 1;
        stats.recompute_auto_mining_rate();
        // 1.5 rounds away from zero
        assert_eq!(coins_per_tick(&stats), 2);

        stats.auto_miners = 3;
        stats.efficiency_level = 2;
        stats.recompute_auto_mining_rate();
        // 3 * 2.25 = 6.75
        assert_eq!(coins_per_tick(&stats), 7);
    }
}
