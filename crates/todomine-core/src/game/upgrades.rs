//! Upgrade catalog and purchase rules.

use serde::{Deserialize, Serialize};

use super::GameStats;
use crate::error::{CoreError, Result};

/// What buying one level of an upgrade changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// +1 mining power (coin multiplier for completions)
    MiningPower,
    /// +1 auto miner
    AutoMining,
    /// Auto mining rate x1.5
    Efficiency,
}

/// Static definition of a purchasable upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_cost: i64,
    pub effect: UpgradeEffect,
    pub max_level: u32,
}

pub const UPGRADES: [UpgradeDef; 3] = [
    UpgradeDef {
        id: "mining_power",
        name: "Better Pickaxe",
        description: "Increases coins per todo completion",
        base_cost: 100,
        effect: UpgradeEffect::MiningPower,
        max_level: 10,
    },
    UpgradeDef {
        id: "auto_miner_1",
        name: "Basic Auto Miner",
        description: "Automatically generates 1 coin per minute",
        base_cost: 500,
        effect: UpgradeEffect::AutoMining,
        max_level: 5,
    },
    UpgradeDef {
        id: "efficiency",
        name: "Mining Efficiency",
        description: "Increases auto mining rate by 50%",
        base_cost: 1000,
        effect: UpgradeEffect::Efficiency,
        max_level: 5,
    },
];

/// An upgrade as presented to the player: definition plus current price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Upgrade {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: i64,
    pub effect: UpgradeEffect,
    pub max_level: u32,
    pub current_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseReceipt {
    pub message: String,
    pub cost: i64,
    pub new_level: u32,
}

pub fn find(id: &str) -> Option<&'static UpgradeDef> {
    UPGRADES.iter().find(|u| u.id == id)
}

impl UpgradeDef {
    pub fn current_level(&self, stats: &GameStats) -> u32 {
        match self.effect {
            UpgradeEffect::MiningPower => stats.mining_power.saturating_sub(1),
            UpgradeEffect::AutoMining => stats.auto_miners,
            UpgradeEffect::Efficiency => stats.efficiency_level,
        }
    }

    /// `base_cost * 2^level`, saturating instead of overflowing.
    pub fn cost_at(&self, level: u32) -> i64 {
        2i64.checked_pow(level)
            .and_then(|m| self.base_cost.checked_mul(m))
            .unwrap_or(i64::MAX)
    }

    pub fn view(&self, stats: &GameStats) -> Upgrade {
        let current_level = self.current_level(stats);
        Upgrade {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            cost: self.cost_at(current_level),
            effect: self.effect,
            max_level: self.max_level,
            current_level,
        }
    }

    /// Buy one level. On error the stats are left untouched.
    pub fn purchase(&self, stats: &mut GameStats) -> Result<PurchaseReceipt> {
        let level = self.current_level(stats);
        if level >= self.max_level {
            return Err(CoreError::Rejected("Upgrade already at max level".into()));
        }
        let cost = self.cost_at(level);
        if stats.coins < cost {
            return Err(CoreError::Rejected("Not enough coins".into()));
        }

        stats.coins -= cost;
        match self.effect {
            UpgradeEffect::MiningPower => stats.mining_power += 1,
            UpgradeEffect::AutoMining => stats.auto_miners += 1,
            UpgradeEffect::Efficiency => stats.efficiency_level += 1,
        }
        stats.recompute_auto_mining_rate();

        Ok(PurchaseReceipt {
            message: format!("Upgrade {} purchased successfully", self.name),
            cost,
            new_level: level + 1,
        })
    }
}

/// All upgrades priced for the given stats, in catalog order.
pub fn list(stats: &GameStats) -> Vec<Upgrade> {
    UPGRADES.iter().map(|u| u.view(stats)).collect()
}
