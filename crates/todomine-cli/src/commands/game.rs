use clap::Subcommand;
use todomine_core::StatsPatch;

use super::{open_game, print_events, print_json, CmdResult};

#[derive(Subcommand)]
pub enum GameAction {
    /// Print current game stats as JSON
    Stats,
    /// Edit stats directly
    Set {
        #[arg(long)]
        coins: Option<i64>,
        #[arg(long)]
        mining_power: Option<i64>,
        #[arg(long)]
        auto_miners: Option<i64>,
    },
    /// List upgrades with their next price
    Upgrades,
    /// Buy one level of an upgrade
    Buy {
        /// Upgrade ID (e.g. "mining_power", "auto_miner_1", "efficiency")
        upgrade_id: String,
    },
    /// Run one auto-mine tick
    AutoMine,
    /// List achievements and whether they are unlocked
    Achievements {
        /// Only show unlocked achievements
        #[arg(long)]
        unlocked: bool,
    },
}

pub fn run(action: GameAction) -> CmdResult {
    let mut game = open_game()?;

    match action {
        GameAction::Stats => print_json(&game.stats()?)?,
        GameAction::Set {
            coins,
            mining_power,
            auto_miners,
        } => {
            let patch = StatsPatch {
                coins,
                mining_power,
                auto_miners,
            };
            if patch == StatsPatch::default() {
                return Err("nothing to update".into());
            }
            print_json(&game.update_stats(&patch)?)?;
        }
        GameAction::Upgrades => print_json(&game.upgrades()?)?,
        GameAction::Buy { upgrade_id } => {
            print_json(&game.purchase_upgrade(&upgrade_id)?)?;
        }
        GameAction::AutoMine => print_json(&game.auto_mine()?)?,
        GameAction::Achievements { unlocked } => {
            let statuses: Vec<_> = game
                .achievements()?
                .into_iter()
                .filter(|s| !unlocked || s.unlocked())
                .collect();
            print_json(&statuses)?;
        }
    }

    print_events(&mut game)
}
