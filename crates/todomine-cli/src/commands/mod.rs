pub mod config;
pub mod game;
pub mod mine;
pub mod todo;

use todomine_core::{Config, MiningGame};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the game with rules from the user's config.
pub fn open_game() -> Result<MiningGame, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(MiningGame::open(&config)?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report the events the last operation produced on stderr, one compact
/// JSON object per line, so stdout stays a single JSON document.
pub fn print_events(game: &mut MiningGame) -> CmdResult {
    for event in game.drain_events() {
        eprintln!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}
