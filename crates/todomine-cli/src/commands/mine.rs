use clap::Subcommand;
use serde::Serialize;
use todomine_core::mine::{now_ms, MinerPhase};
use todomine_core::{Config, Database, MineScene, SceneEvent, SceneSnapshot};
use tracing::warn;

use super::{print_json, CmdResult};

const SCENE_KEY: &str = "mine_scene";

#[derive(Subcommand)]
pub enum MineAction {
    /// Send a miner down the shaft
    Dispatch,
    /// Advance the scene to now and print what happened
    Tick,
    /// Print the current scene as JSON
    Status,
    /// Clear every miner and cart
    Reset,
    /// Print the miner phase durations
    Phases,
}

#[derive(Serialize)]
struct PhaseEntry {
    phase: MinerPhase,
    duration_ms: u64,
}

#[derive(Serialize)]
struct TickReport {
    events: Vec<SceneEvent>,
    scene: SceneSnapshot,
}

/// Load the stored scene with the configured phase durations applied.
/// A stored scene that no longer decodes is replaced by an empty one.
fn load_scene(db: &Database, config: &Config) -> Result<MineScene, Box<dyn std::error::Error>> {
    let timings = config.phase_timings();
    let Some(json) = db.kv_get(SCENE_KEY)? else {
        return Ok(MineScene::new(timings));
    };
    match serde_json::from_str::<MineScene>(&json) {
        Ok(mut scene) => {
            scene.set_timings(timings);
            Ok(scene)
        }
        Err(e) => {
            warn!(error = %e, "stored mine scene is unreadable, starting fresh");
            Ok(MineScene::new(timings))
        }
    }
}

fn save_scene(db: &Database, scene: &MineScene) -> CmdResult {
    let json = serde_json::to_string(scene)?;
    db.kv_set(SCENE_KEY, &json)?;
    Ok(())
}

/// Carts follow the player's auto miners; read them from the stats row
/// without creating it.
fn sync_auto_miners(db: &Database, scene: &mut MineScene, now: u64) -> CmdResult {
    let auto_miners = db
        .load_stats(todomine_core::game::DEFAULT_USER)?
        .map_or(0, |s| s.auto_miners);
    if auto_miners != scene.auto_miners() {
        scene.set_auto_miners(auto_miners, now);
    }
    Ok(())
}

fn print_phases(config: &Config) -> CmdResult {
    let timings = config.phase_timings();
    let table: Vec<_> = timings
        .table()
        .into_iter()
        .map(|(phase, duration_ms)| PhaseEntry { phase, duration_ms })
        .collect();
    print_json(&serde_json::json!({
        "phases": table,
        "cart_travel_ms": timings.cart_travel_ms,
        "miner_lifetime_ms": timings.miner_lifetime_ms(),
    }))
}

pub fn run(action: MineAction) -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let mut scene = load_scene(&db, &config)?;
    let now = now_ms();

    match action {
        MineAction::Dispatch => {
            let mut events = scene.tick(now);
            events.push(scene.dispatch_miner(now));
            print_json(&TickReport {
                events,
                scene: scene.snapshot(now),
            })?;
        }
        MineAction::Tick => {
            sync_auto_miners(&db, &mut scene, now)?;
            let events = scene.tick(now);
            print_json(&TickReport {
                events,
                scene: scene.snapshot(now),
            })?;
        }
        MineAction::Status => {
            sync_auto_miners(&db, &mut scene, now)?;
            scene.tick(now);
            print_json(&scene.snapshot(now))?;
        }
        MineAction::Reset => {
            scene.reset();
            print_json(&serde_json::json!({ "type": "mine_reset" }))?;
        }
        MineAction::Phases => return print_phases(&config),
    }

    save_scene(&db, &scene)
}
