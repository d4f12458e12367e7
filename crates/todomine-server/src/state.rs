use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use todomine_core::mine::now_ms;
use todomine_core::{Event, MineScene, MiningGame};
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Events kept for `GET /api/events`; older ones are dropped first.
const OUTBOX_CAPACITY: usize = 256;

/// Shared state for axum handlers.
///
/// `MiningGame` owns a SQLite connection, which is `Send` but not `Sync`,
/// so it lives behind a mutex. Handlers hold the lock only for the
/// synchronous core call.
#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<MiningGame>>,
    scene: Arc<Mutex<MineScene>>,
    outbox: Arc<Mutex<VecDeque<Event>>>,
}

impl AppState {
    pub fn new(game: MiningGame, scene: MineScene) -> Self {
        Self {
            game: Arc::new(Mutex::new(game)),
            scene: Arc::new(Mutex::new(scene)),
            outbox: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Run `f` against the game, then route the events it produced to the
    /// mine scene and the outbox.
    pub fn with_game<T>(
        &self,
        f: impl FnOnce(&mut MiningGame) -> todomine_core::error::Result<T>,
    ) -> ApiResult<T> {
        let mut game = self.game.lock().map_err(|_| ApiError::poisoned())?;
        let result = f(&mut game);
        let events = game.drain_events();
        drop(game);
        self.publish(events)?;
        Ok(result?)
    }

    pub fn scene(&self) -> ApiResult<MutexGuard<'_, MineScene>> {
        self.scene.lock().map_err(|_| ApiError::poisoned())
    }

    pub fn drain_outbox(&self) -> ApiResult<Vec<Event>> {
        let mut outbox = self.outbox.lock().map_err(|_| ApiError::poisoned())?;
        Ok(outbox.drain(..).collect())
    }

    /// Match the scene's cart traffic to the stored auto miner count.
    pub fn sync_auto_miners(&self) -> ApiResult<()> {
        let auto_miners = self.with_game(|game| Ok(game.stats()?.auto_miners))?;
        let mut scene = self.scene()?;
        if scene.auto_miners() != auto_miners {
            scene.set_auto_miners(auto_miners, now_ms());
        }
        Ok(())
    }

    fn publish(&self, events: Vec<Event>) -> ApiResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let now = now_ms();
        let mut miners_changed = false;
        {
            let mut scene = self.scene()?;
            for event in &events {
                match event {
                    Event::TodoCompleted { todo_id, .. } => {
                        let dispatched = scene.dispatch_miner(now);
                        debug!(todo_id = %todo_id, ?dispatched, "miner dispatched");
                    }
                    Event::UpgradePurchased { .. } | Event::StatsEdited { .. } => {
                        miners_changed = true;
                    }
                    _ => {}
                }
            }
        }

        {
            let mut outbox = self.outbox.lock().map_err(|_| ApiError::poisoned())?;
            for event in events {
                if outbox.len() == OUTBOX_CAPACITY {
                    outbox.pop_front();
                }
                outbox.push_back(event);
            }
        }

        if miners_changed {
            self.sync_auto_miners()?;
        }
        Ok(())
    }
}
