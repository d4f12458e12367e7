//! HTTP API for Todomine.
//!
//! Serves the todo, game and mine endpoints under `/api` on top of
//! [`todomine_core::MiningGame`], plus two background tasks: the periodic
//! auto-mine tick and the mine scene ticker.

mod error;
mod routes;
mod state;

pub use error::{ApiError, ApiJson, ApiResult};
pub use routes::router;
pub use state::AppState;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use todomine_core::mine::now_ms;
use todomine_core::{Config, CoreError, MineScene, MiningGame};

/// The running API server and its background tasks.
pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
    handles: Vec<JoinHandle<()>>,
}

impl ApiServer {
    /// Start serving.
    ///
    /// Binds to `{server.host}:{server.port}` (use port `0` for
    /// auto-assign) and spawns the server and its background tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(game: MiningGame, config: &Config) -> Result<Self, CoreError> {
        let state = AppState::new(game, MineScene::new(config.phase_timings()));
        state.sync_auto_miners().map_err(ApiError::into_core)?;

        let app = router(state.clone());
        let listener = TcpListener::bind(config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!("todomine API listening on http://{addr}/api");

        let mut handles = vec![tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {e}");
            }
        })];

        if config.game.auto_mine_interval_secs > 0 {
            handles.push(spawn_auto_miner(
                state.clone(),
                Duration::from_secs(config.game.auto_mine_interval_secs),
            ));
        }
        if config.mine.tick_ms > 0 {
            handles.push(spawn_scene_ticker(
                state.clone(),
                Duration::from_millis(config.mine.tick_ms),
            ));
        }

        Ok(Self {
            addr,
            state,
            handles,
        })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Abort the server and background tasks.
    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Grant auto-mined coins every `period`. The first tick fires one full
/// period after start.
fn spawn_auto_miner(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            match state.with_game(|game| game.auto_mine()) {
                Ok(outcome) if outcome.coins_earned > 0 => {
                    debug!(coins = outcome.coins_earned, total = outcome.new_total, "auto-mine tick");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "auto-mine tick failed"),
            }
        }
    })
}

/// Advance the mine scene every `period`.
fn spawn_scene_ticker(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let events = match state.scene() {
                Ok(mut scene) => scene.tick(now_ms()),
                Err(e) => {
                    warn!(error = %e, "mine scene unavailable, stopping ticker");
                    return;
                }
            };
            for event in events {
                debug!(?event, "mine");
            }
        }
    })
}
