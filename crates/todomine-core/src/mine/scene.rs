use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    random_dig_spot, Cart, Miner, MinerPhase, PhaseTimings, Point, CART_BASE_INTERVAL_MS,
};

/// Cap on carts spawned by one tick after a long gap between ticks.
const MAX_CART_CATCH_UP: usize = 16;

/// Something the renderer may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneEvent {
    MinerDispatched {
        miner_id: String,
        at_ms: u64,
    },
    MinerPhaseChanged {
        miner_id: String,
        from: MinerPhase,
        to: MinerPhase,
        at_ms: u64,
    },
    /// A miner reached the shaft with its haul (coin burst in the client).
    MiningComplete {
        miner_id: String,
        at: Point,
        at_ms: u64,
    },
    MinerLeft {
        miner_id: String,
        at_ms: u64,
    },
    CartSpawned {
        cart_id: String,
        ore: u8,
        at_ms: u64,
    },
    CartArrived {
        cart_id: String,
        ore: u8,
        at_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerView {
    pub id: String,
    pub phase: MinerPhase,
    pub progress: f64,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub id: String,
    pub ore: u8,
    pub progress: f64,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub at_ms: u64,
    pub auto_miners: u32,
    pub miners: Vec<MinerView>,
    pub carts: Vec<CartView>,
}

/// All animated actors of the mine.
///
/// Serializable so a short-lived process (the CLI) can persist it between
/// invocations and resume where it left off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MineScene {
    #[serde(default)]
    timings: PhaseTimings,
    miners: Vec<Miner>,
    carts: Vec<Cart>,
    auto_miners: u32,
    /// When the next cart leaves the dig area, if auto miners are working.
    next_cart_ms: Option<u64>,
    next_id: u64,
}

impl Default for MineScene {
    fn default() -> Self {
        Self::new(PhaseTimings::default())
    }
}

impl MineScene {
    pub fn new(timings: PhaseTimings) -> Self {
        Self {
            timings,
            miners: Vec::new(),
            carts: Vec::new(),
            auto_miners: 0,
            next_cart_ms: None,
            next_id: 1,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    pub fn miners(&self) -> &[Miner] {
        &self.miners
    }

    pub fn carts(&self) -> &[Cart] {
        &self.carts
    }

    pub fn auto_miners(&self) -> u32 {
        self.auto_miners
    }

    pub fn is_idle(&self) -> bool {
        self.miners.is_empty() && self.carts.is_empty() && self.auto_miners == 0
    }

    /// Milliseconds between carts; more auto miners send carts more often.
    pub fn cart_interval_ms(&self) -> Option<u64> {
        (self.auto_miners > 0).then(|| (CART_BASE_INTERVAL_MS / self.auto_miners as u64).max(1))
    }

    pub fn snapshot(&self, now_ms: u64) -> SceneSnapshot {
        SceneSnapshot {
            at_ms: now_ms,
            auto_miners: self.auto_miners,
            miners: self
                .miners
                .iter()
                .map(|m| MinerView {
                    id: m.id.clone(),
                    phase: m.phase,
                    progress: m.phase_progress(&self.timings, now_ms),
                    position: m.position(&self.timings, now_ms),
                })
                .collect(),
            carts: self
                .carts
                .iter()
                .map(|c| CartView {
                    id: c.id.clone(),
                    ore: c.ore,
                    progress: c.progress(&self.timings, now_ms),
                    position: c.position(&self.timings, now_ms),
                })
                .collect(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Send a miner down for a completed todo.
    pub fn dispatch_miner(&mut self, now_ms: u64) -> SceneEvent {
        self.dispatch_miner_with(&mut rand::thread_rng(), now_ms)
    }

    pub fn dispatch_miner_with<R: Rng + ?Sized>(&mut self, rng: &mut R, now_ms: u64) -> SceneEvent {
        let id = self.take_id("miner");
        self.miners
            .push(Miner::new(id.clone(), random_dig_spot(rng), now_ms));
        SceneEvent::MinerDispatched {
            miner_id: id,
            at_ms: now_ms,
        }
    }

    /// Track the player's auto miner count. Starting from zero schedules
    /// the first cart one interval from now.
    pub fn set_auto_miners(&mut self, auto_miners: u32, now_ms: u64) {
        let was_idle = self.auto_miners == 0;
        self.auto_miners = auto_miners;
        match self.cart_interval_ms() {
            None => self.next_cart_ms = None,
            Some(interval) if was_idle || self.next_cart_ms.is_none() => {
                self.next_cart_ms = Some(now_ms.saturating_add(interval));
            }
            Some(_) => {}
        }
    }

    /// Swap in new phase durations. Actors keep their phase and start time,
    /// so the next tick measures them against the new durations.
    pub fn set_timings(&mut self, timings: PhaseTimings) {
        self.timings = timings;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.timings);
    }

    /// Advance every actor to `now_ms` and report what happened.
    pub fn tick(&mut self, now_ms: u64) -> Vec<SceneEvent> {
        self.tick_with(&mut rand::thread_rng(), now_ms)
    }

    pub fn tick_with<R: Rng + ?Sized>(&mut self, rng: &mut R, now_ms: u64) -> Vec<SceneEvent> {
        let mut events = Vec::new();

        for miner in &mut self.miners {
            for change in miner.advance(&self.timings, now_ms) {
                events.push(SceneEvent::MinerPhaseChanged {
                    miner_id: miner.id.clone(),
                    from: change.from,
                    to: change.to,
                    at_ms: change.at_ms,
                });
                match change.from {
                    MinerPhase::ReturningToShaft => events.push(SceneEvent::MiningComplete {
                        miner_id: miner.id.clone(),
                        at: super::SHAFT_ENTRANCE,
                        at_ms: change.at_ms,
                    }),
                    MinerPhase::Exiting => events.push(SceneEvent::MinerLeft {
                        miner_id: miner.id.clone(),
                        at_ms: change.at_ms,
                    }),
                    _ => {}
                }
            }
        }
        self.miners.retain(|m| !m.is_done());

        self.spawn_due_carts(rng, now_ms, &mut events);

        for cart in &mut self.carts {
            if let Some(at_ms) = cart.advance(&self.timings, now_ms) {
                events.push(SceneEvent::CartArrived {
                    cart_id: cart.id.clone(),
                    ore: cart.ore,
                    at_ms,
                });
            }
        }
        self.carts
            .retain(|c| c.phase == super::CartPhase::Emerging);

        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn spawn_due_carts<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now_ms: u64,
        events: &mut Vec<SceneEvent>,
    ) {
        let Some(interval) = self.cart_interval_ms() else {
            return;
        };
        let mut spawned = 0;
        while let Some(due) = self.next_cart_ms.filter(|due| *due <= now_ms) {
            if spawned == MAX_CART_CATCH_UP {
                // Too far behind; resume the regular cadence from now.
                self.next_cart_ms = Some(now_ms.saturating_add(interval));
                break;
            }
            let id = self.take_id("cart");
            let ore = rng.gen_range(1..=3);
            self.carts
                .push(Cart::new(id.clone(), random_dig_spot(rng), ore, due));
            events.push(SceneEvent::CartSpawned {
                cart_id: id,
                ore,
                at_ms: due,
            });
            self.next_cart_ms = Some(due.saturating_add(interval));
            spawned += 1;
        }
    }

    fn take_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }
}
