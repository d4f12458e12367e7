//! Mine scene animation.
//!
//! Miners and ore carts are wall-clock driven phase machines. There are no
//! internal threads or timers: the caller passes the current time in
//! milliseconds to `tick()` (every 100 ms in the browser client) and reads
//! interpolated positions back through `snapshot()`.
//!
//! ## Miner phases
//!
//! ```text
//! MovingToShaft -> EnteringShaft -> Mining -> ReturningToShaft -> Exiting -> Done
//!                                                     |
//!                                                     +--> MiningComplete event
//! ```
//!
//! Progress inside a phase is always clamped to `[0, 1]`: a late tick never
//! overshoots a phase, it rolls the overflow into the following phases.

mod cart;
mod miner;
mod scene;

pub use cart::{Cart, CartPhase};
pub use miner::{Miner, MinerPhase};
pub use scene::{CartView, MineScene, MinerView, SceneEvent, SceneSnapshot};

use serde::{Deserialize, Serialize};

/// Where miners appear above ground.
pub const SURFACE: Point = Point { x: 40.0, y: 50.0 };
/// Top of the mine shaft; carts unload here.
pub const SHAFT_ENTRANCE: Point = Point { x: 100.0, y: 50.0 };

/// Underground area where miners dig and carts start, `[min, max)`.
pub const DIG_X: (f64, f64) = (150.0, 350.0);
pub const DIG_Y: (f64, f64) = (120.0, 200.0);

/// Base interval between carts for a single auto miner.
pub const CART_BASE_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: Point, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Phase durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub moving_to_shaft_ms: u64,
    pub entering_shaft_ms: u64,
    pub mining_ms: u64,
    pub returning_to_shaft_ms: u64,
    pub exiting_ms: u64,
    pub cart_travel_ms: u64,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            moving_to_shaft_ms: 1_000,
            entering_shaft_ms: 2_000,
            mining_ms: 10_000,
            returning_to_shaft_ms: 2_000,
            exiting_ms: 1_000,
            cart_travel_ms: 3_000,
        }
    }
}

impl PhaseTimings {
    pub fn miner_phase_ms(&self, phase: MinerPhase) -> u64 {
        match phase {
            MinerPhase::MovingToShaft => self.moving_to_shaft_ms,
            MinerPhase::EnteringShaft => self.entering_shaft_ms,
            MinerPhase::Mining => self.mining_ms,
            MinerPhase::ReturningToShaft => self.returning_to_shaft_ms,
            MinerPhase::Exiting => self.exiting_ms,
            MinerPhase::Done => 0,
        }
    }

    /// The miner phase table, in order.
    pub fn table(&self) -> Vec<(MinerPhase, u64)> {
        MinerPhase::SEQUENCE
            .iter()
            .map(|p| (*p, self.miner_phase_ms(*p)))
            .collect()
    }

    /// Total time a miner spends in the scene.
    pub fn miner_lifetime_ms(&self) -> u64 {
        MinerPhase::SEQUENCE
            .iter()
            .map(|p| self.miner_phase_ms(*p))
            .sum()
    }
}

/// Wall-clock milliseconds since the Unix epoch, the time base for scenes.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Fraction of `duration_ms` covered by `elapsed_ms`, clamped to `[0, 1]`.
/// Zero-length phases count as finished.
pub(crate) fn progress(elapsed_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 1.0;
    }
    (elapsed_ms.min(duration_ms) as f64) / duration_ms as f64
}

/// Pick a random point in the dig area.
pub(crate) fn random_dig_spot<R: rand::Rng + ?Sized>(rng: &mut R) -> Point {
    Point {
        x: rng.gen_range(DIG_X.0..DIG_X.1),
        y: rng.gen_range(DIG_Y.0..DIG_Y.1),
    }
}
