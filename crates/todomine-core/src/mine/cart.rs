use serde::{Deserialize, Serialize};

use super::{progress, PhaseTimings, Point, SHAFT_ENTRANCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
    /// Rolling from the dig area up to the shaft entrance.
    Emerging,
    Arrived,
}

/// Ore cart sent up by the auto miners.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub id: String,
    pub from: Point,
    /// Pieces of ore carried, 1..=3.
    pub ore: u8,
    pub phase: CartPhase,
    pub started_ms: u64,
}

impl Cart {
    pub fn new(id: impl Into<String>, from: Point, ore: u8, started_ms: u64) -> Self {
        Self {
            id: id.into(),
            from,
            ore: ore.clamp(1, 3),
            phase: CartPhase::Emerging,
            started_ms,
        }
    }

    /// Returns the arrival time when the cart reaches the surface on this tick.
    pub fn advance(&mut self, timings: &PhaseTimings, now_ms: u64) -> Option<u64> {
        if self.phase != CartPhase::Emerging {
            return None;
        }
        let arrives_at = self.started_ms.saturating_add(timings.cart_travel_ms);
        if now_ms < arrives_at {
            return None;
        }
        self.phase = CartPhase::Arrived;
        Some(arrives_at)
    }

    pub fn progress(&self, timings: &PhaseTimings, now_ms: u64) -> f64 {
        match self.phase {
            CartPhase::Emerging => progress(
                now_ms.saturating_sub(self.started_ms),
                timings.cart_travel_ms,
            ),
            CartPhase::Arrived => 1.0,
        }
    }

    pub fn position(&self, timings: &PhaseTimings, now_ms: u64) -> Point {
        self.from.lerp(SHAFT_ENTRANCE, self.progress(timings, now_ms))
    }
}
