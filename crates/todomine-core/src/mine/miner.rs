use serde::{Deserialize, Serialize};

use super::{progress, PhaseTimings, Point, SHAFT_ENTRANCE, SURFACE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerPhase {
    MovingToShaft,
    EnteringShaft,
    Mining,
    ReturningToShaft,
    Exiting,
    /// Left the scene; removed on the next tick.
    Done,
}

impl MinerPhase {
    /// Animated phases in order (excludes `Done`).
    pub const SEQUENCE: [MinerPhase; 5] = [
        MinerPhase::MovingToShaft,
        MinerPhase::EnteringShaft,
        MinerPhase::Mining,
        MinerPhase::ReturningToShaft,
        MinerPhase::Exiting,
    ];

    pub fn next(self) -> MinerPhase {
        match self {
            MinerPhase::MovingToShaft => MinerPhase::EnteringShaft,
            MinerPhase::EnteringShaft => MinerPhase::Mining,
            MinerPhase::Mining => MinerPhase::ReturningToShaft,
            MinerPhase::ReturningToShaft => MinerPhase::Exiting,
            MinerPhase::Exiting | MinerPhase::Done => MinerPhase::Done,
        }
    }
}

/// A miner dispatched by a todo completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Miner {
    pub id: String,
    /// Where this miner digs.
    pub spot: Point,
    pub phase: MinerPhase,
    /// When the current phase began (epoch ms).
    pub phase_started_ms: u64,
}

/// Phase change produced by [`Miner::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: MinerPhase,
    pub to: MinerPhase,
    /// When the phase actually ended, which may be before the tick time.
    pub at_ms: u64,
}

impl Miner {
    pub fn new(id: impl Into<String>, spot: Point, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            spot,
            phase: MinerPhase::MovingToShaft,
            phase_started_ms: now_ms,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == MinerPhase::Done
    }

    /// Elapsed time in the current phase, never more than its duration.
    pub fn phase_elapsed_ms(&self, timings: &PhaseTimings, now_ms: u64) -> u64 {
        now_ms
            .saturating_sub(self.phase_started_ms)
            .min(timings.miner_phase_ms(self.phase))
    }

    pub fn phase_progress(&self, timings: &PhaseTimings, now_ms: u64) -> f64 {
        progress(
            now_ms.saturating_sub(self.phase_started_ms),
            timings.miner_phase_ms(self.phase),
        )
    }

    /// Move through every phase that has finished by `now_ms`.
    ///
    /// Each finished phase hands its overflow to the next one, so a single
    /// late tick can cover several phases.
    pub fn advance(&mut self, timings: &PhaseTimings, now_ms: u64) -> Vec<PhaseChange> {
        let mut changes = Vec::new();
        while !self.is_done() {
            let duration = timings.miner_phase_ms(self.phase);
            let ends_at = self.phase_started_ms.saturating_add(duration);
            if now_ms < ends_at {
                break;
            }
            let from = self.phase;
            self.phase = from.next();
            self.phase_started_ms = ends_at;
            changes.push(PhaseChange {
                from,
                to: self.phase,
                at_ms: ends_at,
            });
        }
        changes
    }

    /// Interpolated position at `now_ms`.
    pub fn position(&self, timings: &PhaseTimings, now_ms: u64) -> Point {
        let t = self.phase_progress(timings, now_ms);
        match self.phase {
            MinerPhase::MovingToShaft => SURFACE.lerp(SHAFT_ENTRANCE, t),
            MinerPhase::EnteringShaft => SHAFT_ENTRANCE.lerp(self.spot, t),
            MinerPhase::Mining => {
                let elapsed = self.phase_elapsed_ms(timings, now_ms) as f64;
                let wobble = (elapsed / 200.0).sin() * 2.0;
                Point::new(self.spot.x + wobble, self.spot.y)
            }
            MinerPhase::ReturningToShaft => self.spot.lerp(SHAFT_ENTRANCE, t),
            MinerPhase::Exiting => SHAFT_ENTRANCE.lerp(SURFACE, t),
            MinerPhase::Done => SURFACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner() -> Miner {
        Miner::new("miner-1", Point::new(200.0, 150.0), 0)
    }

    #[test]
    fn starts_at_surface() {
        let m = miner();
        let t = PhaseTimings::default();
        assert_eq!(m.phase, MinerPhase::MovingToShaft);
        assert_eq!(m.position(&t, 0), SURFACE);
        assert_eq!(m.position(&t, 500), Point::new(70.0, 50.0));
    }

    #[test]
    fn no_change_before_phase_ends() {
        let mut m = miner();
        assert!(m.advance(&PhaseTimings::default(), 999).is_empty());
        assert_eq!(m.phase, MinerPhase::MovingToShaft);
    }

    #[test]
    fn walks_the_full_sequence() {
        let t = PhaseTimings::default();
        let mut m = miner();
        let mut seen = vec![m.phase];
        let mut now = 0;
        while !m.is_done() {
            now += 100;
            for change in m.advance(&t, now) {
                seen.push(change.to);
            }
        }
        assert_eq!(
            seen,
            vec![
                MinerPhase::MovingToShaft,
                MinerPhase::EnteringShaft,
                MinerPhase::Mining,
                MinerPhase::ReturningToShaft,
                MinerPhase::Exiting,
                MinerPhase::Done,
            ]
        );
        assert_eq!(now, t.miner_lifetime_ms());
    }

    #[test]
    fn late_tick_carries_overflow() {
        let t = PhaseTimings::default();
        let mut m = miner();
        // 1000 + 2000 ends entering; 4000 is 1000ms into mining.
        let changes = m.advance(&t, 4_000);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].at_ms, 3_000);
        assert_eq!(m.phase, MinerPhase::Mining);
        assert_eq!(m.phase_started_ms, 3_000);
        assert_eq!(m.phase_elapsed_ms(&t, 4_000), 1_000);
    }

    #[test]
    fn elapsed_is_clamped_to_duration() {
        let t = PhaseTimings::default();
        let m = miner();
        assert_eq!(m.phase_elapsed_ms(&t, 60_000), t.moving_to_shaft_ms);
        assert_eq!(m.phase_progress(&t, 60_000), 1.0);
        assert_eq!(m.position(&t, 60_000), SHAFT_ENTRANCE);
    }

    #[test]
    fn mining_wobbles_around_spot() {
        let t = PhaseTimings::default();
        let mut m = miner();
        m.advance(&t, 3_000);
        assert_eq!(m.phase, MinerPhase::Mining);
        for now in (3_000..13_000).step_by(250) {
            let p = m.position(&t, now);
            assert!((p.x - m.spot.x).abs() <= 2.0);
            assert_eq!(p.y, m.spot.y);
        }
    }

    #[test]
    fn zero_length_phases_are_skipped() {
        let t = PhaseTimings {
            moving_to_shaft_ms: 0,
            exiting_ms: 0,
            ..PhaseTimings::default()
        };
        let mut m = miner();
        let changes = m.advance(&t, 0);
        assert_eq!(changes.len(), 1);
        assert_eq!(m.phase, MinerPhase::EnteringShaft);
    }
}
