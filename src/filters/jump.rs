use crate::{constants::JUMP_REANCHOR_RUN, geometry::Point};

/// Verdict for one point passed through a [`JumpGate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Within reach of the last accepted point
    Accepted,
    /// Accepted as a new reference after a run of agreeing rejections
    Reanchored,
    /// Dropped as a spike
    Rejected,
}

/// Drops single-frame spikes before they reach the median buffer
///
/// A point is accepted when it lies within `max_jump` of the last accepted
/// point. The first point is always accepted. A run of `reanchor_run`
/// rejected points, each within `max_jump` of the one before, is a real
/// move rather than a spike: the gate re-anchors on the last of them.
#[derive(Debug, Clone)]
pub struct JumpGate {
    max_jump: f64,
    reanchor_run: usize,
    last_accepted: Option<Point>,
    last_rejected: Option<Point>,
    rejected_run: usize,
}

impl JumpGate {
    /// Create a new jump gate
    ///
    /// # Panics
    ///
    /// Panics if `max_jump` is not positive
    #[must_use]
    pub fn new(max_jump: f64) -> Self {
        Self::with_reanchor_run(max_jump, JUMP_REANCHOR_RUN)
    }

    /// Create a jump gate that re-anchors after `reanchor_run` agreeing rejections
    ///
    /// # Panics
    ///
    /// Panics if `max_jump` is not positive or `reanchor_run` is zero
    #[must_use]
    pub fn with_reanchor_run(max_jump: f64, reanchor_run: usize) -> Self {
        assert!(max_jump > 0.0, "Maximum jump must be positive, got {max_jump}");
        assert!(reanchor_run > 0, "Re-anchor run must be at least 1");
        Self {
            max_jump,
            reanchor_run,
            last_accepted: None,
            last_rejected: None,
            rejected_run: 0,
        }
    }

    /// Check a point, remembering it if accepted
    pub fn check(&mut self, point: Point) -> GateDecision {
        let max_jump = self.max_jump;
        let within = move |a: Point| a.distance(&point) <= max_jump;
        if self.last_accepted.map_or(true, within) {
            self.anchor(point);
            return GateDecision::Accepted;
        }

        self.rejected_run = match self.last_rejected {
            Some(prev) if within(prev) => self.rejected_run + 1,
            _ => 1,
        };
        if self.rejected_run >= self.reanchor_run {
            self.anchor(point);
            return GateDecision::Reanchored;
        }
        self.last_rejected = Some(point);
        GateDecision::Rejected
    }

    /// Check a point, `true` unless it was dropped
    pub fn accept(&mut self, point: Point) -> bool {
        self.check(point) != GateDecision::Rejected
    }

    fn anchor(&mut self, point: Point) {
        self.last_accepted = Some(point);
        self.last_rejected = None;
        self.rejected_run = 0;
    }

    #[must_use]
    pub const fn last_accepted(&self) -> Option<Point> {
        self.last_accepted
    }

    #[must_use]
    pub const fn max_jump(&self) -> f64 {
        self.max_jump
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.last_rejected = None;
        self.rejected_run = 0;
    }
}
