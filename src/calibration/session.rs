//! Interactive calibration session.
//!
//! `Idle -> Collecting(0) -> ... -> Collecting(n-1) -> Fitting -> Idle`, with
//! the terminal [`CalibrationOutcome`] kept in [`CalibrationSession::last_outcome`].
//! The host drives the session cooperatively: it forwards raw samples through
//! [`observe`](CalibrationSession::observe) and calls
//! [`tick`](CalibrationSession::tick) once per frame.

use log::{debug, info};

use super::{reduce_window, solve, CalibrationOutcome, CalibrationPair, CancelToken, SolverOptions};
use crate::geometry::{Point, RawSample};

/// Where the session currently is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionPhase {
    /// Not calibrating
    Idle,
    /// Gathering samples for target `index`
    Collecting {
        /// Index into the target list
        index: usize,
        /// When this target's window opened
        started_ms: f64,
    },
    /// Solving; only observable from inside `tick`
    Fitting,
}

/// What a call to [`CalibrationSession::tick`] did
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// No session is running
    Idle,
    /// Still collecting for the current target
    Collecting {
        /// Current target index
        index: usize,
        /// Number of targets
        total: usize,
    },
    /// A window closed and the next target is now displayed
    TargetAdvanced {
        /// Index of the newly displayed target
        index: usize,
        /// Pair produced by the closed window, if it had samples
        pair: Option<CalibrationPair>,
    },
    /// The session completed
    Finished(CalibrationOutcome),
}

/// Calibration session driver
#[derive(Debug)]
pub struct CalibrationSession {
    targets: Vec<Point>,
    window_ms: f64,
    options: SolverOptions,
    cancel: CancelToken,
    phase: SessionPhase,
    window: Vec<Point>,
    pairs: Vec<CalibrationPair>,
    last_outcome: Option<CalibrationOutcome>,
}

impl CalibrationSession {
    /// Create an idle session over the given targets
    ///
    /// # Panics
    ///
    /// Panics if `window_ms` is not positive
    #[must_use]
    pub fn new(targets: Vec<Point>, window_ms: f64, options: SolverOptions) -> Self {
        assert!(window_ms > 0.0, "Collection window must be positive, got {window_ms}");
        Self {
            targets,
            window_ms,
            options,
            cancel: CancelToken::new(),
            phase: SessionPhase::Idle,
            window: Vec::new(),
            pairs: Vec::new(),
            last_outcome: None,
        }
    }

    /// Begin collecting at the first target
    ///
    /// Returns a token that abandons the session when cancelled. Starting
    /// while a session is running restarts it.
    pub fn start(&mut self, now_ms: f64) -> CancelToken {
        self.cancel = CancelToken::new();
        self.window.clear();
        self.pairs.clear();
        info!("Calibration started ({} targets, {} ms window)", self.targets.len(), self.window_ms);
        self.phase = SessionPhase::Collecting {
            index: 0,
            started_ms: now_ms,
        };
        self.cancel.clone()
    }

    /// Token for the running session
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Record a raw sample for the current target
    ///
    /// Ignored when idle, for `None` ticks, non-finite samples, and samples
    /// older than the current window.
    pub fn observe(&mut self, sample: Option<RawSample>) {
        let SessionPhase::Collecting { started_ms, .. } = self.phase else {
            return;
        };
        match sample {
            Some(s) if s.is_finite() && s.timestamp_ms >= started_ms => self.window.push(s.point()),
            _ => {}
        }
    }

    /// Advance the state machine
    pub fn tick(&mut self, now_ms: f64) -> SessionEvent {
        let SessionPhase::Collecting { index, started_ms } = self.phase else {
            return SessionEvent::Idle;
        };

        if self.cancel.is_cancelled() {
            info!("Calibration cancelled at target {}/{}", index + 1, self.targets.len());
            self.close_window(index);
            return SessionEvent::Finished(self.finish());
        }

        if self.targets.is_empty() {
            return SessionEvent::Finished(self.finish());
        }

        if now_ms - started_ms < self.window_ms {
            return SessionEvent::Collecting {
                index,
                total: self.targets.len(),
            };
        }

        let pair = self.close_window(index);
        let next = index + 1;
        if next >= self.targets.len() {
            return SessionEvent::Finished(self.finish());
        }

        self.phase = SessionPhase::Collecting {
            index: next,
            started_ms: now_ms,
        };
        SessionEvent::TargetAdvanced { index: next, pair }
    }

    fn close_window(&mut self, index: usize) -> Option<CalibrationPair> {
        let target = *self.targets.get(index)?;
        let pair = reduce_window(target, &self.window);
        debug!(
            "Calibration target {} closed with {} samples{}",
            index,
            self.window.len(),
            if pair.is_some() { "" } else { " (dropped)" }
        );
        self.window.clear();
        if let Some(pair) = pair {
            self.pairs.push(pair);
        }
        pair
    }

    fn finish(&mut self) -> CalibrationOutcome {
        self.phase = SessionPhase::Fitting;
        let outcome = solve(&self.pairs, &self.options);
        self.last_outcome = Some(outcome.clone());
        self.phase = SessionPhase::Idle;
        outcome
    }

    /// Target the user should be looking at, if collecting
    #[must_use]
    pub fn current_target(&self) -> Option<(usize, Point)> {
        match self.phase {
            SessionPhase::Collecting { index, .. } => self.targets.get(index).map(|t| (index, *t)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Collecting { .. })
    }

    /// Pairs gathered so far in the current or most recent session
    #[must_use]
    pub fn pairs(&self) -> &[CalibrationPair] {
        &self.pairs
    }

    #[must_use]
    pub const fn last_outcome(&self) -> Option<&CalibrationOutcome> {
        self.last_outcome.as_ref()
    }

    #[must_use]
    pub fn targets(&self) -> &[Point] {
        &self.targets
    }
}
