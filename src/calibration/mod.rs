//! Gaze calibration: target grid, sample collection and the affine solver.

/// Closed-form least-squares affine fit with outlier trimming
pub mod solver;

/// Interactive calibration session state machine
pub mod session;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{constants::CALIBRATION_GRID_FRACTIONS, geometry::Point, utils::median_point};

pub use session::{CalibrationSession, SessionEvent, SessionPhase};
pub use solver::{
    fit, fit_trimmed, reprojection_errors, solve, AffineFit, CalibrationOutcome, InsufficientReason, SolverOptions,
    TrimmedFit,
};

/// 2x3 affine map from raw predictor coordinates to screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    /// Rows `[x_coeff, y_coeff, translation]` for the x and y outputs
    pub rows: [[f64; 3]; 2],
}

impl AffineTransform {
    /// Row used for an axis that could not be fitted
    pub const IDENTITY_X: [f64; 3] = [1.0, 0.0, 0.0];
    pub const IDENTITY_Y: [f64; 3] = [0.0, 1.0, 0.0];

    #[must_use]
    pub const fn identity() -> Self {
        Self {
            rows: [Self::IDENTITY_X, Self::IDENTITY_Y],
        }
    }

    #[must_use]
    pub const fn from_rows(x_row: [f64; 3], y_row: [f64; 3]) -> Self {
        Self { rows: [x_row, y_row] }
    }

    /// Pure translation
    #[must_use]
    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self::from_rows([1.0, 0.0, dx], [0.0, 1.0, dy])
    }

    /// Map a raw point to a corrected point
    #[must_use]
    pub fn apply(&self, raw: Point) -> Point {
        let [rx, ry] = self.rows;
        Point::new(
            rx[0].mul_add(raw.x, rx[1].mul_add(raw.y, rx[2])),
            ry[0].mul_add(raw.x, ry[1].mul_add(raw.y, ry[2])),
        )
    }

    /// Whether every coefficient is within `tolerance` of `other`
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.rows
            .iter()
            .flatten()
            .zip(other.rows.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Raw point observed while the user fixated a known target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPair {
    /// Median raw predictor output during the collection window
    pub raw: Point,
    /// Screen position of the displayed target
    pub target: Point,
}

impl CalibrationPair {
    #[must_use]
    pub const fn new(raw: Point, target: Point) -> Self {
        Self { raw, target }
    }
}

/// Shared flag used to abandon a calibration session early
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Calibration targets on a 3x3 grid at the standard fractions, row-major
#[must_use]
pub fn grid_targets(width: f64, height: f64) -> Vec<Point> {
    grid_targets_with(width, height, &CALIBRATION_GRID_FRACTIONS)
}

/// Calibration targets at arbitrary fractional positions, row-major
#[must_use]
pub fn grid_targets_with(width: f64, height: f64, fractions: &[f64]) -> Vec<Point> {
    fractions
        .iter()
        .flat_map(|fy| fractions.iter().map(move |fx| Point::new(width * fx, height * fy)))
        .collect()
}

/// Reduce one collection window to a calibration pair
///
/// Returns `None` when no samples were gathered for the target.
#[must_use]
pub fn reduce_window(target: Point, samples: &[Point]) -> Option<CalibrationPair> {
    let finite: Vec<Point> = samples.iter().copied().filter(Point::is_finite).collect();
    median_point(&finite).map(|raw| CalibrationPair::new(raw, target))
}

/// Gather one pair per target
///
/// `gather` is called once per target and returns the raw samples observed
/// while that target was displayed. Targets without samples are dropped.
/// Collection stops before the next target once `cancel` is set.
pub fn collect<F>(targets: &[Point], mut gather: F, cancel: &CancelToken) -> Vec<CalibrationPair>
where
    F: FnMut(usize, Point) -> Vec<Point>,
{
    let mut pairs = Vec::with_capacity(targets.len());
    for (index, &target) in targets.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!("Calibration collection cancelled at target {}/{}", index + 1, targets.len());
            break;
        }
        let samples = gather(index, target);
        match reduce_window(target, &samples) {
            Some(pair) => pairs.push(pair),
            None => debug!("No samples for calibration target {} at ({:.1}, {:.1})", index, target.x, target.y),
        }
    }
    pairs
}
