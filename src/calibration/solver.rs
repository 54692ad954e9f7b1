//! Least-squares affine calibration.
//!
//! Each output axis is fitted independently from the 3x3 normal equations
//!
//! ```text
//! | Σx²  Σxy  Σx |   | a |   | ΣxT |
//! | Σxy  Σy²  Σy | · | b | = | ΣyT |
//! | Σx   Σy   n  |   | c |   | ΣT  |
//! ```
//!
//! solved in closed form with Cramer's rule. Outlier rejection is a single
//! trim pass: fit everything, drop the worst-fitting share of pairs, refit.
//! It is not iterated and makes no attempt at RANSAC-style consensus, so a
//! set with many bad pairs can still bias the result.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{AffineTransform, CalibrationPair};
use crate::{
    constants::{DEFAULT_MIN_CALIBRATION_PAIRS, DEFAULT_TRIM_FRACTION, DETERMINANT_EPSILON, MIN_AXIS_FIT_PAIRS},
    Error, Result,
};

/// Solver tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Share of worst-fitting pairs discarded before the refit
    pub trim_fraction: f64,
    /// Fewer pairs than this fall back to the identity transform
    pub min_pairs: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            trim_fraction: DEFAULT_TRIM_FRACTION,
            min_pairs: DEFAULT_MIN_CALIBRATION_PAIRS,
        }
    }
}

impl SolverOptions {
    /// Validate options
    pub fn validate(&self) -> Result<()> {
        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(Error::CalibrationError(format!(
                "Trim fraction must be in [0, 0.5), got {}",
                self.trim_fraction
            )));
        }
        if self.min_pairs < MIN_AXIS_FIT_PAIRS {
            return Err(Error::CalibrationError(format!(
                "Minimum pair count must be at least {MIN_AXIS_FIT_PAIRS}, got {}",
                self.min_pairs
            )));
        }
        Ok(())
    }
}

/// Result of a single least-squares pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineFit {
    /// Fitted transform, identity rows substituted for degenerate axes
    pub transform: AffineTransform,
    /// The x row could not be solved
    pub degenerate_x: bool,
    /// The y row could not be solved
    pub degenerate_y: bool,
    /// Root-mean-square reprojection error over the fitted pairs
    pub rms_error: f64,
}

impl AffineFit {
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.degenerate_x || self.degenerate_y
    }
}

/// Result of the fit / trim / refit sequence
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedFit {
    /// Fit over every pair
    pub initial: AffineFit,
    /// Fit over the retained pairs (equal to `initial` when nothing was trimmed)
    pub refined: AffineFit,
    /// Pairs used for the refit, best first
    pub kept: Vec<CalibrationPair>,
    /// Pairs dropped as outliers
    pub discarded: Vec<CalibrationPair>,
}

/// Why a session fell back to (partial) identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsufficientReason {
    /// Not enough pairs were collected
    TooFewPairs {
        /// Pairs available
        found: usize,
        /// Pairs required
        required: usize,
    },
    /// At least one axis had a singular normal matrix
    DegenerateAxes {
        /// The x axis fell back to identity
        x: bool,
        /// The y axis fell back to identity
        y: bool,
    },
}

/// Terminal outcome of a calibration
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// A full affine correction was fitted
    Calibrated {
        /// The fitted transform
        transform: AffineTransform,
        /// RMS reprojection error over the retained pairs
        rms_error: f64,
        /// Pairs used in the final fit
        kept: usize,
        /// Pairs trimmed as outliers
        discarded: usize,
    },
    /// Too little usable data; the transform is identity where it could not be fitted
    InsufficientData {
        /// Fallback transform
        transform: AffineTransform,
        /// What was missing
        reason: InsufficientReason,
    },
}

impl CalibrationOutcome {
    /// Transform to install, whatever the outcome
    #[must_use]
    pub const fn transform(&self) -> AffineTransform {
        match self {
            Self::Calibrated { transform, .. } | Self::InsufficientData { transform, .. } => *transform,
        }
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated { .. })
    }
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Solve one output axis, `None` when the system is underdetermined or singular
fn fit_axis<F>(pairs: &[CalibrationPair], output: F) -> Option<[f64; 3]>
where
    F: Fn(&CalibrationPair) -> f64,
{
    if pairs.len() < MIN_AXIS_FIT_PAIRS {
        return None;
    }

    let (mut sxx, mut sxy, mut sx, mut syy, mut sy, mut n) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    let (mut sxt, mut syt, mut st) = (0.0, 0.0, 0.0);
    for pair in pairs {
        let (x, y, t) = (pair.raw.x, pair.raw.y, output(pair));
        sxx += x * x;
        sxy += x * y;
        sx += x;
        syy += y * y;
        sy += y;
        n += 1.0;
        sxt += x * t;
        syt += y * t;
        st += t;
    }

    let normal = [[sxx, sxy, sx], [sxy, syy, sy], [sx, sy, n]];
    let rhs = [sxt, syt, st];
    let det = det3(&normal);
    if !det.is_finite() || det.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let mut row = [0.0; 3];
    for (col, coeff) in row.iter_mut().enumerate() {
        let mut replaced = normal;
        for (r, value) in rhs.iter().enumerate() {
            replaced[r][col] = *value;
        }
        *coeff = det3(&replaced) / det;
    }
    Some(row)
}

/// Reprojection error of each pair under `transform`
#[must_use]
pub fn reprojection_errors(transform: &AffineTransform, pairs: &[CalibrationPair]) -> Vec<f64> {
    pairs
        .iter()
        .map(|pair| transform.apply(pair.raw).distance(&pair.target))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn rms(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt()
}

/// Least-squares affine fit over all pairs
///
/// An axis with fewer than three pairs or a near-singular normal matrix gets
/// the identity row instead of an error.
#[must_use]
pub fn fit(pairs: &[CalibrationPair]) -> AffineFit {
    let x_row = fit_axis(pairs, |p| p.target.x);
    let y_row = fit_axis(pairs, |p| p.target.y);

    let transform = AffineTransform::from_rows(
        x_row.unwrap_or(AffineTransform::IDENTITY_X),
        y_row.unwrap_or(AffineTransform::IDENTITY_Y),
    );
    let rms_error = rms(&reprojection_errors(&transform, pairs));

    AffineFit {
        transform,
        degenerate_x: x_row.is_none(),
        degenerate_y: y_row.is_none(),
        rms_error,
    }
}

/// Number of pairs dropped by a trim of `fraction` over `n` pairs
///
/// The refit keeps `floor(n * (1 - fraction))` pairs, so a 9-point grid at
/// 10% keeps 8.
#[must_use]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn trim_count(n: usize, fraction: f64) -> usize {
    if fraction <= 0.0 || n == 0 {
        return 0;
    }
    let keep = (n as f64).mul_add(1.0 - fraction, 1e-9).floor() as usize;
    // Never trim below what a per-axis fit needs
    n.saturating_sub(keep).min(n.saturating_sub(MIN_AXIS_FIT_PAIRS))
}

/// Fit, discard the worst `trim_fraction` of pairs by reprojection error, refit
#[must_use]
pub fn fit_trimmed(pairs: &[CalibrationPair], trim_fraction: f64) -> TrimmedFit {
    let initial = fit(pairs);
    let errors = reprojection_errors(&initial.transform, pairs);

    let mut ranked: Vec<(f64, CalibrationPair)> = errors.into_iter().zip(pairs.iter().copied()).collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let drop = trim_count(pairs.len(), trim_fraction);
    let split = ranked.len() - drop;
    let kept: Vec<CalibrationPair> = ranked[..split].iter().map(|(_, p)| *p).collect();
    let discarded: Vec<CalibrationPair> = ranked[split..].iter().map(|(_, p)| *p).collect();

    let refined = if drop > 0 {
        debug!("Trimmed {} of {} calibration pairs before refit", drop, pairs.len());
        fit(&kept)
    } else {
        initial
    };

    TrimmedFit {
        initial,
        refined,
        kept,
        discarded,
    }
}

/// Produce the terminal outcome for a set of collected pairs
#[must_use]
pub fn solve(pairs: &[CalibrationPair], options: &SolverOptions) -> CalibrationOutcome {
    if pairs.len() < options.min_pairs {
        warn!(
            "Calibration has {} pairs, need {}; using identity transform",
            pairs.len(),
            options.min_pairs
        );
        return CalibrationOutcome::InsufficientData {
            transform: AffineTransform::identity(),
            reason: InsufficientReason::TooFewPairs {
                found: pairs.len(),
                required: options.min_pairs,
            },
        };
    }

    let trimmed = fit_trimmed(pairs, options.trim_fraction);
    let result = trimmed.refined;
    if result.is_degenerate() {
        warn!(
            "Calibration normal matrix is singular (x: {}, y: {}); substituting identity rows",
            result.degenerate_x, result.degenerate_y
        );
        return CalibrationOutcome::InsufficientData {
            transform: result.transform,
            reason: InsufficientReason::DegenerateAxes {
                x: result.degenerate_x,
                y: result.degenerate_y,
            },
        };
    }

    info!(
        "Calibration fitted: RMS error {:.2} px over {} pairs ({} trimmed)",
        result.rms_error,
        trimmed.kept.len(),
        trimmed.discarded.len()
    );
    CalibrationOutcome::Calibrated {
        transform: result.transform,
        rms_error: result.rms_error,
        kept: trimmed.kept.len(),
        discarded: trimmed.discarded.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn pairs_through(transform: &AffineTransform, raws: &[(f64, f64)]) -> Vec<CalibrationPair> {
        raws.iter()
            .map(|&(x, y)| {
                let raw = Point::new(x, y);
                CalibrationPair::new(raw, transform.apply(raw))
            })
            .collect()
    }

    #[test]
    fn test_recovers_exact_affine() {
        let truth = AffineTransform::from_rows([1.2, -0.3, 4.0], [0.25, 0.9, -2.5]);
        let pairs = pairs_through(&truth, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (2.0, 3.0)]);

        let result = fit(&pairs);
        assert!(!result.is_degenerate());
        assert!(result.transform.approx_eq(&truth, 1e-9), "{:?}", result.transform);
        assert!(result.rms_error < 1e-9);
    }

    #[test]
    fn test_too_few_pairs_gives_identity() {
        let pairs = vec![
            CalibrationPair::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0)),
            CalibrationPair::new(Point::new(1.0, 1.0), Point::new(6.0, 6.0)),
        ];
        let result = fit(&pairs);
        assert!(result.degenerate_x && result.degenerate_y);
        assert!(result.transform.is_identity());
    }

    #[test]
    fn test_singular_system_gives_identity_rows() {
        // All raw points identical: the normal matrix has rank one
        let pairs: Vec<CalibrationPair> = (0..5)
            .map(|i| CalibrationPair::new(Point::new(3.0, 3.0), Point::new(f64::from(i), 0.0)))
            .collect();
        let result = fit(&pairs);
        assert!(result.is_degenerate());
        assert!(result.transform.is_identity());
    }

    #[test]
    fn test_trim_count() {
        assert_eq!(trim_count(10, 0.1), 1);
        assert_eq!(trim_count(9, 0.1), 1);
        assert_eq!(trim_count(5, 0.1), 1);
        assert_eq!(trim_count(20, 0.1), 2);
        assert_eq!(trim_count(4, 0.45), 1);
        assert_eq!(trim_count(3, 0.4), 0);
        assert_eq!(trim_count(10, 0.0), 0);
    }

    #[test]
    fn test_trim_discards_outlier() {
        let truth = AffineTransform::translation(-50.0, 30.0);
        let raws: Vec<(f64, f64)> = (0..10).map(|i| (f64::from(i % 4) * 10.0, f64::from(i / 4) * 10.0 + f64::from(i))).collect();
        let mut pairs = pairs_through(&truth, &raws);
        pairs[6].target = Point::new(pairs[6].target.x + 200.0, pairs[6].target.y - 150.0);
        let outlier = pairs[6];

        let trimmed = fit_trimmed(&pairs, 0.1);
        assert_eq!(trimmed.discarded, vec![outlier]);
        assert_eq!(trimmed.kept.len(), 9);
        assert!(trimmed.refined.transform.approx_eq(&truth, 1e-6));
    }

    #[test]
    fn test_nine_point_grid_drops_outlier() {
        let truth = AffineTransform::translation(-50.0, 30.0);
        let raws: Vec<(f64, f64)> = [160.0, 800.0, 1440.0]
            .iter()
            .flat_map(|&y| [128.0, 640.0, 1152.0].map(|x| (x + 50.0, y / 2.0 - 30.0)))
            .collect();
        let mut pairs = pairs_through(&truth, &raws);
        pairs[4].raw = Point::new(pairs[4].raw.x + 300.0, pairs[4].raw.y + 200.0);
        let outlier = pairs[4];

        match solve(&pairs, &SolverOptions::default()) {
            CalibrationOutcome::Calibrated {
                transform,
                rms_error,
                kept,
                discarded,
            } => {
                assert_eq!((kept, discarded), (8, 1));
                assert!(rms_error < 1e-6, "rms {rms_error}");
                assert!(transform.approx_eq(&truth, 1e-6));
            }
            other => panic!("expected calibration, got {other:?}"),
        }
        assert_eq!(fit_trimmed(&pairs, 0.1).discarded, vec![outlier]);
    }

    #[test]
    fn test_solve_outcomes() {
        let options = SolverOptions::default();
        let few = vec![CalibrationPair::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0)); 3];
        match solve(&few, &options) {
            CalibrationOutcome::InsufficientData { transform, reason } => {
                assert!(transform.is_identity());
                assert_eq!(reason, InsufficientReason::TooFewPairs { found: 3, required: 4 });
            }
            other @ CalibrationOutcome::Calibrated { .. } => panic!("unexpected {other:?}"),
        }

        let truth = AffineTransform::translation(5.0, -5.0);
        let good = pairs_through(&truth, &[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)]);
        let outcome = solve(&good, &options);
        assert!(outcome.is_calibrated());
        assert!(outcome.transform().approx_eq(&truth, 1e-9));
    }

    #[test]
    fn test_solver_options_validation() {
        assert!(SolverOptions::default().validate().is_ok());
        assert!(SolverOptions { trim_fraction: 0.6, ..SolverOptions::default() }.validate().is_err());
        assert!(SolverOptions { trim_fraction: -0.1, ..SolverOptions::default() }.validate().is_err());
        assert!(SolverOptions { min_pairs: 2, ..SolverOptions::default() }.validate().is_err());
    }
}
