//! Tests for the affine calibration solver and collection helpers

mod test_helpers;

use gaze_dwell::{
    calibration::{
        collect, fit, fit_trimmed, grid_targets, reduce_window, reprojection_errors, solve, AffineTransform,
        CalibrationOutcome, CalibrationPair, CalibrationSession, CancelToken, InsufficientReason, SessionEvent,
        SolverOptions,
    },
    geometry::{Point, RawSample},
};
use test_helpers::{assert_point_near, exact_pairs};

fn rms(values: &[f64]) -> f64 {
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

#[test]
fn test_four_exact_pairs_recover_transform() {
    let truth = AffineTransform::from_rows([1.05, 0.02, -12.0], [-0.03, 0.97, 8.5]);
    let raws = [
        Point::new(100.0, 100.0),
        Point::new(900.0, 120.0),
        Point::new(150.0, 700.0),
        Point::new(820.0, 640.0),
    ];
    let result = fit(&exact_pairs(&raws, &truth));

    assert!(!result.is_degenerate());
    for (got, want) in result.transform.rows.iter().flatten().zip(truth.rows.iter().flatten()) {
        assert!((got - want).abs() < 1e-9, "{got} vs {want}");
    }
    assert!(result.rms_error < 1e-9);
}

#[test]
fn test_fewer_than_three_pairs_is_identity() {
    assert_eq!(fit(&[]).transform, AffineTransform::identity());

    let pairs = [
        CalibrationPair::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
        CalibrationPair::new(Point::new(5.0, 5.0), Point::new(20.0, 20.0)),
    ];
    let result = fit(&pairs);
    assert!(result.degenerate_x && result.degenerate_y);
    assert_eq!(result.transform, AffineTransform::identity());
}

#[test]
fn test_collinear_pairs_are_degenerate() {
    let pairs: Vec<CalibrationPair> = (0..5)
        .map(|i| {
            let v = f64::from(i) * 100.0;
            CalibrationPair::new(Point::new(v, v), Point::new(v + 3.0, v - 3.0))
        })
        .collect();

    let outcome = solve(&pairs, &SolverOptions::default());
    match outcome {
        CalibrationOutcome::InsufficientData {
            transform,
            reason: InsufficientReason::DegenerateAxes { x, y },
        } => {
            assert!(x && y);
            assert!(transform.is_identity());
        }
        other => panic!("expected degenerate outcome, got {other:?}"),
    }
}

#[test]
fn test_outlier_trimming_lowers_error() {
    let truth = AffineTransform::from_rows([0.98, 0.01, 20.0], [0.02, 1.03, -15.0]);
    let mut raws = grid_targets(1000.0, 800.0);
    raws.push(Point::new(300.0, 650.0));
    let mut pairs = exact_pairs(&raws, &truth);
    assert_eq!(pairs.len(), 10);

    // Corrupt the centre pair
    pairs[4].target.x += 250.0;
    pairs[4].target.y -= 180.0;
    let outlier = pairs[4];

    let trimmed = fit_trimmed(&pairs, 0.1);
    assert_eq!(trimmed.discarded, vec![outlier]);
    assert_eq!(trimmed.kept.len(), 9);

    let before = rms(&reprojection_errors(&trimmed.initial.transform, &trimmed.kept));
    let after = rms(&reprojection_errors(&trimmed.refined.transform, &trimmed.kept));
    assert!(after < before, "refit {after} should beat initial {before}");
    assert!(trimmed.refined.transform.approx_eq(&truth, 1e-6));
}

#[test]
fn test_solve_requires_min_pairs() {
    let pairs = exact_pairs(
        &[Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(0.0, 100.0)],
        &AffineTransform::translation(5.0, 5.0),
    );
    let outcome = solve(&pairs, &SolverOptions::default());
    assert_eq!(
        outcome,
        CalibrationOutcome::InsufficientData {
            transform: AffineTransform::identity(),
            reason: InsufficientReason::TooFewPairs { found: 3, required: 4 },
        }
    );
    assert!(!outcome.is_calibrated());
}

#[test]
fn test_solve_reports_counts() {
    let raws = grid_targets(1000.0, 800.0);
    let pairs = exact_pairs(&raws, &AffineTransform::translation(-50.0, 30.0));
    match solve(&pairs, &SolverOptions::default()) {
        CalibrationOutcome::Calibrated {
            transform,
            rms_error,
            kept,
            discarded,
        } => {
            // floor(9 * 0.9) = 8 pairs kept
            assert_eq!((kept, discarded), (8, 1));
            assert!(rms_error < 1e-9);
            assert!(transform.approx_eq(&AffineTransform::translation(-50.0, 30.0), 1e-9));
        }
        other => panic!("expected calibration, got {other:?}"),
    }
}

#[test]
fn test_reduce_window_uses_median() {
    let samples = [
        Point::new(10.0, 10.0),
        Point::new(11.0, 12.0),
        Point::new(400.0, -300.0),
        Point::new(f64::NAN, 0.0),
    ];
    let pair = reduce_window(Point::new(0.0, 0.0), &samples).unwrap();
    assert_eq!(pair.raw, Point::new(11.0, 10.0));
    assert!(reduce_window(Point::new(0.0, 0.0), &[]).is_none());
}

#[test]
fn test_collect_with_cancellation() {
    let targets = grid_targets(100.0, 100.0);
    let cancel = CancelToken::new();
    let stopper = cancel.clone();

    let pairs = collect(
        &targets,
        |index, target| {
            if index == 3 {
                stopper.cancel();
            }
            if index == 1 {
                return Vec::new();
            }
            vec![target, target]
        },
        &cancel,
    );
    // Target 1 had no samples; collection stopped after target 3
    assert_eq!(pairs.len(), 3);
    assert!(cancel.is_cancelled());
}

#[test]
fn test_cancelled_session_fits_partial_data() {
    let mut session = CalibrationSession::new(grid_targets(1000.0, 800.0), 100.0, SolverOptions::default());
    let token = session.start(0.0);

    let mut now = 0.0;
    let mut advanced = 0;
    let outcome = loop {
        if let Some((_, target)) = session.current_target() {
            session.observe(Some(RawSample::new(target.x + 4.0, target.y + 4.0, now)));
        }
        match session.tick(now) {
            SessionEvent::TargetAdvanced { .. } => {
                advanced += 1;
                if advanced == 5 {
                    token.cancel();
                }
            }
            SessionEvent::Finished(outcome) => break outcome,
            _ => {}
        }
        now += 20.0;
    };

    // Five closed windows plus the partial sixth
    assert_eq!(session.pairs().len(), 6);
    assert!(outcome.is_calibrated());
    assert_point_near(outcome.transform().apply(Point::new(504.0, 404.0)), Point::new(500.0, 400.0), 1e-6);
    assert!(!session.is_active());
    assert_eq!(session.last_outcome(), Some(&outcome));
    assert_eq!(session.tick(now), SessionEvent::Idle);
}
