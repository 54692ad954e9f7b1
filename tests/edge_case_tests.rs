//! Edge case tests for the conditioner, smoothers and feedback components

mod test_helpers;

use gaze_dwell::{
    conditioner::{ConditionerSettings, GazeConditioner, IngestOutcome},
    dwell::{map_dwell_to_intensity, DwellLevel, Easing},
    feedback::{HeatField, LevelGrid, LevelTiming},
    filters::{create_smoother, Smoother},
    geometry::{Point, RawSample},
};
use test_helpers::{assert_point_near, default_conditioner};

#[test]
fn test_extreme_sample_values() {
    let mut conditioner = default_conditioner();

    let extreme_values = [
        (f64::INFINITY, f64::NEG_INFINITY),
        (f64::NAN, f64::NAN),
        (f64::MAX, f64::MIN),
        (1e100, -1e100),
        (0.0, 0.0),
    ];

    for (i, (x, y)) in extreme_values.into_iter().enumerate() {
        let t = i as f64 * 16.0;
        // Must not panic whatever the input
        let _ = conditioner.ingest(Some(RawSample::new(x, y, t)));
        let _ = conditioner.frame(t);
    }
}

#[test]
fn test_non_finite_samples_are_empty_ticks() {
    let mut conditioner = default_conditioner();
    conditioner.ingest(Some(RawSample::new(100.0, 100.0, 0.0)));

    for sample in [
        RawSample::new(f64::NAN, 100.0, 10.0),
        RawSample::new(100.0, f64::INFINITY, 10.0),
        RawSample::new(100.0, 100.0, f64::NAN),
    ] {
        assert_eq!(conditioner.ingest(Some(sample)), IngestOutcome::Empty);
    }
    assert_eq!(conditioner.buffered().count(), 1);
    assert_eq!(conditioner.rejected_count(), 0);
}

#[test]
fn test_frame_before_any_sample() {
    let mut conditioner = default_conditioner();
    let out = conditioner.frame(0.0);
    assert!(!out.has_signal);
    assert_eq!(out.display(), Point::default());
    assert_eq!(out.dwell_intensity, 0.0);
    assert_eq!(out.level, DwellLevel::default());
    assert!(out.dwell.is_none());
}

#[test]
fn test_signal_gap_preserves_dwell() {
    let mut conditioner = default_conditioner();
    let mut now = 0.0;
    for _ in 0..30 {
        conditioner.ingest(Some(RawSample::new(400.0, 300.0, now)));
        conditioner.frame(now);
        now += 20.0;
    }
    let dwell_before = conditioner.dwell_seconds();
    assert!(dwell_before > 0.5);

    // A second of silence; dwell keeps counting only within the hold window
    let mut dwell_at_loss = None;
    for _ in 0..50 {
        conditioner.ingest(None);
        let out = conditioner.frame(now);
        now += 20.0;
        if !out.has_signal {
            dwell_at_loss.get_or_insert(conditioner.dwell_seconds());
            assert_eq!(out.dwell_intensity, 0.0);
            assert_point_near(out.display(), Point::new(400.0, 300.0), 1e-9);
        }
    }
    let dwell_at_loss = dwell_at_loss.expect("signal should be lost after the hold window");
    assert!(dwell_at_loss >= dwell_before);
    assert!(!conditioner.has_signal(now));
    assert_eq!(conditioner.dwell_seconds(), dwell_at_loss, "dwell must not grow without signal");

    // Gaze returns to the same spot: dwell continues from where it was
    conditioner.ingest(Some(RawSample::new(401.0, 300.0, now)));
    let out = conditioner.frame(now);
    assert!(out.has_signal);
    assert!(out.dwell.unwrap().dwell_seconds >= dwell_at_loss);
}

#[test]
fn test_long_frame_interval_is_clamped() {
    let mut conditioner = default_conditioner();
    conditioner.ingest(Some(RawSample::new(50.0, 50.0, 0.0)));
    conditioner.frame(0.0);
    conditioner.ingest(Some(RawSample::new(50.0, 50.0, 450.0)));
    let out = conditioner.frame(500.0);
    assert!(out.has_signal);
    assert!((out.dwell.unwrap().dwell_seconds - 0.1).abs() < 1e-12);
}

#[test]
fn test_backwards_frame_time_adds_nothing() {
    let mut conditioner = default_conditioner();
    conditioner.ingest(Some(RawSample::new(50.0, 50.0, 100.0)));
    conditioner.frame(100.0);
    let out = conditioner.frame(80.0);
    assert_eq!(out.dwell.unwrap().dwell_seconds, 0.0);
}

#[test]
fn test_zero_target_dwell() {
    assert_eq!(map_dwell_to_intensity(0.0, 0.0, Easing::Linear), 0.0);
    assert_eq!(map_dwell_to_intensity(0.01, 0.0, Easing::Linear), 1.0);
    assert_eq!(map_dwell_to_intensity(f64::NAN, 1.5, Easing::SmoothStep), 0.0);

    let settings = ConditionerSettings {
        target_dwell_secs: 0.0,
        ..ConditionerSettings::default()
    };
    let mut conditioner = GazeConditioner::new(settings).unwrap();
    conditioner.ingest(Some(RawSample::new(10.0, 10.0, 0.0)));
    assert_eq!(conditioner.frame(0.0).dwell_intensity, 0.0);
    conditioner.ingest(Some(RawSample::new(10.0, 10.0, 16.0)));
    assert_eq!(conditioner.frame(16.0).dwell_intensity, 1.0);
}

#[test]
fn test_smoother_reset_behavior() {
    for spec in ["none", "fixed:0.5", "tau:0.2", "adaptive"] {
        let mut smoother = create_smoother(spec).unwrap();
        smoother.smooth(Point::new(10.0, 20.0), 0.016);
        smoother.smooth(Point::new(15.0, 25.0), 0.016);
        assert!(smoother.current().is_some());

        smoother.reset();
        assert!(smoother.current().is_none(), "{spec} kept state after reset");

        // After reset, the first value passes through
        let p = smoother.smooth(Point::new(100.0, 200.0), 0.016);
        assert_eq!(p, Point::new(100.0, 200.0), "{spec}");
    }
}

#[test]
fn test_single_sample_window() {
    let settings = ConditionerSettings {
        median_window: 1,
        smoothing: None,
        ..ConditionerSettings::default()
    };
    let mut conditioner = GazeConditioner::new(settings).unwrap();
    conditioner.ingest(Some(RawSample::new(10.0, 10.0, 0.0)));
    conditioner.ingest(Some(RawSample::new(20.0, 30.0, 10.0)));
    assert_eq!(conditioner.frame(10.0).display(), Point::new(20.0, 30.0));
}

#[test]
fn test_feedback_grids_ignore_off_screen_points() {
    let mut grid = LevelGrid::new(2, 2, 100.0, LevelTiming::default());
    assert_eq!(grid.observe(Some(Point::new(-5.0, 50.0)), 0.0), None);
    assert_eq!(grid.observe(Some(Point::new(f64::NAN, 50.0)), 10.0), None);
    assert_eq!(grid.current_cell(), None);

    let mut field = HeatField::new(4, 4, 10.0);
    field.stamp(Point::new(f64::INFINITY, 0.0), 1.0, 2);
    field.stamp(Point::new(1e6, 1e6), 1.0, 2);
    assert!(field.cells().iter().all(|&h| h == 0.0));
}
