//! Helper functions and utilities for tests

#![allow(dead_code)]

use gaze_dwell::{
    calibration::{AffineTransform, CalibrationPair},
    conditioner::{ConditionerSettings, FrameOutput, GazeConditioner},
    geometry::{Point, RawSample},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Conditioner with default settings
pub fn default_conditioner() -> GazeConditioner {
    GazeConditioner::new(ConditionerSettings::default()).expect("default settings are valid")
}

/// Samples at a fixed interval starting at `start_ms`
pub fn samples_at(points: &[(f64, f64)], start_ms: f64, interval_ms: f64) -> Vec<RawSample> {
    points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| RawSample::new(x, y, (i as f64).mul_add(interval_ms, start_ms)))
        .collect()
}

/// Gaussian-ish noisy samples around a fixation point
pub fn noisy_fixation(center: Point, count: usize, interval_ms: f64, noise: f64, seed: u64) -> Vec<RawSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            // Sum of uniforms approximates a normal distribution
            let nx: f64 = (0..4).map(|_| rng.gen_range(-noise..noise)).sum::<f64>() / 2.0;
            let ny: f64 = (0..4).map(|_| rng.gen_range(-noise..noise)).sum::<f64>() / 2.0;
            RawSample::new(center.x + nx, center.y + ny, i as f64 * interval_ms)
        })
        .collect()
}

/// Ingest each sample and produce a frame at its timestamp
pub fn run_frames(conditioner: &mut GazeConditioner, samples: &[RawSample]) -> Vec<FrameOutput> {
    samples
        .iter()
        .map(|s| {
            conditioner.ingest(Some(*s));
            conditioner.frame(s.timestamp_ms)
        })
        .collect()
}

/// Pairs whose raw points map exactly onto their targets under `transform`
pub fn exact_pairs(raws: &[Point], transform: &AffineTransform) -> Vec<CalibrationPair> {
    raws.iter().map(|&raw| CalibrationPair::new(raw, transform.apply(raw))).collect()
}

/// Assert two points are within `tolerance` on both axes
pub fn assert_point_near(actual: Point, expected: Point, tolerance: f64) {
    assert!(
        (actual.x - expected.x).abs() <= tolerance && (actual.y - expected.y).abs() <= tolerance,
        "expected ({}, {}) within {}, got ({}, {})",
        expected.x,
        expected.y,
        tolerance,
        actual.x,
        actual.y
    );
}
