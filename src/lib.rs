//! Gaze dwell library: signal conditioning and calibration for webcam gaze
//! estimates.
//!
//! Turns a noisy, irregular stream of predicted gaze coordinates into a
//! stable on-screen cursor plus a dwell intensity, and fits the affine
//! correction that maps raw predictions onto screen coordinates.
//!
//! The per-sample pipeline is:
//! 1. Jump gate: samples too far from the last accepted point are dropped
//! 2. Median buffer: per-axis median over the most recent accepted samples
//! 3. Calibration transform applied to the median output
//! 4. Exponential smoothing (fixed, time-constant or velocity-adaptive)
//! 5. Hysteresis dwell tracking and intensity mapping
//!
//! # Examples
//!
//! ## Conditioning a stream
//!
//! ```
//! use gaze_dwell::{conditioner::{ConditionerSettings, GazeConditioner}, geometry::RawSample};
//!
//! # fn main() -> gaze_dwell::Result<()> {
//! let mut conditioner = GazeConditioner::new(ConditionerSettings::default())?;
//!
//! for i in 0..120 {
//!     let t = f64::from(i) * 16.0;
//!     conditioner.ingest(Some(RawSample::new(400.0, 300.0, t)));
//!     let frame = conditioner.frame(t);
//!     if frame.has_signal {
//!         println!("cursor ({:.0}, {:.0}) intensity {:.2}", frame.display_x, frame.display_y, frame.dwell_intensity);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Calibrating
//!
//! ```
//! use gaze_dwell::{calibration::{grid_targets, solve, CalibrationPair, SolverOptions}, geometry::Point};
//!
//! let pairs: Vec<CalibrationPair> = grid_targets(1000.0, 800.0)
//!     .into_iter()
//!     .map(|target| CalibrationPair {
//!         raw: Point::new(target.x + 50.0, target.y - 30.0),
//!         target,
//!     })
//!     .collect();
//!
//! let outcome = solve(&pairs, &SolverOptions::default());
//! assert!(outcome.is_calibrated());
//! let corrected = outcome.transform().apply(Point::new(550.0, 370.0));
//! assert!((corrected.x - 500.0).abs() < 1e-6);
//! ```
//!
//! ## Smoothers by name
//!
//! ```
//! use gaze_dwell::{filters::{create_smoother, Smoother}, geometry::Point};
//!
//! # fn main() -> gaze_dwell::Result<()> {
//! let mut smoother = create_smoother("tau:0.2")?;
//! let first = smoother.smooth(Point::new(100.0, 100.0), 0.016);
//! let next = smoother.smooth(Point::new(200.0, 100.0), 0.016);
//! assert_eq!(first, Point::new(100.0, 100.0));
//! assert!(next.x > 100.0 && next.x < 200.0);
//! # Ok(())
//! # }
//! ```

/// Screen-space points and raw samples
pub mod geometry;

/// Smoothing and outlier rejection stages
pub mod filters;

/// Hysteresis dwell detection and intensity mapping
pub mod dwell;

/// Per-stream conditioning pipeline
pub mod conditioner;

/// Affine calibration fitting and session driver
pub mod calibration;

/// Bounded sample feed and shared conditioner
pub mod feed;

/// Level, heat and audio feedback helpers
pub mod feedback;

/// Utility functions for medians and safe casts
pub mod utils;

/// Error types and result handling
pub mod error;

/// Trace replay application
pub mod app;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
