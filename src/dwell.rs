//! Dwell detection for tracking how long a position stays in place.
//!
//! The tracker keeps an anchor point and accumulates time while the position
//! stays within an inner radius of it. The anchor only moves once the position
//! reaches a strictly larger outer radius; between the two radii nothing
//! changes, so jitter around a single boundary cannot toggle the state.

use serde::{Deserialize, Serialize};

use crate::{constants::MAX_LEVEL, geometry::Point};

/// Result of a single dwell update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellState {
    /// Distance from the anchor before any re-anchoring
    pub distance_from_anchor: f64,
    /// Time spent in place, in seconds
    pub dwell_seconds: f64,
    /// Whether this update moved the anchor
    pub just_reanchored: bool,
}

/// Hysteresis dwell tracker
#[derive(Debug, Clone)]
pub struct DwellTracker {
    inner_radius: f64,
    outer_radius: f64,
    anchor: Option<Point>,
    dwell_seconds: f64,
}

impl DwellTracker {
    /// Create a new dwell tracker
    ///
    /// # Panics
    ///
    /// Panics unless `0 <= inner_radius < outer_radius`
    #[must_use]
    pub fn new(inner_radius: f64, outer_radius: f64) -> Self {
        assert!(inner_radius >= 0.0, "Inner radius must be non-negative, got {inner_radius}");
        assert!(
            inner_radius < outer_radius,
            "Inner radius must be smaller than outer radius, got {inner_radius} >= {outer_radius}"
        );
        Self {
            inner_radius,
            outer_radius,
            anchor: None,
            dwell_seconds: 0.0,
        }
    }

    /// Update with a new position and the time elapsed since the last update
    pub fn update(&mut self, point: Point, dt_secs: f64) -> DwellState {
        let Some(anchor) = self.anchor else {
            self.anchor = Some(point);
            self.dwell_seconds = 0.0;
            return DwellState {
                distance_from_anchor: 0.0,
                dwell_seconds: 0.0,
                just_reanchored: true,
            };
        };

        let distance = anchor.distance(&point);
        let mut just_reanchored = false;

        if distance >= self.outer_radius {
            self.anchor = Some(point);
            self.dwell_seconds = 0.0;
            just_reanchored = true;
        } else if distance <= self.inner_radius {
            self.dwell_seconds += dt_secs.max(0.0);
        }

        DwellState {
            distance_from_anchor: distance,
            dwell_seconds: self.dwell_seconds,
            just_reanchored,
        }
    }

    #[must_use]
    pub const fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    #[must_use]
    pub const fn dwell_seconds(&self) -> f64 {
        self.dwell_seconds
    }

    #[must_use]
    pub const fn radii(&self) -> (f64, f64) {
        (self.inner_radius, self.outer_radius)
    }

    /// Reset the tracker
    pub fn reset(&mut self) {
        self.anchor = None;
        self.dwell_seconds = 0.0;
    }
}

/// Easing applied when turning dwell time into intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Straight ratio
    #[default]
    Linear,
    /// `t * t * (3 - 2t)`
    SmoothStep,
}

/// Map dwell time onto an intensity in `[0, 1]`
#[must_use]
pub fn map_dwell_to_intensity(dwell_seconds: f64, target_dwell_seconds: f64, easing: Easing) -> f64 {
    if !dwell_seconds.is_finite() || dwell_seconds <= 0.0 {
        return 0.0;
    }
    if target_dwell_seconds <= 0.0 {
        return 1.0;
    }

    let t = (dwell_seconds / target_dwell_seconds).clamp(0.0, 1.0);
    match easing {
        Easing::Linear => t,
        Easing::SmoothStep => t * t * 2.0f64.mul_add(-t, 3.0),
    }
}

/// Discrete feedback level derived from intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DwellLevel(u8);

impl DwellLevel {
    /// Create a level, saturating at the maximum
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self(level.min(MAX_LEVEL))
    }

    /// Bucket an intensity into levels 0..=3
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn from_intensity(intensity: f64) -> Self {
        if !intensity.is_finite() || intensity <= 0.0 {
            return Self(0);
        }
        let buckets = f64::from(MAX_LEVEL);
        Self::new((intensity.min(1.0) * buckets).ceil() as u8)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_max(self) -> bool {
        self.0 >= MAX_LEVEL
    }
}
