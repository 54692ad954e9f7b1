use serde::{Deserialize, Serialize};

use super::Smoother;
use crate::geometry::Point;

/// How the per-update smoothing factor is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SmoothingPolicy {
    /// Constant alpha, assumes a steady frame interval
    Fixed {
        /// Smoothing factor in (0, 1]
        alpha: f64,
    },
    /// `alpha = 1 - exp(-dt / tau)`, frame-rate independent
    TimeConstant {
        /// Physical time constant in seconds
        tau_secs: f64,
    },
    /// Alpha grows with target velocity between `ema_min` and `ema_max`
    Adaptive {
        /// Alpha when the target is still
        ema_min: f64,
        /// Alpha at or above `velocity_ref`
        ema_max: f64,
        /// Velocity (px per update) at which `ema_max` is reached
        velocity_ref: f64,
    },
}

impl SmoothingPolicy {
    /// Validate parameters, returning a description of the first problem
    pub fn check(&self) -> std::result::Result<(), String> {
        match *self {
            Self::Fixed { alpha } => {
                if !(alpha > 0.0 && alpha <= 1.0) {
                    return Err(format!("Alpha must be in (0, 1], got {alpha}"));
                }
            }
            Self::TimeConstant { tau_secs } => {
                if !(tau_secs > 0.0 && tau_secs.is_finite()) {
                    return Err(format!("Time constant must be positive, got {tau_secs}"));
                }
            }
            Self::Adaptive {
                ema_min,
                ema_max,
                velocity_ref,
            } => {
                if !(ema_min > 0.0 && ema_min <= ema_max && ema_max <= 1.0) {
                    return Err(format!(
                        "Adaptive alpha bounds must satisfy 0 < min <= max <= 1, got {ema_min}..{ema_max}"
                    ));
                }
                if !(velocity_ref > 0.0 && velocity_ref.is_finite()) {
                    return Err(format!("Reference velocity must be positive, got {velocity_ref}"));
                }
            }
        }
        Ok(())
    }

    /// Smoothing factor for an update of `dt_secs` with target velocity `velocity`
    #[must_use]
    pub fn alpha(&self, dt_secs: f64, velocity: f64) -> f64 {
        match *self {
            Self::Fixed { alpha } => alpha,
            Self::TimeConstant { tau_secs } => 1.0 - (-dt_secs.max(0.0) / tau_secs).exp(),
            Self::Adaptive {
                ema_min,
                ema_max,
                velocity_ref,
            } => {
                let ratio = (velocity / velocity_ref).clamp(0.0, 1.0);
                (ema_max - ema_min).mul_add(ratio, ema_min)
            }
        }
    }
}

/// Exponential moving average over 2D points
pub struct ExponentialSmoother {
    policy: SmoothingPolicy,
    ema: Option<Point>,
    last_target: Option<Point>,
}

impl ExponentialSmoother {
    /// Create a new smoother
    ///
    /// # Panics
    ///
    /// Panics if the policy parameters are out of range
    #[must_use]
    pub fn new(policy: SmoothingPolicy) -> Self {
        if let Err(msg) = policy.check() {
            panic!("{msg}");
        }
        Self {
            policy,
            ema: None,
            last_target: None,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> SmoothingPolicy {
        self.policy
    }
}

impl Smoother for ExponentialSmoother {
    fn smooth(&mut self, target: Point, dt_secs: f64) -> Point {
        let velocity = self.last_target.map_or(0.0, |last| last.distance(&target));
        self.last_target = Some(target);

        let next = match self.ema {
            Some(ema) => {
                let alpha = self.policy.alpha(dt_secs, velocity);
                Point::new(
                    alpha.mul_add(target.x - ema.x, ema.x),
                    alpha.mul_add(target.y - ema.y, ema.y),
                )
            }
            None => target,
        };

        self.ema = Some(next);
        next
    }

    fn current(&self) -> Option<Point> {
        self.ema
    }

    fn reset(&mut self) {
        self.ema = None;
        self.last_target = None;
    }

    fn name(&self) -> &str {
        match self.policy {
            SmoothingPolicy::Fixed { .. } => "FixedRateSmoother",
            SmoothingPolicy::TimeConstant { .. } => "TimeConstantSmoother",
            SmoothingPolicy::Adaptive { .. } => "AdaptiveSmoother",
        }
    }
}
