//! Signal filtering for raw gaze and pointer samples.
//!
//! Raw points pass through a [`jump::JumpGate`] that drops single-frame
//! spikes, then a [`median::MedianBuffer`], and finally a [`Smoother`] that
//! turns the median into a stable display position.

/// Per-axis median over the last few raw points
pub mod median;

/// Exponential smoothing with fixed, time-constant and adaptive policies
pub mod exponential;

/// Spike rejection against the last accepted point
pub mod jump;

use crate::{
    constants::{DEFAULT_EMA_MAX, DEFAULT_EMA_MIN, DEFAULT_FIXED_ALPHA, DEFAULT_TAU_SECS, DEFAULT_VELOCITY_REF},
    geometry::Point,
    Error, Result,
};
use exponential::{ExponentialSmoother, SmoothingPolicy};

/// Trait for all position smoothers
pub trait Smoother: Send + Sync {
    /// Move the smoothed estimate toward `target` over `dt_secs`
    fn smooth(&mut self, target: Point, dt_secs: f64) -> Point;

    /// Last smoothed estimate, if any
    fn current(&self) -> Option<Point>;

    /// Reset smoother state
    fn reset(&mut self);

    /// Get smoother name
    fn name(&self) -> &str;
}

/// Pass-through smoother
#[derive(Default)]
pub struct NoSmoothing {
    last: Option<Point>,
}

impl Smoother for NoSmoothing {
    fn smooth(&mut self, target: Point, _dt_secs: f64) -> Point {
        self.last = Some(target);
        target
    }

    fn current(&self) -> Option<Point> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "NoSmoothing"
    }
}

fn parse_param(spec: &str, raw: &str, what: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::FilterError(format!("Invalid {what} '{raw}' in smoother spec '{spec}'")))
}

/// Parse a smoother spec such as `tau:0.2`, `fixed:0.3` or `adaptive:0.18:0.35`
pub fn parse_policy(spec: &str) -> Result<Option<SmoothingPolicy>> {
    let lowered = spec.trim().to_lowercase();
    let mut parts = lowered.split(':');
    let kind = parts.next().unwrap_or_default();
    let params: Vec<&str> = parts.collect();

    let policy = match (kind, params.as_slice()) {
        ("none" | "nosmoothing", []) => return Ok(None),
        ("fixed" | "ema", []) => SmoothingPolicy::Fixed {
            alpha: DEFAULT_FIXED_ALPHA,
        },
        ("fixed" | "ema", [alpha]) => SmoothingPolicy::Fixed {
            alpha: parse_param(spec, alpha, "alpha")?,
        },
        ("tau" | "time_constant", []) => SmoothingPolicy::TimeConstant {
            tau_secs: DEFAULT_TAU_SECS,
        },
        ("tau" | "time_constant", [tau]) => SmoothingPolicy::TimeConstant {
            tau_secs: parse_param(spec, tau, "time constant")?,
        },
        ("adaptive", []) => SmoothingPolicy::Adaptive {
            ema_min: DEFAULT_EMA_MIN,
            ema_max: DEFAULT_EMA_MAX,
            velocity_ref: DEFAULT_VELOCITY_REF,
        },
        ("adaptive", [min, max]) => SmoothingPolicy::Adaptive {
            ema_min: parse_param(spec, min, "minimum alpha")?,
            ema_max: parse_param(spec, max, "maximum alpha")?,
            velocity_ref: DEFAULT_VELOCITY_REF,
        },
        ("adaptive", [min, max, velocity]) => SmoothingPolicy::Adaptive {
            ema_min: parse_param(spec, min, "minimum alpha")?,
            ema_max: parse_param(spec, max, "maximum alpha")?,
            velocity_ref: parse_param(spec, velocity, "reference velocity")?,
        },
        _ => return Err(Error::FilterError(format!("Unknown smoother type: {spec}"))),
    };

    policy.check().map_err(Error::FilterError)?;
    Ok(Some(policy))
}

/// Build a smoother for a policy, `None` meaning pass-through
#[must_use]
pub fn smoother_for(policy: Option<SmoothingPolicy>) -> Box<dyn Smoother> {
    match policy {
        Some(policy) => Box::new(ExponentialSmoother::new(policy)),
        None => Box::new(NoSmoothing::default()),
    }
}

/// Create a smoother from a descriptor such as `tau:0.2` or `adaptive`
pub fn create_smoother(spec: &str) -> Result<Box<dyn Smoother>> {
    parse_policy(spec).map(smoother_for)
}
