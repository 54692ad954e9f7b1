//! Gaze signal conditioner.
//!
//! Owns the whole per-stream state: jump gate, median buffer, calibration
//! transform, smoother and dwell tracker. Samples arrive through
//! [`GazeConditioner::ingest`] at whatever rate the predictor produces them;
//! [`GazeConditioner::frame`] runs once per rendered frame and produces the
//! record consumers draw or play from.

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::{
    calibration::AffineTransform,
    constants::{
        DEFAULT_HOLD_MS, DEFAULT_INNER_RADIUS, DEFAULT_MAX_FRAME_DT, DEFAULT_MAX_FRAME_JUMP, DEFAULT_MEDIAN_WINDOW,
        DEFAULT_OUTER_RADIUS, DEFAULT_TARGET_DWELL_SECS, DEFAULT_TAU_SECS,
    },
    dwell::{map_dwell_to_intensity, DwellLevel, DwellState, DwellTracker, Easing},
    filters::{
        exponential::SmoothingPolicy,
        jump::{GateDecision, JumpGate},
        median::MedianBuffer,
        smoother_for, Smoother,
    },
    geometry::{Point, RawSample},
    Error, Result,
};

/// Tuning for a [`GazeConditioner`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionerSettings {
    /// Median buffer capacity
    pub median_window: usize,
    /// Largest accepted distance from the last accepted raw point (px)
    pub max_frame_jump: f64,
    /// Signal counts as lost after this long without an accepted sample
    pub hold_ms: f64,
    /// Cap on the frame interval used for smoothing and dwell (seconds)
    pub max_frame_dt: f64,
    /// Smoothing policy, `None` for pass-through
    pub smoothing: Option<SmoothingPolicy>,
    /// Dwell accumulates within this distance of the anchor (px)
    pub inner_radius: f64,
    /// Anchor moves at or beyond this distance (px)
    pub outer_radius: f64,
    /// Dwell time mapped to full intensity
    pub target_dwell_secs: f64,
    /// Intensity easing
    pub easing: Easing,
}

impl Default for ConditionerSettings {
    fn default() -> Self {
        Self {
            median_window: DEFAULT_MEDIAN_WINDOW,
            max_frame_jump: DEFAULT_MAX_FRAME_JUMP,
            hold_ms: DEFAULT_HOLD_MS,
            max_frame_dt: DEFAULT_MAX_FRAME_DT,
            smoothing: Some(SmoothingPolicy::TimeConstant {
                tau_secs: DEFAULT_TAU_SECS,
            }),
            inner_radius: DEFAULT_INNER_RADIUS,
            outer_radius: DEFAULT_OUTER_RADIUS,
            target_dwell_secs: DEFAULT_TARGET_DWELL_SECS,
            easing: Easing::Linear,
        }
    }
}

impl ConditionerSettings {
    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.median_window == 0 {
            return Err(Error::ConfigError("Median window size must be greater than 0".to_string()));
        }
        if !(self.max_frame_jump > 0.0) {
            return Err(Error::ConfigError("Maximum frame jump must be positive".to_string()));
        }
        if !(self.hold_ms > 0.0) {
            return Err(Error::ConfigError("Hold window must be positive".to_string()));
        }
        if !(self.max_frame_dt > 0.0) {
            return Err(Error::ConfigError("Maximum frame interval must be positive".to_string()));
        }
        if !(self.inner_radius >= 0.0 && self.inner_radius < self.outer_radius) {
            return Err(Error::ConfigError(format!(
                "Dwell radii must satisfy 0 <= inner < outer, got {} / {}",
                self.inner_radius, self.outer_radius
            )));
        }
        if self.target_dwell_secs < 0.0 {
            return Err(Error::ConfigError("Target dwell time must be non-negative".to_string()));
        }
        if let Some(policy) = &self.smoothing {
            policy.check().map_err(Error::ConfigError)?;
        }
        Ok(())
    }
}

/// What happened to an ingested tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Sample entered the median buffer
    Accepted,
    /// Sample restarted the median buffer after a sustained shift
    Reanchored,
    /// Sample was too far from the last accepted point and was dropped
    Rejected,
    /// No usable prediction this tick
    Empty,
}

/// Per-frame record handed to renderers and audio layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    /// Smoothed, calibrated horizontal position
    pub display_x: f64,
    /// Smoothed, calibrated vertical position
    pub display_y: f64,
    /// Dwell intensity in `[0, 1]`, zero without signal
    pub dwell_intensity: f64,
    /// Whether an accepted sample arrived within the hold window
    pub has_signal: bool,
    /// Dwell update for this frame, `None` without signal
    pub dwell: Option<DwellState>,
    /// Discrete level bucket of `dwell_intensity`
    pub level: DwellLevel,
}

impl FrameOutput {
    #[must_use]
    pub const fn display(&self) -> Point {
        Point::new(self.display_x, self.display_y)
    }
}

/// Stateful gaze signal conditioner
pub struct GazeConditioner {
    settings: ConditionerSettings,
    jump_gate: JumpGate,
    median: MedianBuffer,
    transform: AffineTransform,
    smoother: Box<dyn Smoother>,
    dwell: DwellTracker,
    last_sample_ms: Option<f64>,
    last_frame_ms: Option<f64>,
    signal: bool,
    rejected: u64,
}

impl GazeConditioner {
    /// Create a new conditioner
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid
    pub fn new(settings: ConditionerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            jump_gate: JumpGate::new(settings.max_frame_jump),
            median: MedianBuffer::new(settings.median_window),
            transform: AffineTransform::identity(),
            smoother: smoother_for(settings.smoothing),
            dwell: DwellTracker::new(settings.inner_radius, settings.outer_radius),
            last_sample_ms: None,
            last_frame_ms: None,
            signal: false,
            rejected: 0,
        })
    }

    /// Feed one tick from the predictor
    ///
    /// `None` and non-finite samples leave all state untouched.
    pub fn ingest(&mut self, sample: Option<RawSample>) -> IngestOutcome {
        let Some(sample) = sample.filter(RawSample::is_finite) else {
            trace!("Empty gaze tick");
            return IngestOutcome::Empty;
        };

        let point = sample.point();
        if self.last_sample_ms.is_some() && !self.has_signal(sample.timestamp_ms) {
            debug!("Gaze returned after the hold window, restarting the jump gate");
            self.jump_gate.reset();
            self.median.clear();
        }

        let reanchored = match self.jump_gate.check(point) {
            GateDecision::Accepted => false,
            GateDecision::Reanchored => {
                debug!("Jump gate moved to ({:.1}, {:.1}) after a sustained shift", point.x, point.y);
                self.median.clear();
                true
            }
            GateDecision::Rejected => {
                self.rejected += 1;
                debug!(
                    "Rejected gaze sample ({:.1}, {:.1}) at {:.0} ms: jump exceeds {:.0} px",
                    point.x, point.y, sample.timestamp_ms, self.settings.max_frame_jump
                );
                return IngestOutcome::Rejected;
            }
        };

        self.median.push(point);
        self.last_sample_ms = Some(sample.timestamp_ms);
        if reanchored {
            IngestOutcome::Reanchored
        } else {
            IngestOutcome::Accepted
        }
    }

    /// Per-axis median of the buffered raw points
    #[must_use]
    pub fn current_filtered(&self) -> Option<Point> {
        self.median.filtered()
    }

    /// Smooth a (calibrated) point over `dt_secs`
    pub fn smooth(&mut self, filtered: Point, dt_secs: f64) -> Point {
        self.smoother.smooth(filtered, dt_secs)
    }

    /// Run the hysteresis dwell detector
    pub fn update_dwell(&mut self, smoothed: Point, dt_secs: f64) -> DwellState {
        self.dwell.update(smoothed, dt_secs)
    }

    /// Dwell time mapped through the configured target and easing
    #[must_use]
    pub fn intensity(&self, dwell_seconds: f64) -> f64 {
        map_dwell_to_intensity(dwell_seconds, self.settings.target_dwell_secs, self.settings.easing)
    }

    /// Whether an accepted sample arrived within the hold window of `now_ms`
    #[must_use]
    pub fn has_signal(&self, now_ms: f64) -> bool {
        self.last_sample_ms
            .is_some_and(|last| now_ms - last <= self.settings.hold_ms)
    }

    /// Produce this frame's output
    pub fn frame(&mut self, now_ms: f64) -> FrameOutput {
        let dt = self
            .last_frame_ms
            .map_or(0.0, |prev| ((now_ms - prev) / 1000.0).clamp(0.0, self.settings.max_frame_dt));
        self.last_frame_ms = Some(now_ms);

        let has_signal = self.has_signal(now_ms);
        if has_signal != self.signal {
            if has_signal {
                info!("Gaze signal acquired");
            } else {
                info!("Gaze signal lost (no sample for {:.0} ms)", self.settings.hold_ms);
            }
            self.signal = has_signal;
        }

        let filtered = if has_signal { self.current_filtered() } else { None };
        let Some(filtered) = filtered else {
            return self.no_signal_output();
        };

        let corrected = self.transform.apply(filtered);
        let smoothed = self.smooth(corrected, dt);
        let dwell = self.update_dwell(smoothed, dt);
        let intensity = self.intensity(dwell.dwell_seconds);
        if dwell.just_reanchored {
            trace!("Dwell anchor moved to ({:.1}, {:.1})", smoothed.x, smoothed.y);
        }

        FrameOutput {
            display_x: smoothed.x,
            display_y: smoothed.y,
            dwell_intensity: intensity,
            has_signal: true,
            dwell: Some(dwell),
            level: DwellLevel::from_intensity(intensity),
        }
    }

    fn no_signal_output(&self) -> FrameOutput {
        let display = self.smoother.current().unwrap_or_default();
        FrameOutput {
            display_x: display.x,
            display_y: display.y,
            dwell_intensity: 0.0,
            has_signal: false,
            dwell: None,
            level: DwellLevel::default(),
        }
    }

    /// Install a new calibration transform
    pub fn set_transform(&mut self, transform: AffineTransform) {
        info!("Installing calibration transform {:?}", transform.rows);
        self.transform = transform;
    }

    #[must_use]
    pub const fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    #[must_use]
    pub const fn settings(&self) -> &ConditionerSettings {
        &self.settings
    }

    /// Raw points currently in the median buffer, oldest first
    pub fn buffered(&self) -> impl Iterator<Item = &Point> {
        self.median.iter()
    }

    /// Number of samples dropped by the jump gate so far
    #[must_use]
    pub const fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Dwell accumulator
    #[must_use]
    pub const fn dwell_seconds(&self) -> f64 {
        self.dwell.dwell_seconds()
    }

    /// Clear all tracking state, keeping the calibration transform
    pub fn reset(&mut self) {
        self.jump_gate.reset();
        self.median.clear();
        self.smoother.reset();
        self.dwell.reset();
        self.last_sample_ms = None;
        self.last_frame_ms = None;
        self.signal = false;
        self.rejected = 0;
    }
}
