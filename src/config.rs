//! Configuration management for the gaze dwell pipeline

use crate::{
    calibration::{grid_targets_with, CalibrationSession, SolverOptions},
    conditioner::{ConditionerSettings, GazeConditioner},
    constants::{
        CALIBRATION_GRID_FRACTIONS, DEFAULT_COLLECTION_WINDOW_MS, DEFAULT_DECAY_INTERVAL_MS, DEFAULT_EMA_MAX,
        DEFAULT_EMA_MIN, DEFAULT_FIXED_ALPHA, DEFAULT_HEAT_COOL_RATE, DEFAULT_HOLD_MS, DEFAULT_IDLE_MS,
        DEFAULT_INNER_RADIUS, DEFAULT_LEVEL_STEP_MS, DEFAULT_MAX_FRAME_DT, DEFAULT_MAX_FRAME_JUMP,
        DEFAULT_MEDIAN_WINDOW, DEFAULT_MIN_CALIBRATION_PAIRS, DEFAULT_OUTER_RADIUS, DEFAULT_TARGET_DWELL_SECS,
        DEFAULT_TAU_SECS, DEFAULT_TRIM_FRACTION, DEFAULT_VELOCITY_REF,
    },
    dwell::Easing,
    feedback::{HeatBrush, LevelTiming},
    filters::{exponential::SmoothingPolicy, parse_policy},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sample gating and buffering
    pub conditioner: ConditionerConfig,

    /// Display smoothing
    pub smoothing: SmoothingConfig,

    /// Dwell detection
    pub dwell: DwellConfig,

    /// Calibration collection and fitting
    pub calibration: CalibrationConfig,

    /// Level grid and heat map feedback
    pub feedback: FeedbackConfig,
}

/// Sample gating and buffering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Median buffer capacity
    pub median_window: usize,

    /// Largest accepted jump between raw samples (px)
    pub max_frame_jump: f64,

    /// Signal is lost after this long without an accepted sample (ms)
    pub hold_ms: f64,

    /// Cap on the frame interval (seconds)
    pub max_frame_dt: f64,
}

/// Smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// `none`, `fixed`, `time_constant` or `adaptive`; any other value is
    /// parsed as a smoother spec such as `tau:0.15`
    pub method: String,

    /// Fixed smoothing factor
    pub alpha: f64,

    /// Time constant (seconds)
    pub tau_secs: f64,

    /// Adaptive alpha when still
    pub ema_min: f64,

    /// Adaptive alpha when moving fast
    pub ema_max: f64,

    /// Velocity (px per update) that reaches `ema_max`
    pub velocity_ref: f64,
}

/// Dwell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Dwell accumulates inside this radius (px)
    pub inner_radius: f64,

    /// Anchor moves at or beyond this radius (px)
    pub outer_radius: f64,

    /// Dwell time that maps to full intensity (seconds)
    pub target_dwell_secs: f64,

    /// Intensity easing
    pub easing: Easing,
}

/// Calibration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Target positions as fractions of each screen dimension
    pub grid_fractions: Vec<f64>,

    /// Collection time per target (ms)
    pub window_ms: f64,

    /// Share of worst-fitting pairs discarded before the refit
    pub trim_fraction: f64,

    /// Minimum pairs for a fit
    pub min_pairs: usize,
}

/// Feedback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Level grid cell size (px)
    pub cell_size: f64,

    /// Time in a cell per level step (ms)
    pub level_step_ms: f64,

    /// Idle time before levels cool (ms)
    pub idle_ms: f64,

    /// Interval between cool-down steps (ms)
    pub decay_interval_ms: f64,

    /// Heat lost per frame
    pub heat_cool_rate: f32,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            median_window: DEFAULT_MEDIAN_WINDOW,
            max_frame_jump: DEFAULT_MAX_FRAME_JUMP,
            hold_ms: DEFAULT_HOLD_MS,
            max_frame_dt: DEFAULT_MAX_FRAME_DT,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            method: "time_constant".to_string(),
            alpha: DEFAULT_FIXED_ALPHA,
            tau_secs: DEFAULT_TAU_SECS,
            ema_min: DEFAULT_EMA_MIN,
            ema_max: DEFAULT_EMA_MAX,
            velocity_ref: DEFAULT_VELOCITY_REF,
        }
    }
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            inner_radius: DEFAULT_INNER_RADIUS,
            outer_radius: DEFAULT_OUTER_RADIUS,
            target_dwell_secs: DEFAULT_TARGET_DWELL_SECS,
            easing: Easing::Linear,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            grid_fractions: CALIBRATION_GRID_FRACTIONS.to_vec(),
            window_ms: DEFAULT_COLLECTION_WINDOW_MS,
            trim_fraction: DEFAULT_TRIM_FRACTION,
            min_pairs: DEFAULT_MIN_CALIBRATION_PAIRS,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            cell_size: 50.0,
            level_step_ms: DEFAULT_LEVEL_STEP_MS,
            idle_ms: DEFAULT_IDLE_MS,
            decay_interval_ms: DEFAULT_DECAY_INTERVAL_MS,
            heat_cool_rate: DEFAULT_HEAT_COOL_RATE,
        }
    }
}

impl SmoothingConfig {
    /// Resolve the configured policy, `None` meaning pass-through
    pub fn policy(&self) -> Result<Option<SmoothingPolicy>> {
        let policy = match self.method.as_str() {
            "none" => return Ok(None),
            "fixed" => SmoothingPolicy::Fixed { alpha: self.alpha },
            "time_constant" => SmoothingPolicy::TimeConstant {
                tau_secs: self.tau_secs,
            },
            "adaptive" => SmoothingPolicy::Adaptive {
                ema_min: self.ema_min,
                ema_max: self.ema_max,
                velocity_ref: self.velocity_ref,
            },
            spec => return parse_policy(spec).map_err(|e| Error::ConfigError(e.to_string())),
        };
        policy.check().map_err(Error::ConfigError)?;
        Ok(Some(policy))
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Conditioner settings described by this configuration
    pub fn conditioner_settings(&self) -> Result<ConditionerSettings> {
        Ok(ConditionerSettings {
            median_window: self.conditioner.median_window,
            max_frame_jump: self.conditioner.max_frame_jump,
            hold_ms: self.conditioner.hold_ms,
            max_frame_dt: self.conditioner.max_frame_dt,
            smoothing: self.smoothing.policy()?,
            inner_radius: self.dwell.inner_radius,
            outer_radius: self.dwell.outer_radius,
            target_dwell_secs: self.dwell.target_dwell_secs,
            easing: self.dwell.easing,
        })
    }

    /// Create a conditioner from configuration
    pub fn build_conditioner(&self) -> Result<GazeConditioner> {
        GazeConditioner::new(self.conditioner_settings()?)
    }

    /// Solver options from configuration
    #[must_use]
    pub const fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            trim_fraction: self.calibration.trim_fraction,
            min_pairs: self.calibration.min_pairs,
        }
    }

    /// Calibration session over a `width` x `height` screen
    pub fn calibration_session(&self, width: f64, height: f64) -> Result<CalibrationSession> {
        self.validate()?;
        let targets = grid_targets_with(width, height, &self.calibration.grid_fractions);
        Ok(CalibrationSession::new(
            targets,
            self.calibration.window_ms,
            self.solver_options(),
        ))
    }

    /// Level grid timings
    #[must_use]
    pub const fn level_timing(&self) -> LevelTiming {
        LevelTiming {
            step_ms: self.feedback.level_step_ms,
            idle_ms: self.feedback.idle_ms,
            decay_interval_ms: self.feedback.decay_interval_ms,
        }
    }

    /// Heat brush with the configured cooling rate
    #[must_use]
    pub fn heat_brush(&self) -> HeatBrush {
        HeatBrush {
            cool_rate: self.feedback.heat_cool_rate,
            ..HeatBrush::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.conditioner_settings()?.validate()?;

        self.solver_options()
            .validate()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        if !(self.calibration.window_ms > 0.0) {
            return Err(Error::ConfigError(
                "Calibration window must be positive".to_string(),
            ));
        }
        if self.calibration.grid_fractions.is_empty()
            || !self.calibration.grid_fractions.iter().all(|f| (0.0..=1.0).contains(f))
        {
            return Err(Error::ConfigError(
                "Calibration grid fractions must be non-empty and within [0, 1]".to_string(),
            ));
        }

        // Feedback
        if !(self.feedback.cell_size > 0.0) {
            return Err(Error::ConfigError("Cell size must be positive".to_string()));
        }
        if self.feedback.level_step_ms < 0.0
            || self.feedback.idle_ms < 0.0
            || self.feedback.decay_interval_ms < 0.0
        {
            return Err(Error::ConfigError(
                "Feedback timings must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.feedback.heat_cool_rate) {
            return Err(Error::ConfigError(
                "Heat cool rate must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Dwell Configuration

# Sample gating and buffering
conditioner:
  median_window: 5
  max_frame_jump: 160.0
  hold_ms: 600.0
  max_frame_dt: 0.1

# Display smoothing: none, fixed, time_constant, adaptive
smoothing:
  method: "time_constant"
  alpha: 0.25
  tau_secs: 0.2
  ema_min: 0.18
  ema_max: 0.35
  velocity_ref: 60.0

# Dwell detection
dwell:
  inner_radius: 45.0
  outer_radius: 65.0
  target_dwell_secs: 1.5
  easing: "linear"

# Calibration
calibration:
  grid_fractions: [0.1, 0.5, 0.9]
  window_ms: 300.0
  trim_fraction: 0.1
  min_pairs: 4

# Feedback
feedback:
  cell_size: 50.0
  level_step_ms: 120.0
  idle_ms: 5000.0
  decay_interval_ms: 1200.0
  heat_cool_rate: 0.0015
"#;
