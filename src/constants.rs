//! Constants used throughout the library

/// Median filter buffer capacity
pub const DEFAULT_MEDIAN_WINDOW: usize = 5;

/// Samples farther than this from the last accepted raw point are dropped (px)
pub const DEFAULT_MAX_FRAME_JUMP: f64 = 160.0;

/// Consecutive rejected samples that agree with each other before the jump
/// gate moves to them
pub const JUMP_REANCHOR_RUN: usize = 3;

/// Signal is considered lost after this long without an accepted sample
pub const DEFAULT_HOLD_MS: f64 = 600.0;

/// Upper bound on the frame interval fed to smoothing and dwell (seconds)
pub const DEFAULT_MAX_FRAME_DT: f64 = 0.1;

/// Smoothing defaults
pub const DEFAULT_FIXED_ALPHA: f64 = 0.25;
pub const DEFAULT_TAU_SECS: f64 = 0.20;
pub const DEFAULT_EMA_MIN: f64 = 0.18;
pub const DEFAULT_EMA_MAX: f64 = 0.35;
pub const DEFAULT_VELOCITY_REF: f64 = 60.0;

/// Dwell hysteresis radii (px)
pub const DEFAULT_INNER_RADIUS: f64 = 45.0;
pub const DEFAULT_OUTER_RADIUS: f64 = 65.0;

/// Dwell time that maps to full intensity
pub const DEFAULT_TARGET_DWELL_SECS: f64 = 1.5;

/// Calibration grid fractions along each axis
pub const CALIBRATION_GRID_FRACTIONS: [f64; 3] = [0.1, 0.5, 0.9];

/// Per-target sample collection window
pub const DEFAULT_COLLECTION_WINDOW_MS: f64 = 300.0;

/// Share of worst-fitting calibration pairs discarded before the refit
pub const DEFAULT_TRIM_FRACTION: f64 = 0.10;

/// Sessions with fewer pairs than this fall back to identity
pub const DEFAULT_MIN_CALIBRATION_PAIRS: usize = 4;

/// Minimum pairs for a well-posed per-axis fit
pub const MIN_AXIS_FIT_PAIRS: usize = 3;

/// Normal matrices with a smaller determinant are treated as singular
pub const DETERMINANT_EPSILON: f64 = 1e-6;

/// Highest discrete feedback level
pub const MAX_LEVEL: u8 = 3;

/// Grid level stepping and cool-down timings
pub const DEFAULT_LEVEL_STEP_MS: f64 = 120.0;
pub const DEFAULT_IDLE_MS: f64 = 5000.0;
pub const DEFAULT_DECAY_INTERVAL_MS: f64 = 1200.0;

/// Heat field cooling per frame
pub const DEFAULT_HEAT_COOL_RATE: f32 = 0.0015;
