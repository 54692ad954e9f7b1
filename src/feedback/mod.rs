//! Feedback parameters derived from conditioned gaze: colors, cell levels,
//! heat, and beep timing. Rendering and tone synthesis stay with the host.

/// Color gradients for levels and heat
pub mod ramp;

/// Per-cell discrete levels with step-up and idle cool-down
pub mod level;

/// Accumulating heat field and dwell-scaled brush
pub mod heatmap;

/// Beep scheduling per dwell level
pub mod audio;

pub use audio::{level_blip, Beep, BeepScheduler};
pub use heatmap::{HeatBrush, HeatField};
pub use level::{LevelGrid, LevelTiming};
pub use ramp::{ColorRamp, ColorStop, Rgb};
