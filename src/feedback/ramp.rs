use serde::{Deserialize, Serialize};

use crate::utils::safe_cast::f64_to_u8_clamp;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb`
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        Some(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    /// `#rrggbb` representation
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Self, t: f64) -> Self {
        let mix = |a: u8, b: u8| f64_to_u8_clamp((f64::from(b) - f64::from(a)).mul_add(t, f64::from(a)));
        Self(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// One gradient stop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Position in `[0, 1]`
    pub t: f64,
    /// Color at this position
    pub color: Rgb,
}

/// Piecewise-linear color gradient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
}

impl ColorRamp {
    /// Build a ramp from stops sorted by position
    ///
    /// # Panics
    ///
    /// Panics if `stops` is empty or not sorted
    #[must_use]
    pub fn new(stops: Vec<ColorStop>) -> Self {
        assert!(!stops.is_empty(), "Color ramp needs at least one stop");
        assert!(
            stops.windows(2).all(|w| w[0].t <= w[1].t),
            "Color ramp stops must be sorted by position"
        );
        Self { stops }
    }

    /// Blue, green, yellow, red evenly spaced; used for the dwell levels
    #[must_use]
    pub fn levels() -> Self {
        let colors = [Rgb(0x59, 0x89, 0xdc), Rgb(0x00, 0xb2, 0x00), Rgb(0xff, 0xd4, 0x00), Rgb(0xff, 0x3b, 0x3b)];
        Self::new(
            colors
                .iter()
                .zip([0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0])
                .map(|(&color, t)| ColorStop { t, color })
                .collect(),
        )
    }

    /// Heat map gradient
    #[must_use]
    pub fn heat() -> Self {
        Self::new(vec![
            ColorStop { t: 0.00, color: Rgb(0, 120, 255) },
            ColorStop { t: 0.25, color: Rgb(0, 255, 0) },
            ColorStop { t: 0.50, color: Rgb(255, 255, 0) },
            ColorStop { t: 1.00, color: Rgb(255, 0, 0) },
        ])
    }

    /// Color at position `t`, clamped to the end stops
    #[must_use]
    pub fn sample(&self, t: f64) -> Rgb {
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if t.is_nan() || t <= first.t {
            return first.color;
        }
        if t >= last.t {
            return last.color;
        }

        for pair in self.stops.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if t <= next.t {
                let span = next.t - prev.t;
                let local = if span > 0.0 { (t - prev.t) / span } else { 1.0 };
                return prev.color.lerp(next.color, local);
            }
        }
        last.color
    }

    /// Color of the stop for a discrete level, saturating at the last stop
    #[must_use]
    pub fn stop_color(&self, level: usize) -> Rgb {
        self.stops[level.min(self.stops.len() - 1)].color
    }
}
