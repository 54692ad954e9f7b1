use crate::{
    constants::DEFAULT_HEAT_COOL_RATE,
    geometry::Point,
    utils::safe_cast::{cell_index, f64_to_i64},
};

/// Accumulating heat grid in `[0, 1]` per cell
#[derive(Debug, Clone)]
pub struct HeatField {
    cols: usize,
    rows: usize,
    cell_size: f64,
    heat: Vec<f32>,
}

impl HeatField {
    /// Create a field of `cols` x `rows` cells of `cell_size` px
    ///
    /// # Panics
    ///
    /// Panics if the field is empty or `cell_size` is not positive
    #[must_use]
    pub fn new(cols: usize, rows: usize, cell_size: f64) -> Self {
        assert!(cols > 0 && rows > 0, "Heat field must have at least one cell");
        assert!(cell_size > 0.0, "Cell size must be positive, got {cell_size}");
        Self {
            cols,
            rows,
            cell_size,
            heat: vec![0.0; cols * rows],
        }
    }

    /// Field covering a `width` x `height` px surface
    ///
    /// Cells are at least `min_cell` px and roughly 1/120 of the shorter side.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn covering(width: f64, height: f64, min_cell: f64) -> Self {
        let cell = (width.min(height) / 120.0).floor().max(min_cell).max(1.0);
        let cols = (width / cell).ceil().max(1.0) as usize;
        let rows = (height / cell).ceil().max(1.0) as usize;
        Self::new(cols, rows, cell)
    }

    /// Add `amount * exp(-d² / radius)` to every cell within `radius` cells of `(x, y)`
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_sign_loss)]
    pub fn stamp(&mut self, point: Point, amount: f32, radius: usize) {
        let (Ok(cx), Ok(cy)) = (
            f64_to_i64((point.x / self.cell_size).floor()),
            f64_to_i64((point.y / self.cell_size).floor()),
        ) else {
            return;
        };
        let r = radius as i64;
        let spread = radius.max(1) as f32;

        for j in -r..=r {
            for i in -r..=r {
                let (ix, iy) = (cx + i, cy + j);
                if ix < 0 || iy < 0 || ix >= self.cols as i64 || iy >= self.rows as i64 {
                    continue;
                }
                let d2 = (i * i + j * j) as f32;
                let weight = (-d2 / spread).exp();
                let idx = iy as usize * self.cols + ix as usize;
                self.heat[idx] = amount.mul_add(weight, self.heat[idx]).min(1.0);
            }
        }
    }

    /// Subtract `rate` from every cell, flooring at zero
    pub fn cool(&mut self, rate: f32) {
        for h in &mut self.heat {
            *h = (*h - rate).max(0.0);
        }
    }

    /// Heat under a point, zero outside the field
    #[must_use]
    pub fn heat_at(&self, point: Point) -> f32 {
        let cell = cell_index(point.x, self.cell_size, self.cols)
            .zip(cell_index(point.y, self.cell_size, self.rows));
        cell.map_or(0.0, |(col, row)| self.heat[row * self.cols + col])
    }

    #[must_use]
    pub fn cells(&self) -> &[f32] {
        &self.heat
    }

    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }
}

/// Brush that grows with dwell time and stamps the heat field once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatBrush {
    /// Radius with no dwell (cells)
    pub min_radius: f64,
    /// Radius at `time_to_max` (cells)
    pub max_radius: f64,
    /// Dwell time to reach `max_radius`
    pub time_to_max_secs: f64,
    /// Ease exponent on the dwell ratio
    pub gamma: f64,
    /// Extra radius per unit of local heat, capped at `1 + heat_bonus`
    pub heat_bonus: f64,
    /// Stamp strength while dwelling
    pub dwell_amount: f32,
    /// Stamp strength while moving
    pub move_amount: f32,
    /// Cooling per frame
    pub cool_rate: f32,
}

impl Default for HeatBrush {
    fn default() -> Self {
        Self {
            min_radius: 3.0,
            max_radius: 60.0,
            time_to_max_secs: 3.5,
            gamma: 1.2,
            heat_bonus: 0.4,
            dwell_amount: 0.06,
            move_amount: 0.02,
            cool_rate: DEFAULT_HEAT_COOL_RATE,
        }
    }
}

impl HeatBrush {
    /// Stamp radius in cells for a dwell time and the heat already under the brush
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn radius(&self, dwell_secs: f64, local_heat: f32) -> usize {
        let t = if self.time_to_max_secs > 0.0 {
            (dwell_secs / self.time_to_max_secs).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let base = (self.max_radius - self.min_radius).mul_add(t.powf(self.gamma), self.min_radius).floor();
        let bonus = self.heat_bonus.mul_add(f64::from(local_heat.clamp(0.0, 1.0)), 1.0);
        let cap = self.max_radius * (1.0 + self.heat_bonus);
        (base * bonus).min(cap).floor().max(0.0) as usize
    }

    /// Stamp strength for a radius; larger brushes lay down less per cell
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn amount(&self, dwelling: bool, radius: usize) -> f32 {
        let base = if dwelling { self.dwell_amount } else { self.move_amount };
        base * (6.0 / (radius.max(3) as f32))
    }

    /// Stamp at `point` for one frame, then cool the field
    ///
    /// Returns the radius used.
    pub fn apply(&self, field: &mut HeatField, point: Option<Point>, dwell_secs: f64) -> usize {
        let dwelling = dwell_secs > 0.0;
        let radius = match point {
            Some(p) => {
                let radius = self.radius(dwell_secs, field.heat_at(p));
                field.stamp(p, self.amount(dwelling, radius), radius);
                radius
            }
            None => 0,
        };
        field.cool(self.cool_rate);
        radius
    }
}
