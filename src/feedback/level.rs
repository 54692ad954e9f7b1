use log::trace;

use crate::{
    constants::{DEFAULT_DECAY_INTERVAL_MS, DEFAULT_IDLE_MS, DEFAULT_LEVEL_STEP_MS, MAX_LEVEL},
    geometry::Point,
    utils::safe_cast::cell_index,
};

/// Timings for [`LevelGrid`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelTiming {
    /// Time in the same cell between level bumps
    pub step_ms: f64,
    /// Input must be idle this long before cells cool down
    pub idle_ms: f64,
    /// Interval between cool-down steps once idle
    pub decay_interval_ms: f64,
}

impl Default for LevelTiming {
    fn default() -> Self {
        Self {
            step_ms: DEFAULT_LEVEL_STEP_MS,
            idle_ms: DEFAULT_IDLE_MS,
            decay_interval_ms: DEFAULT_DECAY_INTERVAL_MS,
        }
    }
}

/// Grid of cells that heat up one level at a time under sustained attention
#[derive(Debug, Clone)]
pub struct LevelGrid {
    cols: usize,
    rows: usize,
    cell_size: f64,
    timing: LevelTiming,
    levels: Vec<u8>,
    current: Option<usize>,
    current_since_ms: f64,
    last_input_ms: f64,
    last_decay_ms: f64,
}

impl LevelGrid {
    /// Create a grid of `cols` x `rows` square cells of `cell_size` px
    ///
    /// # Panics
    ///
    /// Panics if the grid is empty or `cell_size` is not positive
    #[must_use]
    pub fn new(cols: usize, rows: usize, cell_size: f64, timing: LevelTiming) -> Self {
        assert!(cols > 0 && rows > 0, "Grid must have at least one cell");
        assert!(cell_size > 0.0, "Cell size must be positive, got {cell_size}");
        Self {
            cols,
            rows,
            cell_size,
            timing,
            levels: vec![0; cols * rows],
            current: None,
            current_since_ms: 0.0,
            last_input_ms: 0.0,
            last_decay_ms: 0.0,
        }
    }

    /// Cell index under a point, if inside the grid
    #[must_use]
    pub fn cell_at(&self, point: Point) -> Option<usize> {
        let col = cell_index(point.x, self.cell_size, self.cols)?;
        let row = cell_index(point.y, self.cell_size, self.rows)?;
        Some(row * self.cols + col)
    }

    /// Feed the current display position
    ///
    /// Entering a cell starts its timer; staying for `step_ms` bumps it one
    /// level. Returns the cell whose level changed, if any. `None` or an
    /// off-grid point clears the current cell. Only `Some` points count as
    /// input for the idle cool-down.
    pub fn observe(&mut self, point: Option<Point>, now_ms: f64) -> Option<usize> {
        if point.is_some() {
            self.last_input_ms = now_ms;
        }

        let Some(cell) = point.and_then(|p| self.cell_at(p)) else {
            self.current = None;
            return None;
        };

        if self.current != Some(cell) {
            self.current = Some(cell);
            self.current_since_ms = now_ms;
            return None;
        }

        if now_ms - self.current_since_ms < self.timing.step_ms {
            return None;
        }
        self.current_since_ms = now_ms;

        let level = &mut self.levels[cell];
        if *level >= MAX_LEVEL {
            return None;
        }
        *level += 1;
        trace!("Cell {} raised to level {}", cell, *level);
        Some(cell)
    }

    /// Cool every cell by one level per interval once input has been idle
    ///
    /// Returns `true` if any level changed.
    pub fn decay(&mut self, now_ms: f64) -> bool {
        if now_ms - self.last_input_ms < self.timing.idle_ms {
            return false;
        }
        if now_ms - self.last_decay_ms < self.timing.decay_interval_ms {
            return false;
        }
        self.last_decay_ms = now_ms;

        let mut changed = false;
        for level in self.levels.iter_mut().filter(|l| **l > 0) {
            *level -= 1;
            changed = true;
        }
        changed
    }

    #[must_use]
    pub fn level(&self, cell: usize) -> Option<u8> {
        self.levels.get(cell).copied()
    }

    #[must_use]
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Cell currently under attention
    #[must_use]
    pub const fn current_cell(&self) -> Option<usize> {
        self.current
    }
}
