use std::collections::VecDeque;

use crate::{geometry::Point, utils::median_point};

/// Fixed-capacity FIFO of raw points with a per-axis median readout
#[derive(Debug, Clone)]
pub struct MedianBuffer {
    window_size: usize,
    buffer: VecDeque<Point>,
}

impl MedianBuffer {
    /// Create a new median buffer
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "Window size must be greater than 0");
        Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
        }
    }

    /// Append a point, evicting the oldest when full
    pub fn push(&mut self, point: Point) {
        if self.buffer.len() >= self.window_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(point);
    }

    /// Per-axis median of the buffered points
    #[must_use]
    pub fn filtered(&self) -> Option<Point> {
        median_point(&self.buffer)
    }

    /// Buffered points, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.buffer.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.window_size
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_buffer() {
        let mut buffer = MedianBuffer::new(3);

        buffer.push(Point::new(10.0, 20.0));
        assert_eq!(buffer.filtered(), Some(Point::new(10.0, 20.0)));

        buffer.push(Point::new(20.0, 30.0));
        assert_eq!(buffer.filtered(), Some(Point::new(15.0, 25.0))); // mean of the two middle values

        buffer.push(Point::new(30.0, 40.0));
        assert_eq!(buffer.filtered(), Some(Point::new(20.0, 30.0)));
    }

    #[test]
    fn test_median_with_outliers() {
        let mut buffer = MedianBuffer::new(3);

        buffer.push(Point::new(10.0, 20.0));
        buffer.push(Point::new(11.0, 21.0));
        buffer.push(Point::new(100.0, 200.0)); // outlier

        assert_eq!(buffer.filtered(), Some(Point::new(11.0, 21.0)));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = MedianBuffer::new(2);
        buffer.push(Point::new(1.0, 1.0));
        buffer.push(Point::new(2.0, 2.0));
        buffer.push(Point::new(3.0, 3.0));

        assert_eq!(buffer.len(), 2);
        let kept: Vec<Point> = buffer.iter().copied().collect();
        assert_eq!(kept, vec![Point::new(2.0, 2.0), Point::new(3.0, 3.0)]);
    }

    #[test]
    fn test_empty_buffer_has_no_median() {
        let buffer = MedianBuffer::new(5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.filtered(), None);
    }
}
