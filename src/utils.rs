//! Small numeric helpers shared by the filters and the calibration solver.

pub mod safe_cast;

use crate::geometry::Point;

/// Median of a slice of values, sorting it in place
///
/// Odd lengths return the middle element, even lengths the mean of the two
/// middle elements. Returns `None` for an empty slice.
pub fn median_in_place(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let len = values.len();
    if len % 2 == 0 {
        Some((values[len / 2 - 1] + values[len / 2]) / 2.0)
    } else {
        Some(values[len / 2])
    }
}

/// Per-axis median of a set of points
pub fn median_point<'a, I>(points: I) -> Option<Point>
where
    I: IntoIterator<Item = &'a Point>,
{
    let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = points.into_iter().map(|p| (p.x, p.y)).unzip();
    let x = median_in_place(&mut xs)?;
    let y = median_in_place(&mut ys)?;
    Some(Point::new(x, y))
}
