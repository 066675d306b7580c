//! Point simplification for finished strokes.
//!
//! Long strokes are downsampled with a fixed stride before they enter the
//! store. The output always starts and ends on the original endpoints.

/// Coordinate values (not points) above which a stroke is simplified.
pub const MAX_POINT_VALUES: usize = 200;

/// Approximate number of points kept after simplification.
pub const TARGET_POINTS: usize = 100;

/// Downsample a flat `[x0, y0, x1, y1, ...]` sequence.
///
/// Sequences of at most [`MAX_POINT_VALUES`] values are returned unchanged.
/// Otherwise one pair is kept every `floor(points / TARGET_POINTS)` points,
/// and the final pair is appended if the stride skipped it. A dangling odd
/// value is dropped.
#[must_use]
pub fn simplify_points(values: Vec<f64>) -> Vec<f64> {
    if values.len() <= MAX_POINT_VALUES {
        return values;
    }

    let total = values.len() / 2;
    let stride = (total / TARGET_POINTS).max(1);
    let mut out = Vec::with_capacity((total / stride + 1) * 2);

    let mut last_taken = 0;
    for i in (0..total).step_by(stride) {
        out.extend_from_slice(&values[i * 2..i * 2 + 2]);
        last_taken = i;
    }
    if last_taken != total - 1 {
        out.extend_from_slice(&values[(total - 1) * 2..total * 2]);
    }
    out
}

#[cfg(test)]
#[path = "simplify_test.rs"]
mod tests;
