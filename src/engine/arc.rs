//! Sampled circular arcs for the battery dish and other segment outlines.

use super::trig::{FPoint, Fixed, FIXED_SHIFT};

/// Integer square root, rounded down.
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = x / 2 + x % 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Half-width of a circle of `radius` pixels at each of the first
/// `samples` rows below its top, as fixed-point offsets.
///
/// `radius` must be at least `samples`.
pub fn build_arc(radius: i32, samples: usize) -> Vec<Fixed> {
    let r = radius as i64;
    (0..samples as i64)
        .map(|k| {
            let dy = r - k;
            let span = (r * r - dy * dy).max(0) as u64;
            isqrt(span << (2 * FIXED_SHIFT)) as Fixed
        })
        .collect()
}

/// Close a polygon around a circular segment hanging from `apex`.
///
/// Walks the left edge top to bottom, then the mirrored right edge bottom to
/// top. Rows are `row_height` apart.
pub fn trace_dish(table: &[Fixed], apex: FPoint, row_height: Fixed) -> Vec<FPoint> {
    let row_y = |k: usize| apex.y + k as Fixed * row_height;
    let left = table
        .iter()
        .enumerate()
        .map(|(k, &dx)| FPoint::new(apex.x - dx, row_y(k)));
    let right = table
        .iter()
        .enumerate()
        .rev()
        .map(|(k, &dx)| FPoint::new(apex.x + dx, row_y(k)));
    left.chain(right).collect()
}
