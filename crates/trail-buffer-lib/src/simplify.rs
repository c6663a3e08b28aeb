//! Ramer-Douglas-Peucker simplification of planar tracks
//!
//! Tracks are simplified before buffering to keep the offset polygon small. The
//! deviation of a dropped point is measured against the chord *segment*, not the
//! infinite line through it, so points beyond the chord ends are never dropped
//! just because they are collinear.

use geo::{Coord, LineString};

/// Distance from `point` to the segment `start`-`end`
///
/// The projection parameter is clamped to `[0, 1]`, so beyond either end the result
/// is the distance to that endpoint. A zero-length segment degrades to the distance
/// between `point` and `start`.
#[inline]
pub fn segment_distance(point: Coord<f64>, start: Coord<f64>, end: Coord<f64>) -> f64 {
    let d = end - start;
    let length_squared = d.x * d.x + d.y * d.y;
    if length_squared == 0.0 {
        return (point.x - start.x).hypot(point.y - start.y);
    }

    let t = ((point.x - start.x) * d.x + (point.y - start.y) * d.y) / length_squared;
    let nearest = if t < 0.0 {
        start
    } else if t > 1.0 {
        end
    } else {
        start + d * t
    };
    (point.x - nearest.x).hypot(point.y - nearest.y)
}

/// Indices of the points kept by Ramer-Douglas-Peucker at `tolerance`
///
/// The returned indices are sorted and always include the first and last point.
/// Ties for the farthest point go to the lowest index. Runs on an explicit stack,
/// so very long tracks cannot overflow the call stack.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn simplify_indices(points: &[Coord<f64>], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }
    // Negative or NaN tolerances behave like zero
    let tolerance = tolerance.max(0.0);

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0, n - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }

        let mut max_distance = 0.0;
        let mut max_index = first;
        for (i, point) in points.iter().enumerate().take(last).skip(first + 1) {
            let distance = segment_distance(*point, points[first], points[last]);
            if distance > max_distance {
                max_distance = distance;
                max_index = i;
            }
        }

        if max_distance > tolerance {
            keep[max_index] = true;
            // Right half pushed first so the left half is processed first
            stack.push((max_index, last));
            stack.push((first, max_index));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &kept)| kept.then_some(i))
        .collect()
}

/// Simplify a planar track, returning a subsequence of its points
pub fn simplify(track: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let indices = simplify_indices(&track.0, tolerance);
    LineString::new(indices.into_iter().map(|i| track.0[i]).collect())
}

/// Simplify every track of a set independently
pub fn simplify_tracks(tracks: &[LineString<f64>], tolerance: f64) -> Vec<LineString<f64>> {
    tracks
        .iter()
        .map(|track| {
            let simplified = simplify(track, tolerance);
            tracing::debug!(
                "Simplified track from {} to {} points",
                track.0.len(),
                simplified.0.len()
            );
            simplified
        })
        .collect()
}
