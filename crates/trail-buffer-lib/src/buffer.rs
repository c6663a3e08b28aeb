//! Offset polygons around open planar polylines
//!
//! All tracks of a set are stroked in one pass with miter joins and square caps, and
//! the strokes are unioned: tracks whose corridors touch or overlap end up in the
//! same polygon, tracks further apart than twice the distance stay separate.
//! The offsetting itself is delegated to `geo`'s [`Buffer`] implementation.

use crate::{BufferPolygon, DataError, Result};
use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin};
use geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Polygon, RemoveRepeatedPoints};
use std::cmp::Ordering;

/// Ratio of miter length to buffer distance above which a corner is beveled
pub const MITER_LIMIT: f64 = 2.0;

/// `geo` takes the miter limit as the sharpest corner angle (radians) still mitered.
/// A ratio of 2 corresponds to 60 degrees.
fn miter_min_angle() -> f64 {
    2.0 * MITER_LIMIT.recip().asin()
}

/// Buffer a set of open polylines by `distance`
///
/// Returns every connected component of the union, largest first. Empty tracks
/// contribute nothing, so a set of only empty tracks yields an empty list.
///
/// # Errors
/// - [`DataError::EmptyTrackSet`] if `tracks` is empty
/// - [`DataError::InvalidDistance`] if `distance` is not a positive finite number
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn buffer(tracks: &[LineString<f64>], distance: f64) -> Result<Vec<BufferPolygon>> {
    if tracks.is_empty() {
        return Err(DataError::EmptyTrackSet);
    }
    if !distance.is_finite() || distance <= 0.0 {
        return Err(DataError::InvalidDistance {
            name: "buffer distance",
            value: distance,
            requirement: "> 0",
        });
    }

    let mut lines = Vec::with_capacity(tracks.len());
    let mut points = Vec::new();
    for track in tracks {
        // Zero-length segments have no direction to offset along
        let track = track.remove_repeated_points();
        match track.0.as_slice() {
            [] => {}
            [point] => points.push(*point),
            _ => lines.push(track),
        }
    }

    if lines.is_empty() && points.is_empty() {
        tracing::debug!("All {} tracks are empty, nothing to buffer", tracks.len());
        return Ok(Vec::new());
    }

    let style = BufferStyle::new(distance)
        .line_join(LineJoin::Miter(miter_min_angle()))
        .line_cap(LineCap::Square);

    let mut merged = if lines.is_empty() {
        MultiPolygon::new(Vec::new())
    } else {
        MultiLineString::new(lines).buffer_with_style(style)
    };

    for point in points {
        tracing::debug!("Buffering single-point track at ({}, {})", point.x, point.y);
        let square = MultiPolygon::new(vec![point_square(point, distance)]);
        merged = merged.union(&square);
    }

    let mut solutions: Vec<BufferPolygon> = merged.into_iter().map(BufferPolygon::new).collect();
    solutions.sort_by(compare_solutions);

    tracing::debug!(
        "Buffer produced {} solution(s) with {} vertices",
        solutions.len(),
        solutions.iter().map(BufferPolygon::vertex_count).sum::<usize>()
    );
    Ok(solutions)
}

/// A single point with square caps on both sides: an axis-aligned square
fn point_square(center: Coord<f64>, distance: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (center.x - distance, center.y - distance),
            (center.x + distance, center.y - distance),
            (center.x + distance, center.y + distance),
            (center.x - distance, center.y + distance),
        ]),
        Vec::new(),
    )
}

/// Largest area first, then west to east, then south to north
fn compare_solutions(a: &BufferPolygon, b: &BufferPolygon) -> Ordering {
    let min_corner = |p: &BufferPolygon| {
        p.bounding_rect()
            .map_or((f64::INFINITY, f64::INFINITY), |rect| (rect.min().x, rect.min().y))
    };
    let (ax, ay) = min_corner(a);
    let (bx, by) = min_corner(b);

    b.area()
        .total_cmp(&a.area())
        .then(ax.total_cmp(&bx))
        .then(ay.total_cmp(&by))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::from(points.to_vec())
    }

    fn has_vertex_near(polygon: &BufferPolygon, target: Coord<f64>) -> bool {
        polygon
            .exterior()
            .coords()
            .any(|c| (c.x - target.x).hypot(c.y - target.y) < 1e-3)
    }

    fn assert_covers(solutions: &[BufferPolygon], track: &LineString<f64>, distance: f64) {
        for coord in track.coords() {
            let covering = solutions.iter().find(|p| p.contains(*coord));
            let polygon = covering.unwrap_or_else(|| panic!("{coord:?} not covered"));
            // Miter corners sit at most MITER_LIMIT * distance away
            let boundary = polygon.boundary_distance(*coord);
            assert!(boundary >= distance * 0.99, "{coord:?} too close to edge: {boundary}");
            assert!(boundary <= distance * MITER_LIMIT + 1e-6);
        }
    }

    #[test]
    fn test_empty_set_is_rejected() {
        assert!(matches!(buffer(&[], 10.0), Err(DataError::EmptyTrackSet)));
    }

    #[test]
    fn test_invalid_distance_is_rejected() {
        let tracks = [line(&[(0.0, 0.0), (10.0, 0.0)])];
        for distance in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                buffer(&tracks, distance),
                Err(DataError::InvalidDistance { .. })
            ));
        }
    }

    #[test]
    fn test_all_empty_tracks_give_no_solutions() {
        let tracks = [LineString::new(Vec::new()), LineString::new(Vec::new())];
        assert!(buffer(&tracks, 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_straight_segment_has_square_caps() {
        let tracks = [line(&[(0.0, 0.0), (100.0, 0.0)])];
        let solutions = buffer(&tracks, 10.0).unwrap();
        assert_eq!(solutions.len(), 1);

        let rect = solutions[0].bounding_rect().unwrap();
        // Square caps extend the corridor by the distance past both ends
        assert!((rect.min().x + 10.0).abs() < 1e-6);
        assert!((rect.max().x - 110.0).abs() < 1e-6);
        assert!((rect.min().y + 10.0).abs() < 1e-6);
        assert!((rect.max().y - 10.0).abs() < 1e-6);
        assert!((solutions[0].area() - 120.0 * 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_right_angle_has_sharp_miter_corner() {
        let track = line(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
        let solutions = buffer(std::slice::from_ref(&track), 10.0).unwrap();
        assert_eq!(solutions.len(), 1);

        // The outer corner of a right angle is at distance * sqrt(2), within the limit
        let corner = Coord { x: 109.9, y: -9.9 };
        assert!(solutions[0].contains(corner));
        assert!(has_vertex_near(&solutions[0], Coord { x: 110.0, y: -10.0 }));
        assert_covers(&solutions, &track, 10.0);
    }

    #[test]
    fn test_miter_angle_matches_ratio() {
        assert!((miter_min_angle() - std::f64::consts::FRAC_PI_3).abs() < 1e-12);
    }

    #[test]
    fn test_sharp_turn_is_beveled() {
        // A 30 degree hairpin needs a miter of 1/sin(15 deg) ~ 3.9 times the distance
        let turn = 30f64.to_radians();
        let track = line(&[
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0 - 100.0 * turn.cos(), 100.0 * turn.sin()),
        ]);
        let solutions = buffer(std::slice::from_ref(&track), 10.0).unwrap();
        assert_eq!(solutions.len(), 1);

        let rect = solutions[0].bounding_rect().unwrap();
        assert!(rect.max().x < 100.0 + 10.0 * MITER_LIMIT + 1e-6);
        for coord in track.coords() {
            assert!(solutions[0].contains(*coord));
        }
    }

    #[test]
    fn test_overlapping_tracks_merge() {
        let tracks = [
            line(&[(0.0, 0.0), (100.0, 0.0)]),
            line(&[(0.0, 15.0), (100.0, 15.0)]),
        ];
        let solutions = buffer(&tracks, 10.0).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].contains(Coord { x: 50.0, y: 7.5 }));
    }

    #[test]
    fn test_distant_tracks_stay_disjoint() {
        let tracks = [
            line(&[(0.0, 0.0), (100.0, 0.0)]),
            line(&[(0.0, 100.0), (50.0, 100.0)]),
        ];
        let solutions = buffer(&tracks, 10.0).unwrap();
        assert_eq!(solutions.len(), 2);
        // Larger corridor first
        assert!(solutions[0].area() > solutions[1].area());
        assert!(solutions[0].contains(Coord { x: 50.0, y: 0.0 }));
        assert!(solutions[1].contains(Coord { x: 25.0, y: 100.0 }));
    }

    #[test]
    fn test_repeated_points_are_ignored() {
        let tracks = [line(&[(0.0, 0.0), (0.0, 0.0), (50.0, 0.0), (50.0, 0.0)])];
        let solutions = buffer(&tracks, 5.0).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!((solutions[0].area() - 60.0 * 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_single_point_track_is_square() {
        let tracks = [line(&[(10.0, 10.0)])];
        let solutions = buffer(&tracks, 5.0).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!((solutions[0].area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_merges_with_nearby_track() {
        let tracks = [line(&[(0.0, 0.0), (100.0, 0.0)]), line(&[(50.0, 12.0)])];
        let solutions = buffer(&tracks, 10.0).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].contains(Coord { x: 50.0, y: 20.0 }));
    }

    #[test]
    fn test_winding_track_is_covered() {
        let track = LineString::new(
            (0..200)
                .map(|i| {
                    let t = i as f64 / 200.0;
                    Coord {
                        x: t * 1000.0,
                        y: (t * 12.0).sin() * 80.0,
                    }
                })
                .collect(),
        );
        let solutions = buffer(std::slice::from_ref(&track), 25.0).unwrap();
        assert_eq!(solutions.len(), 1);
        for coord in track.coords() {
            assert!(solutions[0].contains(*coord));
        }
    }
}
