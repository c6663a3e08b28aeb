//! Removal of offsetting artifacts from buffer polygons
//!
//! Miter joins and the union of overlapping strokes leave short edges and
//! "staircase" runs of almost collinear vertices. Cleaning walks each ring as a
//! circular doubly-linked list and drops a vertex when
//!
//! - it is within `min_spacing` of its predecessor,
//! - its two neighbours are within `min_spacing` of each other (a spike; both the
//!   vertex and its successor go), or
//! - the three consecutive vertices are within `min_spacing` of being collinear.
//!
//! Every removal re-examines the predecessor, and the walk ends once it reaches a
//! vertex that was already accepted.

use crate::polygon::ring_vertices;
use crate::{BufferPolygon, DataError, Result};
use geo::{Coord, LineString, Polygon};

/// Clean a single polygon
///
/// A standalone polygon is reported as `#1` if it collapses.
///
/// # Errors
/// [`DataError::CollapsedPolygon`] if the exterior ring keeps fewer than 3 vertices.
pub fn clean(polygon: &BufferPolygon, min_spacing: f64) -> Result<BufferPolygon> {
    clean_indexed(1, polygon, min_spacing)
}

/// Clean every polygon, labelling a collapse with the polygon's 1-based index
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn clean_all(polygons: &[BufferPolygon], min_spacing: f64) -> Result<Vec<BufferPolygon>> {
    polygons
        .iter()
        .enumerate()
        .map(|(i, polygon)| clean_indexed(i + 1, polygon, min_spacing))
        .collect()
}

fn clean_indexed(index: usize, polygon: &BufferPolygon, min_spacing: f64) -> Result<BufferPolygon> {
    let exterior = clean_ring(ring_vertices(polygon.exterior()), min_spacing);
    if exterior.len() < 3 {
        return Err(DataError::CollapsedPolygon {
            index,
            remaining: exterior.len(),
        });
    }

    let interiors = polygon
        .interiors()
        .iter()
        .filter_map(|ring| {
            let cleaned = clean_ring(ring_vertices(ring), min_spacing);
            if cleaned.len() < 3 {
                // A vanished hole only widens the allowed area
                tracing::debug!("Dropping collapsed hole of polygon #{}", index);
                None
            } else {
                Some(LineString::new(cleaned))
            }
        })
        .collect();

    Ok(BufferPolygon::new(Polygon::new(
        LineString::new(exterior),
        interiors,
    )))
}

/// Clean an open ring (no repeated closing vertex), returning the kept vertices
///
/// The result may hold fewer than 3 vertices; callers decide what that means.
pub(crate) fn clean_ring(vertices: &[Coord<f64>], min_spacing: f64) -> Vec<Coord<f64>> {
    let mut size = vertices.len();
    if size == 0 {
        return Vec::new();
    }

    let mut ring = LinkedRing::new(size);
    let limit_squared = min_spacing * min_spacing;
    let close = |a: usize, b: usize| distance_squared(vertices[a], vertices[b]) <= limit_squared;

    let mut op = 0;
    while !ring.accepted[op] && ring.next[op] != ring.prev[op] {
        let prev = ring.prev[op];
        let next = ring.next[op];

        if close(op, prev) {
            op = ring.exclude(op);
            size -= 1;
        } else if close(prev, next) {
            ring.exclude(next);
            op = ring.exclude(op);
            size -= 2;
        } else if near_collinear(vertices[prev], vertices[op], vertices[next], limit_squared) {
            op = ring.exclude(op);
            size -= 1;
        } else {
            ring.accepted[op] = true;
            op = next;
        }
    }

    let mut kept = Vec::with_capacity(size);
    for _ in 0..size {
        kept.push(vertices[op]);
        op = ring.next[op];
    }
    kept
}

/// Circular doubly-linked list over vertex indices
struct LinkedRing {
    prev: Vec<usize>,
    next: Vec<usize>,
    accepted: Vec<bool>,
}

impl LinkedRing {
    fn new(size: usize) -> Self {
        Self {
            prev: (0..size).map(|i| (i + size - 1) % size).collect(),
            next: (0..size).map(|i| (i + 1) % size).collect(),
            accepted: vec![false; size],
        }
    }

    /// Unlink `op` and return its predecessor, which must be examined again
    fn exclude(&mut self, op: usize) -> usize {
        let prev = self.prev[op];
        let next = self.next[op];
        self.next[prev] = next;
        self.prev[next] = prev;
        self.accepted[prev] = false;
        prev
    }
}

#[inline]
fn distance_squared(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d = a - b;
    d.x * d.x + d.y * d.y
}

/// Squared distance from `point` to the infinite line through `a` and `b`
#[inline]
fn line_distance_squared(point: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dy = a.y - b.y;
    let dx = b.x - a.x;
    let c = dy * a.x + dx * a.y;
    let offset = dy * point.x + dx * point.y - c;
    offset * offset / (dy * dy + dx * dx)
}

/// Whether three points are within `limit_squared` of collinear
///
/// The test measures the distance of the point lying geometrically between the other
/// two (along the dominant axis) from the line through them, which also catches
/// spikes where the middle vertex doubles back.
fn near_collinear(p1: Coord<f64>, p2: Coord<f64>, p3: Coord<f64>, limit_squared: f64) -> bool {
    let between = |a: f64, b: f64, c: f64| (a > b) == (a < c);
    let (c1, c2, c3) = if (p1.x - p2.x).abs() > (p1.y - p2.y).abs() {
        (p1.x, p2.x, p3.x)
    } else {
        (p1.y, p2.y, p3.y)
    };

    if between(c1, c2, c3) {
        line_distance_squared(p1, p2, p3) < limit_squared
    } else if between(c2, c1, c3) {
        line_distance_squared(p2, p1, p3) < limit_squared
    } else {
        line_distance_squared(p3, p1, p2) < limit_squared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    #[test]
    fn test_clean_square_unchanged() {
        let square = coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let cleaned = clean_ring(&square, 1.0);
        assert_eq!(cleaned.len(), 4);
        for vertex in &square {
            assert!(cleaned.contains(vertex));
        }
    }

    #[test]
    fn test_close_vertices_removed() {
        let ring = coords(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.2, 0.1),
            (10.0, 10.0),
            (0.0, 10.0),
        ]);
        let cleaned = clean_ring(&ring, 1.0);
        assert_eq!(cleaned.len(), 4);
    }

    #[test]
    fn test_staircase_collapsed() {
        // Small steps along the bottom edge, each well within the spacing
        let ring = coords(&[
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 0.3),
            (40.0, 0.3),
            (40.0, 0.0),
            (60.0, 0.0),
            (60.0, 60.0),
            (0.0, 60.0),
        ]);
        let cleaned = clean_ring(&ring, 1.0);
        assert_eq!(cleaned.len(), 4);
        let polygon = BufferPolygon::from_exterior(cleaned);
        assert!((polygon.area() - 3600.0).abs() < 20.0);
    }

    #[test]
    fn test_zero_spacing_removes_only_duplicates() {
        let ring = coords(&[
            (0.0, 0.0),
            (5.0, 0.0),
            (5.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
        ]);
        let cleaned = clean_ring(&ring, 0.0);
        // The duplicate goes; the exactly collinear (5, 0) is kept at zero spacing
        assert_eq!(cleaned.len(), 4);
    }

    #[test]
    fn test_collapse_is_an_error() {
        let sliver = BufferPolygon::from_exterior(coords(&[(0.0, 0.0), (10.0, 0.0), (5.0, 0.5)]));
        let result = clean(&sliver, 2.0);
        assert!(matches!(
            result,
            Err(DataError::CollapsedPolygon { index: 1, .. })
        ));
    }

    #[test]
    fn test_clean_all_reports_index() {
        let good = BufferPolygon::from_exterior(coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]));
        let tiny = BufferPolygon::from_exterior(coords(&[(0.0, 0.0), (0.1, 0.0), (0.1, 0.1), (0.0, 0.1)]));
        let result = clean_all(&[good.clone(), tiny], 1.0);
        assert!(matches!(
            result,
            Err(DataError::CollapsedPolygon { index: 2, .. })
        ));

        let cleaned = clean_all(&[good], 1.0).unwrap();
        assert_eq!(cleaned[0].vertex_count(), 4);
    }

    #[test]
    fn test_collapsed_hole_is_dropped() {
        let exterior = LineString::from(vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let hole = LineString::from(vec![(50.0, 50.0), (50.2, 50.0), (50.2, 50.2), (50.0, 50.2)]);
        let polygon = BufferPolygon::new(Polygon::new(exterior, vec![hole]));
        let cleaned = clean(&polygon, 1.0).unwrap();
        assert!(cleaned.interiors().is_empty());
        assert_eq!(cleaned.vertex_count(), 4);
    }

    #[test]
    fn test_clean_never_adds_vertices() {
        let ring: Vec<Coord<f64>> = (0..360)
            .map(|deg| {
                let a = (deg as f64).to_radians();
                let r = 100.0 + if deg % 7 == 0 { 0.5 } else { 0.0 };
                Coord {
                    x: r * a.cos(),
                    y: r * a.sin(),
                }
            })
            .collect();
        let polygon = BufferPolygon::from_exterior(ring.clone());

        for spacing in [0.0, 0.5, 2.0, 10.0, 50.0] {
            assert!(clean_ring(&ring, spacing).len() <= ring.len());

            // Dense rings may erode away entirely at large spacings
            match clean(&polygon, spacing) {
                Ok(cleaned) => assert!(cleaned.vertex_count() <= polygon.vertex_count()),
                Err(err) => assert!(matches!(err, DataError::CollapsedPolygon { index: 1, .. })),
            }
        }
    }

    #[test]
    fn test_clean_keeps_long_edged_polygon() {
        // Corridor-like outline: long straight sides with a few short kinks
        let outline = BufferPolygon::from_exterior(coords(&[
            (0.0, 0.0),
            (500.0, 0.0),
            (500.5, 0.2),
            (1000.0, 0.0),
            (1000.0, 200.0),
            (1000.3, 200.0),
            (500.0, 200.0),
            (0.0, 200.0),
        ]));
        for spacing in [0.0, 1.0, 5.0] {
            let cleaned = clean(&outline, spacing).unwrap();
            assert!(cleaned.vertex_count() <= outline.vertex_count());
            assert!(cleaned.vertex_count() >= 4);
        }
        assert_eq!(clean(&outline, 5.0).unwrap().vertex_count(), 4);
    }

    #[test]
    fn test_near_collinear() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 5.0, y: 0.4 };
        let c = Coord { x: 10.0, y: 0.0 };
        assert!(near_collinear(a, b, c, 0.25));
        assert!(!near_collinear(a, b, c, 0.01));
    }
}
