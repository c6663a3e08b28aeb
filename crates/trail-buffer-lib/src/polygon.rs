//! Buffer polygons in planar and geographic form

use crate::{GeoPoint, Mercator, Result, segment_distance};
use geo::{Area, BoundingRect, Contains, Coord, LineString, Polygon, Rect};

/// One connected component of a buffer, in planar coordinates
///
/// The exterior ring is the outer boundary of the allowed area. Interior rings are
/// holes, which appear when a trail forms a loop wider than twice the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferPolygon {
    polygon: Polygon<f64>,
}

impl BufferPolygon {
    pub fn new(polygon: Polygon<f64>) -> Self {
        Self { polygon }
    }

    /// Build a polygon without holes from its exterior vertices (closing is implicit)
    pub fn from_exterior(vertices: Vec<Coord<f64>>) -> Self {
        Self::new(Polygon::new(LineString::new(vertices), Vec::new()))
    }

    #[inline]
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    #[inline]
    pub fn into_polygon(self) -> Polygon<f64> {
        self.polygon
    }

    #[inline]
    pub fn exterior(&self) -> &LineString<f64> {
        self.polygon.exterior()
    }

    #[inline]
    pub fn interiors(&self) -> &[LineString<f64>] {
        self.polygon.interiors()
    }

    /// Number of distinct vertices across all rings (closing points excluded)
    pub fn vertex_count(&self) -> usize {
        std::iter::once(self.exterior())
            .chain(self.interiors())
            .map(|ring| ring_vertices(ring).len())
            .sum()
    }

    /// Area enclosed by the exterior minus the holes
    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    /// Whether the point lies strictly inside the polygon
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        self.polygon.contains(&coord)
    }

    /// Distance from a point to the nearest edge of any ring
    pub fn boundary_distance(&self, coord: Coord<f64>) -> f64 {
        std::iter::once(self.exterior())
            .chain(self.interiors())
            .flat_map(|ring| ring.lines())
            .map(|line| segment_distance(coord, line.start, line.end))
            .fold(f64::INFINITY, f64::min)
    }
}

/// The vertices of a ring without the repeated closing point
pub(crate) fn ring_vertices(ring: &LineString<f64>) -> &[Coord<f64>] {
    let coords = ring.0.as_slice();
    match coords {
        [first, .., last] if first == last => &coords[..coords.len() - 1],
        _ => coords,
    }
}

/// A buffer polygon in geographic coordinates, tagged with its 1-based solution index
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabeledPolygon {
    index: usize,
    /// Closed exterior ring (first point repeated at the end)
    exterior: Vec<GeoPoint>,
    holes: Vec<Vec<GeoPoint>>,
}

impl LabeledPolygon {
    /// Unproject a planar polygon and attach its label
    pub fn from_planar(index: usize, polygon: &BufferPolygon, projection: &Mercator) -> Result<Self> {
        let exterior = projection.unproject(&polygon.exterior().0)?;
        let holes = polygon
            .interiors()
            .iter()
            .map(|ring| projection.unproject(&ring.0))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            index,
            exterior,
            holes,
        })
    }

    /// 1-based position of this polygon in the buffer output
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn exterior(&self) -> &[GeoPoint] {
        &self.exterior
    }

    #[inline]
    pub fn holes(&self) -> &[Vec<GeoPoint>] {
        &self.holes
    }

    /// Number of points written by [`LabeledPolygon::to_coordinates`]
    pub fn point_count(&self) -> usize {
        self.exterior.len()
    }

    /// Bounding box as `(min_lat, min_lon, max_lat, max_lon)`
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.exterior.first()?;
        Some(self.exterior.iter().fold(
            (first.lat(), first.lon(), first.lat(), first.lon()),
            |(min_lat, min_lon, max_lat, max_lon), p| {
                (
                    min_lat.min(p.lat()),
                    min_lon.min(p.lon()),
                    max_lat.max(p.lat()),
                    max_lon.max(p.lon()),
                )
            },
        ))
    }

    /// The exterior ring as newline-separated `lon,lat,0` triples
    pub fn to_coordinates(&self) -> String {
        self.exterior
            .iter()
            .map(GeoPoint::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Concatenated hand-off text of several polygons, in order
pub fn polygons_to_coordinates(polygons: &[LabeledPolygon]) -> String {
    polygons
        .iter()
        .filter(|polygon| !polygon.exterior.is_empty())
        .map(LabeledPolygon::to_coordinates)
        .collect::<Vec<_>>()
        .join("\n")
}
