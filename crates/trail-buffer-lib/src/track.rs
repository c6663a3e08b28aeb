//! Geographic track storage
//!
//! This module provides [`GeoPoint`], [`Track`] and [`TrackSet`]: the immutable
//! geographic input of a buffering run.

use crate::{DataError, Result};
use std::fmt;

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude in degrees
    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees
    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl From<gpx::Waypoint> for GeoPoint {
    fn from(waypoint: gpx::Waypoint) -> Self {
        let point = waypoint.point();
        GeoPoint::new(point.y(), point.x())
    }
}

/// Formats as `lon,lat,0`, the coordinate tuple order of KML
impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},0", self.lon, self.lat)
    }
}

/// One continuous GPS recording
///
/// Point order defines segment adjacency. A track is an open polyline; it is closed
/// only if the source data repeats the first point at the end.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    /// Name from the source file, if any
    name: Option<String>,
    points: Vec<GeoPoint>,
}

impl Track {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { name: None, points }
    }

    /// Build a track from `(latitude, longitude)` pairs
    pub fn from_lat_lon(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(lat, lon)| GeoPoint::new(lat, lon))
                .collect(),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The middle point by index (integer division), if any
    #[inline]
    pub fn middle_point(&self) -> Option<GeoPoint> {
        self.points.get(self.points.len() / 2).copied()
    }
}

/// Tracks buffered together in one operation
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSet {
    tracks: Vec<Track>,
}

impl TrackSet {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Total number of points across all tracks
    pub fn total_points(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// The point the scale factor is evaluated at: the middle point of the first track
    ///
    /// # Errors
    /// [`DataError::EmptyTrackSet`] without tracks, [`DataError::EmptyTrack`] if the
    /// first track has no points.
    pub fn reference_point(&self) -> Result<GeoPoint> {
        let first = self.tracks.first().ok_or(DataError::EmptyTrackSet)?;
        first
            .middle_point()
            .ok_or(DataError::EmptyTrack { index: 0 })
    }

    /// Check the preconditions of a buffering run
    pub fn validate(&self) -> Result<()> {
        self.reference_point().map(|_| ())
    }
}

impl FromIterator<Track> for TrackSet {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for TrackSet {
    type Item = Track;
    type IntoIter = std::vec::IntoIter<Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.into_iter()
    }
}
