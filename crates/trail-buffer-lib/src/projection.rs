//! Projection between WGS84 geographic coordinates and planar Mercator meters
//!
//! Buffering happens in a conformal planar space so that offset distances are the
//! same in every direction. Mercator stretches lengths by `sec(latitude)`, so a
//! distance in real-world meters is converted to planar units with the
//! [`ScaleFactor`] evaluated at a representative point of the tracks.

use crate::{DataError, GeoPoint, Result, TrackSet};
use geo::{Coord, LineString};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;

/// WGS84 semi-major axis in meters
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 inverse flattening
pub const WGS84_INVERSE_FLATTENING: f64 = 298.257_223_563;

/// Maximum latitude accepted by the projection (the Web Mercator limit)
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Convergence threshold of the inverse latitude iteration, in radians
const INVERSE_TOLERANCE: f64 = 1e-12;

/// Upper bound on inverse iterations; converges in ~5 for terrestrial latitudes
const INVERSE_MAX_ITERATIONS: usize = 32;

/// Mercator projection on an ellipsoid, central meridian at Greenwich
///
/// The adapter holds only the ellipsoid parameters. It is `Copy` and can be shared
/// freely between threads processing different track sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    /// Semi-major axis in meters
    semi_major_axis: f64,
    /// First eccentricity of the ellipsoid
    eccentricity: f64,
}

impl Default for Mercator {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Mercator {
    /// Mercator on the WGS84 ellipsoid
    pub fn wgs84() -> Self {
        let flattening = 1.0 / WGS84_INVERSE_FLATTENING;
        let eccentricity_squared = flattening * (2.0 - flattening);
        Self {
            semi_major_axis: WGS84_SEMI_MAJOR_AXIS,
            eccentricity: eccentricity_squared.sqrt(),
        }
    }

    /// Project a single geographic point to planar meters
    ///
    /// # Errors
    /// [`DataError::CoordinateConversion`] if the point is not finite, or lies outside
    /// the latitude range [`MAX_LATITUDE`] or the longitude range ±180°.
    #[inline]
    pub fn project_point(&self, point: GeoPoint) -> Result<Coord<f64>> {
        let (lat, lon) = (point.lat(), point.lon());
        if !lat.is_finite() || !lon.is_finite() {
            return Err(DataError::CoordinateConversion(format!(
                "non-finite coordinate ({lat}, {lon})"
            )));
        }
        if lat.abs() > MAX_LATITUDE || lon.abs() > 180.0 {
            return Err(DataError::CoordinateConversion(format!(
                "coordinate ({lat}, {lon}) outside the Mercator domain"
            )));
        }

        let phi = lat.to_radians();
        let e_sin = self.eccentricity * phi.sin();
        let conformal = ((1.0 - e_sin) / (1.0 + e_sin)).powf(self.eccentricity / 2.0);

        Ok(Coord {
            x: self.semi_major_axis * lon.to_radians(),
            y: self.semi_major_axis * ((FRAC_PI_4 + phi / 2.0).tan() * conformal).ln(),
        })
    }

    /// Convert a planar point back to geographic degrees
    ///
    /// The latitude is recovered by fixed-point iteration on the conformal latitude.
    #[inline]
    pub fn unproject_point(&self, coord: Coord<f64>) -> Result<GeoPoint> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(DataError::CoordinateConversion(format!(
                "non-finite planar coordinate ({}, {})",
                coord.x, coord.y
            )));
        }

        let t = (-coord.y / self.semi_major_axis).exp();
        let half_e = self.eccentricity / 2.0;

        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let e_sin = self.eccentricity * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - e_sin) / (1.0 + e_sin)).powf(half_e)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < INVERSE_TOLERANCE {
                break;
            }
        }

        let lon = (coord.x / self.semi_major_axis).to_degrees();
        Ok(GeoPoint::new(phi.to_degrees(), lon))
    }

    /// Project a sequence of geographic points
    pub fn project(&self, points: &[GeoPoint]) -> Result<Vec<Coord<f64>>> {
        points.iter().map(|p| self.project_point(*p)).collect()
    }

    /// Project a sequence of geographic points into a planar line string
    pub fn project_line(&self, points: &[GeoPoint]) -> Result<LineString<f64>> {
        Ok(LineString::new(self.project(points)?))
    }

    /// Inverse of [`Mercator::project`]
    pub fn unproject(&self, coords: &[Coord<f64>]) -> Result<Vec<GeoPoint>> {
        coords.iter().map(|c| self.unproject_point(*c)).collect()
    }

    /// Linear scale distortion of the projection at the reference point
    ///
    /// This is the meridional scale `sec(latitude)`; it does not depend on longitude.
    pub fn local_scale_factor(&self, reference: GeoPoint) -> ScaleFactor {
        ScaleFactor {
            value: 1.0 / reference.lat().to_radians().cos(),
            reference,
        }
    }

    /// Scale factor of a whole track set, evaluated at its reference point
    ///
    /// # Errors
    /// [`DataError::EmptyTrackSet`] or [`DataError::EmptyTrack`] if there is no first
    /// track or it has no points.
    pub fn scale_factor_for(&self, tracks: &TrackSet) -> Result<ScaleFactor> {
        let reference = tracks.reference_point()?;
        let scale = self.local_scale_factor(reference);
        tracing::info!(
            "Scale factor: {} defined at lat: {}, lon: {}",
            scale,
            reference.lat(),
            reference.lon()
        );
        Ok(scale)
    }
}

/// Conversion factor from real-world meters to projected units at one location
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleFactor {
    value: f64,
    reference: GeoPoint,
}

impl ScaleFactor {
    /// Full-precision factor
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Factor rounded to three decimals, for reporting only
    #[inline]
    pub fn rounded(&self) -> f64 {
        (self.value * 1000.0).round() / 1000.0
    }

    /// The point the factor was evaluated at
    #[inline]
    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    /// Convert a distance in meters into planar units
    #[inline]
    pub fn to_planar(&self, meters: f64) -> f64 {
        meters * self.value
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.value)
    }
}
