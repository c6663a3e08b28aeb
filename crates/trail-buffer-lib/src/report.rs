//! Summary of a buffering run

use std::fmt;

/// Statistics and corridor widths of one pipeline run
///
/// The allowed corridor is nominally twice the buffer distance wide. Cleaning may
/// move the boundary by up to the clean distance on either side, which bounds the
/// narrowest and widest possible corridor.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferReport {
    /// Full-precision scale factor at the reference point
    pub scale_factor: f64,
    /// Buffer distance in meters
    pub buffer_distance: f64,
    /// Clean distance in meters
    pub clean_distance: f64,
    /// Simplification tolerance in meters, if simplification ran
    pub simplify_tolerance: Option<f64>,
    /// Number of input tracks
    pub track_count: usize,
    /// Number of input points across all tracks
    pub input_points: usize,
    /// Number of points buffered (after simplification)
    pub buffered_points: usize,
    /// Number of polygons produced by the buffer
    pub solutions: usize,
    /// Number of polygons discarded by index
    pub removed_solutions: usize,
    /// Vertices across all polygons before cleaning
    pub vertices_before_clean: usize,
    /// Vertices across all polygons after cleaning
    pub vertices_after_clean: usize,
    /// Points in the hand-off text of the kept polygons
    pub total_points: usize,
}

impl BufferReport {
    /// Nominal corridor width in meters
    pub fn base_width(&self) -> f64 {
        self.buffer_distance * 2.0
    }

    pub fn narrowest_width(&self) -> f64 {
        self.base_width() - 2.0 * self.clean_distance
    }

    pub fn widest_width(&self) -> f64 {
        self.base_width() + 2.0 * self.clean_distance
    }
}

impl fmt::Display for BufferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base_width();
        writeln!(f, "Scale factor: {:.3}", self.scale_factor)?;
        writeln!(
            f,
            "Buffer base distance: {}*2={} m",
            self.buffer_distance, base
        )?;
        writeln!(f, "Buffer clean distance: {} m", self.clean_distance)?;
        if let Some(tolerance) = self.simplify_tolerance {
            writeln!(f, "Track simplification tolerance: {} m", tolerance)?;
        }
        writeln!(
            f,
            "Narrowest possible buffer: {}-2*{}={} m",
            base,
            self.clean_distance,
            self.narrowest_width()
        )?;
        writeln!(
            f,
            "Widest possible buffer: {}+2*{}={} m",
            base,
            self.clean_distance,
            self.widest_width()
        )?;
        writeln!(
            f,
            "Tracks: {} ({} points, {} buffered)",
            self.track_count, self.input_points, self.buffered_points
        )?;
        writeln!(
            f,
            "Solutions: {} ({} removed)",
            self.solutions, self.removed_solutions
        )?;
        writeln!(
            f,
            "Vertices: {} before cleaning, {} after",
            self.vertices_before_clean, self.vertices_after_clean
        )?;
        write!(f, "Total points: {}", self.total_points)
    }
}
