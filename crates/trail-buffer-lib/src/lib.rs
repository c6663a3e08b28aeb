//! Trail Buffer Library - Allowed-Area Polygons Around GPS Tracks
//!
//! This library turns one or more GPS tracks into closed buffer polygons that
//! approximate the region within a fixed distance of the tracks. The result is
//! meant to be embedded back into a geographic data file as the "allowed area"
//! around a hiking trail.
//!
//! # Architecture
//!
//! - **[`Mercator`]**: Projection between WGS84 degrees and planar meters, plus the
//!   local scale factor used to convert real-world distances
//! - **[`simplify`]**: Ramer-Douglas-Peucker pre-simplification of planar tracks
//! - **[`buffer`]**: Offset polygons with miter joins and square caps, merged across tracks
//! - **[`clean`]**: Removal of near-duplicate and near-collinear vertices
//! - **[`Pipeline`]**: Sequences the stages above for one [`TrackSet`]
//!
//! # Data Flow
//!
//! geographic tracks → project → (simplify) → buffer → clean → unproject → labeled polygons

mod buffer;
mod clean;
mod pipeline;
mod polygon;
mod projection;
mod report;
mod simplify;
pub mod source;
mod track;

// Public API exports
pub use buffer::{MITER_LIMIT, buffer};
pub use clean::{clean, clean_all};
pub use pipeline::{BufferConfig, Pipeline, PipelineOutput, SolutionPolicy, process_many};
pub use polygon::{BufferPolygon, LabeledPolygon, polygons_to_coordinates};
pub use projection::{MAX_LATITUDE, Mercator, ScaleFactor};
pub use report::BufferReport;
pub use simplify::{segment_distance, simplify, simplify_indices, simplify_tracks};
pub use track::{GeoPoint, Track, TrackSet};

/// Error types for the buffering pipeline
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Track set contains no tracks")]
    EmptyTrackSet,

    #[error("Track #{index} contains no points")]
    EmptyTrack { index: usize },

    #[error("Invalid {name}: {value} (must be finite and {requirement})")]
    InvalidDistance {
        name: &'static str,
        value: f64,
        requirement: &'static str,
    },

    #[error("Coordinate conversion error: {0}")]
    CoordinateConversion(String),

    #[error("Polygon #{index} collapsed to {remaining} vertices while cleaning")]
    CollapsedPolygon { index: usize, remaining: usize },

    #[error("Expected {expected} buffer solution(s), found {found}")]
    UnexpectedSolutionCount { expected: usize, found: usize },

    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("KML parsing error: {0}")]
    KmlParse(String),

    #[error("Unsupported track file: {}", .0.display())]
    UnsupportedFormat(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;
