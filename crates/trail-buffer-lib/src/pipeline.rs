//! Pipeline - Top-level orchestration of one buffering run
//!
//! This module wires the stages together: scale factor → projection → optional
//! simplification → buffer → clean → inverse projection → labelling.

use crate::{
    BufferPolygon, BufferReport, DataError, LabeledPolygon, Mercator, Result, ScaleFactor, Track,
    TrackSet, buffer, clean_all, polygons_to_coordinates, simplify_tracks,
};

use geo::LineString;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What to do when the buffer does not produce exactly one polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolutionPolicy {
    /// Keep every polygon silently
    KeepAll,
    /// Keep every polygon, but log a warning
    #[default]
    WarnIfMultiple,
    /// Fail the run unless exactly one polygon remains after removals
    RequireSingle,
}

/// Configuration of a buffering run
///
/// All distances are real-world meters. They are converted to projected units with
/// the scale factor of each track set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferConfig {
    /// Buffer radius; the allowed corridor is twice as wide. Must be > 0.
    pub buffer_distance: f64,
    /// Minimum vertex spacing of the output polygons. Must be >= 0 and should be
    /// much smaller than the buffer distance.
    pub clean_distance: f64,
    /// Maximum deviation when pre-simplifying tracks. `None` disables simplification.
    pub simplify_tolerance: Option<f64>,
    /// 1-based indices of output polygons to discard (known spurious solutions)
    pub remove_solution_indices: BTreeSet<usize>,
    /// Handling of a solution count other than one
    pub solution_policy: SolutionPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_distance: 850.0,
            clean_distance: 150.0,
            simplify_tolerance: None,
            remove_solution_indices: BTreeSet::new(),
            solution_policy: SolutionPolicy::default(),
        }
    }
}

impl BufferConfig {
    pub fn new(buffer_distance: f64, clean_distance: f64) -> Self {
        Self {
            buffer_distance,
            clean_distance,
            ..Default::default()
        }
    }

    pub fn with_simplify_tolerance(mut self, tolerance: f64) -> Self {
        self.simplify_tolerance = Some(tolerance);
        self
    }

    /// Simplify with twice the clean distance, so simplification and cleaning
    /// produce vertices of comparable spacing
    pub fn with_auto_simplify(mut self) -> Self {
        self.simplify_tolerance = Some(self.clean_distance * 2.0);
        self
    }

    pub fn with_removed_solutions(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.remove_solution_indices.extend(indices);
        self
    }

    pub fn with_policy(mut self, policy: SolutionPolicy) -> Self {
        self.solution_policy = policy;
        self
    }

    /// Check the distance preconditions
    pub fn validate(&self) -> Result<()> {
        if !self.buffer_distance.is_finite() || self.buffer_distance <= 0.0 {
            return Err(DataError::InvalidDistance {
                name: "buffer distance",
                value: self.buffer_distance,
                requirement: "> 0",
            });
        }
        if !self.clean_distance.is_finite() || self.clean_distance < 0.0 {
            return Err(DataError::InvalidDistance {
                name: "clean distance",
                value: self.clean_distance,
                requirement: ">= 0",
            });
        }
        if let Some(tolerance) = self.simplify_tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(DataError::InvalidDistance {
                    name: "simplify tolerance",
                    value: tolerance,
                    requirement: ">= 0",
                });
            }
        }
        if self.clean_distance >= self.buffer_distance {
            tracing::warn!(
                "Clean distance {} m is not smaller than buffer distance {} m",
                self.clean_distance,
                self.buffer_distance
            );
        }
        Ok(())
    }
}

/// Everything a run hands to reporting and serialization
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineOutput {
    /// Kept polygons in geographic coordinates, in solution order
    pub polygons: Vec<LabeledPolygon>,
    /// Polygons discarded through `remove_solution_indices`
    pub removed: Vec<LabeledPolygon>,
    /// The original tracks
    pub tracks: TrackSet,
    /// The tracks that were buffered, when simplification ran
    pub simplified_tracks: Option<TrackSet>,
    pub scale_factor: ScaleFactor,
    pub report: BufferReport,
}

impl PipelineOutput {
    /// Number of polygons the buffer produced, including removed ones
    pub fn solution_count(&self) -> usize {
        self.polygons.len() + self.removed.len()
    }

    /// Hand-off text of all kept polygons
    pub fn to_coordinates(&self) -> String {
        polygons_to_coordinates(&self.polygons)
    }
}

/// Runs the buffering stages for track sets
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: BufferConfig,
    projection: Mercator,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Pipeline {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            projection: Mercator::wgs84(),
        }
    }

    #[inline]
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    #[inline]
    pub fn projection(&self) -> &Mercator {
        &self.projection
    }

    /// Buffer one track set
    ///
    /// # Errors
    /// - [`DataError::EmptyTrackSet`] / [`DataError::EmptyTrack`] before anything is projected
    /// - [`DataError::InvalidDistance`] for invalid configuration
    /// - [`DataError::CoordinateConversion`] for points outside the projection domain
    /// - [`DataError::CollapsedPolygon`] if cleaning destroys a polygon
    /// - [`DataError::UnexpectedSolutionCount`] under [`SolutionPolicy::RequireSingle`]
    pub fn run(&self, tracks: TrackSet) -> Result<PipelineOutput> {
        #[cfg(feature = "profiling")]
        profiling::scope!("pipeline::run");

        tracks.validate()?;
        self.config.validate()?;

        // Computed once, from geographic coordinates, before any distance is converted
        let scale = self.projection.scale_factor_for(&tracks)?;
        let buffer_distance = scale.to_planar(self.config.buffer_distance);
        let clean_distance = scale.to_planar(self.config.clean_distance);
        let simplify_tolerance = self.config.simplify_tolerance.map(|t| scale.to_planar(t));
        tracing::info!(
            "Buffer of {} meters is approximately {:.3} units in Mercator",
            self.config.buffer_distance,
            buffer_distance
        );
        tracing::debug!(
            "Clean distance of {} meters is approximately {:.3} units in Mercator",
            self.config.clean_distance,
            clean_distance
        );

        let planar = tracks
            .tracks()
            .iter()
            .map(|track| self.projection.project_line(track.points()))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Projected {} coordinates", tracks.total_points());

        let (planar, simplified_tracks) = match simplify_tolerance {
            Some(tolerance) => {
                let simplified = simplify_tracks(&planar, tolerance);
                let geographic = self.unproject_tracks(&tracks, &simplified)?;
                (simplified, Some(geographic))
            }
            None => (planar, None),
        };
        let buffered_points = planar.iter().map(|line| line.0.len()).sum();

        let solutions = buffer(&planar, buffer_distance)?;
        if solutions.len() > 1 {
            tracing::info!("Buffer produced {} disjoint solutions", solutions.len());
        }
        let vertices_before_clean = count_vertices(&solutions);

        let cleaned = clean_all(&solutions, clean_distance)?;
        let vertices_after_clean = count_vertices(&cleaned);
        tracing::debug!(
            "Solution vertices: {} not cleaned, {} cleaned",
            vertices_before_clean,
            vertices_after_clean
        );

        let labeled = cleaned
            .iter()
            .enumerate()
            .map(|(i, polygon)| LabeledPolygon::from_planar(i + 1, polygon, &self.projection))
            .collect::<Result<Vec<_>>>()?;
        let (polygons, removed) = self.select_solutions(labeled)?;
        for polygon in &polygons {
            if let Some((min_lat, min_lon, max_lat, max_lon)) = polygon.bounds() {
                tracing::debug!(
                    "Solution #{} spans lat {:.5}..{:.5}, lon {:.5}..{:.5}",
                    polygon.index(),
                    min_lat,
                    max_lat,
                    min_lon,
                    max_lon
                );
            }
        }

        let report = BufferReport {
            scale_factor: scale.value(),
            buffer_distance: self.config.buffer_distance,
            clean_distance: self.config.clean_distance,
            simplify_tolerance: self.config.simplify_tolerance,
            track_count: tracks.len(),
            input_points: tracks.total_points(),
            buffered_points,
            solutions: cleaned.len(),
            removed_solutions: removed.len(),
            vertices_before_clean,
            vertices_after_clean,
            total_points: polygons.iter().map(LabeledPolygon::point_count).sum(),
        };

        Ok(PipelineOutput {
            polygons,
            removed,
            tracks,
            simplified_tracks,
            scale_factor: scale,
            report,
        })
    }

    /// Split labelled solutions into kept and removed, then apply the count policy
    fn select_solutions(
        &self,
        labeled: Vec<LabeledPolygon>,
    ) -> Result<(Vec<LabeledPolygon>, Vec<LabeledPolygon>)> {
        let count = labeled.len();
        for &index in &self.config.remove_solution_indices {
            if index == 0 || index > count {
                tracing::warn!(
                    "Cannot remove solution #{}: only {} solution(s) produced",
                    index,
                    count
                );
            }
        }

        let (removed, kept): (Vec<_>, Vec<_>) = labeled
            .into_iter()
            .partition(|polygon| self.config.remove_solution_indices.contains(&polygon.index()));

        match self.config.solution_policy {
            SolutionPolicy::KeepAll => {}
            SolutionPolicy::WarnIfMultiple => {
                if kept.len() != 1 {
                    tracing::warn!("Expected one buffer solution, keeping {}", kept.len());
                }
            }
            SolutionPolicy::RequireSingle => {
                if kept.len() != 1 {
                    return Err(DataError::UnexpectedSolutionCount {
                        expected: 1,
                        found: kept.len(),
                    });
                }
            }
        }

        Ok((kept, removed))
    }

    /// Convert simplified planar tracks back to named geographic tracks
    fn unproject_tracks(&self, original: &TrackSet, planar: &[LineString<f64>]) -> Result<TrackSet> {
        original
            .tracks()
            .iter()
            .zip(planar)
            .map(|(track, line)| {
                let simplified = Track::new(self.projection.unproject(&line.0)?);
                Ok(match track.name() {
                    Some(name) => simplified.with_name(name),
                    None => simplified,
                })
            })
            .collect()
    }
}

fn count_vertices(polygons: &[BufferPolygon]) -> usize {
    polygons.iter().map(BufferPolygon::vertex_count).sum()
}

/// Buffer several independent track sets in parallel
///
/// Each set gets its own result, so one malformed set does not abort the others.
pub fn process_many(pipeline: &Pipeline, track_sets: Vec<TrackSet>) -> Vec<Result<PipelineOutput>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("pipeline::process_many");

    track_sets
        .into_par_iter()
        .map(|tracks| pipeline.run(tracks))
        .collect()
}
