use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use trail_buffer_lib::{BufferConfig, SolutionPolicy};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Trail Buffer - Generate allowed-area polygons around GPS hiking tracks
pub struct Settings {
    /// GPX/KML files buffered together, or directories processed as separate track sets
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Buffer distance in meters (half the corridor width)
    #[arg(long, default_value_t = 850.0)]
    pub buffer: f64,

    /// Minimum vertex spacing of the output polygons in meters
    #[arg(long, default_value_t = 150.0)]
    pub clean: f64,

    /// Simplify tracks with this tolerance in meters before buffering
    #[arg(long, conflicts_with = "auto_simplify")]
    pub simplify: Option<f64>,

    /// Simplify tracks with twice the clean distance before buffering
    #[arg(long)]
    pub auto_simplify: bool,

    /// 1-based indices of output polygons to discard, comma separated
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<usize>,

    /// What to do when the buffer does not produce exactly one polygon
    #[arg(long, value_enum, default_value_t = Policy::Warn)]
    pub policy: Policy,

    /// Output file (one track set) or directory (several track sets); stdout if omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Coordinates)]
    pub format: Format,

    /// Print the run report to stderr
    #[arg(long)]
    pub report: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    KeepAll,
    Warn,
    RequireSingle,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Newline-separated `lon,lat,0` triples
    Coordinates,
    /// Polygons and report as JSON
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Coordinates => "txt",
            Format::Json => "json",
        }
    }
}

impl From<Policy> for SolutionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::KeepAll => SolutionPolicy::KeepAll,
            Policy::Warn => SolutionPolicy::WarnIfMultiple,
            Policy::RequireSingle => SolutionPolicy::RequireSingle,
        }
    }
}

impl Settings {
    /// The pipeline configuration described by the arguments
    pub fn buffer_config(&self) -> BufferConfig {
        let config = BufferConfig::new(self.buffer, self.clean)
            .with_removed_solutions(self.remove.iter().copied())
            .with_policy(self.policy.into());
        match (self.simplify, self.auto_simplify) {
            (Some(tolerance), _) => config.with_simplify_tolerance(tolerance),
            (None, true) => config.with_auto_simplify(),
            (None, false) => config,
        }
    }
}
