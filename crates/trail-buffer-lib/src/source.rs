//! Reading track sets from GPX and KML files
//!
//! Every GPX track segment and every KML `<coordinates>` block becomes one
//! [`Track`], named after the file it came from.

use crate::{DataError, GeoPoint, Result, Track, TrackSet};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Suffix of files written by previous buffering runs
pub const BUFFER_OUTPUT_SUFFIX: &str = "_buff.kml";

const COORDINATES_OPEN: &str = "<coordinates>";
const COORDINATES_CLOSE: &str = "</coordinates>";

/// Read the track segments of a GPX document
pub fn read_gpx<R: Read>(reader: R, name: &str) -> Result<Vec<Track>> {
    let gpx = gpx::read(reader)?;

    let mut tracks = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            if segment.points.is_empty() {
                tracing::warn!("Skipping empty track segment in {}", name);
                continue;
            }
            let points = segment.points.into_iter().map(GeoPoint::from).collect();
            tracks.push(Track::new(points).with_name(name));
        }
    }
    Ok(tracks)
}

/// Extract every `<coordinates>` block of a KML document
///
/// Tuples are `lon,lat[,alt]` separated by whitespace; the altitude is ignored.
pub fn parse_kml(text: &str, name: &str) -> Result<Vec<Track>> {
    let mut tracks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(COORDINATES_OPEN) {
        let block = &rest[start + COORDINATES_OPEN.len()..];
        let end = block.find(COORDINATES_CLOSE).ok_or_else(|| {
            DataError::KmlParse(format!("unterminated {COORDINATES_OPEN} in {name}"))
        })?;

        let points = block[..end]
            .split_whitespace()
            .map(parse_kml_tuple)
            .collect::<Result<Vec<_>>>()?;
        if points.is_empty() {
            tracing::warn!("Skipping empty coordinates block in {}", name);
        } else {
            tracks.push(Track::new(points).with_name(name));
        }

        rest = &block[end + COORDINATES_CLOSE.len()..];
    }
    Ok(tracks)
}

fn parse_kml_tuple(tuple: &str) -> Result<GeoPoint> {
    let mut parts = tuple.split(',').map(str::parse::<f64>);
    match (parts.next(), parts.next()) {
        (Some(Ok(lon)), Some(Ok(lat))) => Ok(GeoPoint::new(lat, lon)),
        _ => Err(DataError::KmlParse(format!(
            "invalid coordinate tuple '{tuple}'"
        ))),
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Read all tracks of one GPX or KML file
pub fn read_track_file(path: &Path) -> Result<Vec<Track>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let tracks = if has_extension(path, "gpx") {
        let file = std::fs::File::open(path)?;
        read_gpx(std::io::BufReader::new(file), &name)?
    } else if has_extension(path, "kml") {
        parse_kml(&std::fs::read_to_string(path)?, &name)?
    } else {
        return Err(DataError::UnsupportedFormat(path.to_path_buf()));
    };

    tracing::debug!("Read {} track(s) from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Read several files into one track set, in the given order
pub fn read_track_set<P: AsRef<Path>>(paths: &[P]) -> Result<TrackSet> {
    let mut set = TrackSet::default();
    for path in paths {
        for track in read_track_file(path.as_ref())? {
            set.push(track);
        }
    }
    tracing::info!(
        "Total coordinate pairs: {} in {} track(s)",
        set.total_points(),
        set.len()
    );
    Ok(set)
}

/// GPX and KML files in a directory, sorted by name, excluding previous outputs
pub fn track_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !(has_extension(&path, "gpx") || has_extension(&path, "kml")) {
            continue;
        }
        let is_output = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(BUFFER_OUTPUT_SUFFIX));
        if !is_output {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
