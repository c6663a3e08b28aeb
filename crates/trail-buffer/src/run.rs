//! Command-line driver: gathers inputs, runs the pipeline and writes results

use crate::cli::{Format, Settings};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use trail_buffer_lib::{
    BufferReport, DataError, LabeledPolygon, Pipeline, PipelineOutput, TrackSet, process_many,
    source,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("No GPX or KML files found in {}", .0.display())]
    NoTrackFiles(PathBuf),

    #[error("{failed} of {total} track set(s) failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

/// A named group of input files buffered together
#[derive(Debug, Clone, PartialEq)]
pub struct InputGroup {
    pub label: String,
    pub files: Vec<PathBuf>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    label: &'a str,
    report: &'a BufferReport,
    polygons: &'a [LabeledPolygon],
    removed: &'a [LabeledPolygon],
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tracks".to_string())
}

/// Loose files form one group; each directory forms its own group.
pub fn collect_inputs(inputs: &[PathBuf]) -> CliResult<Vec<InputGroup>> {
    let mut loose = Vec::new();
    let mut groups = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let files = source::track_files_in_dir(input)?;
            if files.is_empty() {
                return Err(CliError::NoTrackFiles(input.clone()));
            }
            groups.push(InputGroup {
                label: file_label(input),
                files,
            });
        } else {
            loose.push(input.clone());
        }
    }

    if let Some(first) = loose.first() {
        groups.insert(
            0,
            InputGroup {
                label: file_label(first),
                files: loose,
            },
        );
    }
    Ok(groups)
}

/// Render one pipeline result in the requested format
pub fn render(label: &str, output: &PipelineOutput, format: Format) -> CliResult<String> {
    match format {
        Format::Coordinates => {
            let mut text = output.to_coordinates();
            text.push('\n');
            Ok(text)
        }
        Format::Json => {
            let json = JsonOutput {
                label,
                report: &output.report,
                polygons: &output.polygons,
                removed: &output.removed,
            };
            let mut text = serde_json::to_string_pretty(&json)?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// Output file name for one group when writing several groups into a directory
pub fn output_file_name(label: &str, buffer_distance: f64, format: Format) -> String {
    format!(
        "{}_{}_buff.{}",
        label,
        buffer_distance,
        format.extension()
    )
}

fn write_output(
    settings: &Settings,
    group: &InputGroup,
    text: &str,
    multiple: bool,
) -> CliResult<()> {
    match (&settings.output, multiple) {
        (Some(path), false) => {
            std::fs::write(path, text)?;
            tracing::info!("Wrote {}", path.display());
        }
        (Some(dir), true) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(output_file_name(
                &group.label,
                settings.buffer,
                settings.format,
            ));
            std::fs::write(&path, text)?;
            tracing::info!("Wrote {}", path.display());
        }
        (None, multiple) => {
            let mut stdout = std::io::stdout().lock();
            if multiple {
                writeln!(stdout, "# {}", group.label)?;
            }
            stdout.write_all(text.as_bytes())?;
        }
    }
    Ok(())
}

/// Run the whole command for parsed settings
pub fn run(settings: &Settings) -> CliResult<()> {
    let config = settings.buffer_config();
    config.validate()?;

    let groups = collect_inputs(&settings.inputs)?;
    let track_sets = groups
        .iter()
        .map(|group| source::read_track_set(&group.files))
        .collect::<trail_buffer_lib::Result<Vec<TrackSet>>>()?;

    let pipeline = Pipeline::new(config);
    let results = if track_sets.len() == 1 {
        track_sets
            .into_iter()
            .map(|set| pipeline.run(set))
            .collect::<Vec<_>>()
    } else {
        process_many(&pipeline, track_sets)
    };

    let multiple = groups.len() > 1;
    let total = results.len();
    let mut failed = 0;
    for (group, result) in groups.iter().zip(results) {
        match result {
            Ok(output) => {
                if settings.report {
                    eprintln!("{}", output.report);
                }
                let text = render(&group.label, &output, settings.format)?;
                write_output(settings, group, &text, multiple)?;
            }
            Err(err) => {
                tracing::error!("{}: {}", group.label, err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::PartialFailure { failed, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use trail_buffer_lib::{BufferConfig, Track};

    const SAMPLE_KML: &str = r#"<kml><Document><Placemark><LineString>
<coordinates>37.0,55.0,0 37.01,55.0,0 37.01,55.01,0</coordinates>
</LineString></Placemark></Document></kml>"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "trail-buffer-cli-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_output() -> PipelineOutput {
        let set = TrackSet::new(vec![Track::from_lat_lon(&[
            (55.0, 37.0),
            (55.0, 37.01),
            (55.01, 37.01),
        ])]);
        Pipeline::new(BufferConfig::new(300.0, 50.0)).run(set).unwrap()
    }

    #[test]
    fn test_collect_inputs_groups() {
        let dir = scratch_dir("collect");
        let sub = dir.join("ridge");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("day1.kml"), SAMPLE_KML).unwrap();
        std::fs::write(sub.join("ridge_850_buff.kml"), SAMPLE_KML).unwrap();
        let loose = dir.join("valley.kml");
        std::fs::write(&loose, SAMPLE_KML).unwrap();

        let groups = collect_inputs(&[sub.clone(), loose.clone()]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "valley");
        assert_eq!(groups[0].files, vec![loose]);
        assert_eq!(groups[1].label, "ridge");
        assert_eq!(groups[1].files, vec![sub.join("day1.kml")]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = scratch_dir("empty");
        assert!(matches!(
            collect_inputs(std::slice::from_ref(&dir)),
            Err(CliError::NoTrackFiles(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_render_coordinates() {
        let output = sample_output();
        let text = render("trail", &output, Format::Coordinates).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), output.polygons[0].point_count());
        assert!(lines.iter().all(|l| l.ends_with(",0")));
        assert_eq!(lines.first(), lines.last());
    }

    #[test]
    fn test_render_json() {
        let output = sample_output();
        let text = render("trail", &output, Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["label"], "trail");
        assert_eq!(value["polygons"].as_array().unwrap().len(), 1);
        assert_eq!(value["report"]["buffer_distance"], 300.0);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("ridge", 850.0, Format::Coordinates),
            "ridge_850_buff.txt"
        );
        assert_eq!(
            output_file_name("ridge", 425.5, Format::Json),
            "ridge_425.5_buff.json"
        );
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = scratch_dir("run");
        let input = dir.join("trail.kml");
        std::fs::write(&input, SAMPLE_KML).unwrap();
        let output = dir.join("out.txt");

        let args: Vec<std::ffi::OsString> = vec![
            "trail-buffer".into(),
            "--buffer".into(),
            "300".into(),
            "--clean".into(),
            "50".into(),
            "--output".into(),
            output.clone().into(),
            input.clone().into(),
        ];
        let settings = Settings::try_parse_from(args).unwrap();
        run(&settings).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.lines().count() >= 4);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let settings =
            Settings::try_parse_from(["trail-buffer", "--buffer=-5", "missing.kml"]).unwrap();
        assert!(matches!(
            run(&settings),
            Err(CliError::Data(DataError::InvalidDistance { .. }))
        ));
    }
}
