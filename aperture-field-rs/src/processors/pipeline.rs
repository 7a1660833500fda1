//! End-to-end aperture field pipeline.
//!
//! `build_aperture_field` runs the in-memory stages (transform, contact,
//! clip, grid, inlet) on a loaded sample set. `process_aperture_file` wraps
//! it with loading, rendering and the optional grid export.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig, RunContext};
use crate::core::loaders::{load_samples, LoaderError, SampleSet};
use crate::core::writers::{ensure_parent_dirs, write_grid_txt, OutputPaths, WriteError};
use crate::visualization::{self, VisualizationError};

use super::clipping::clip_apertures;
use super::contact::{classify_contact, ContactSummary};
use super::grid::{build_grid, check_sample_count, ApertureGrid, GridError};
use super::inlet::{apply_inlet_override, locate_inlet, InletBounds, InletSummary};
use super::stats::{Checkpoint, StatsReporter, StatsSnapshot};
use super::transform::{exp_normalize, TransformError};

/// Errors that terminate a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load samples: {0}")]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("failed to render: {0}")]
    Render(#[from] VisualizationError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// In-memory result of the processing stages.
#[derive(Debug, Clone)]
pub struct ApertureField {
    /// Grid after the inlet override.
    pub grid: ApertureGrid,
    /// Clipped apertures of every sample, before the inlet override.
    pub clipped: Vec<f64>,
    pub contact: ContactSummary,
    pub inlet_bounds: InletBounds,
    pub inlet: InletSummary,
}

/// Files written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub field_map: PathBuf,
    pub histogram: Option<PathBuf>,
    pub grid_export: Option<PathBuf>,
}

/// Run the processing stages on `samples`.
///
/// Statistics are handed to `reporter` at each checkpoint; the stages
/// themselves never print.
pub fn build_aperture_field(
    samples: &SampleSet,
    config: &PipelineConfig,
    reporter: &mut dyn StatsReporter,
) -> Result<ApertureField> {
    check_sample_count(samples.len())?;
    let aperture_cfg = &config.aperture;

    let mut apertures = exp_normalize(&samples.aperture, aperture_cfg.normalization_scale)?;
    reporter.snapshot(
        Checkpoint::Transformed,
        &StatsSnapshot::of(&apertures).with_coordinates(&samples.x, &samples.y),
    );

    let contact = classify_contact(&apertures, aperture_cfg.contact_fraction).ok_or(
        GridError::InsufficientData {
            count: 0,
            required: super::grid::MIN_SAMPLES,
        },
    )?;
    reporter.contact(&contact);
    reporter.snapshot(Checkpoint::PreClip, &StatsSnapshot::of(&apertures));
    reporter.contact_threshold(contact.threshold);

    clip_apertures(
        &mut apertures,
        aperture_cfg.contact_offset_minimum,
        aperture_cfg.max_aperture,
    );
    reporter.snapshot(Checkpoint::PostClip, &StatsSnapshot::of(&apertures));

    let mut grid = build_grid(&apertures, &samples.x, &samples.y)?;

    // Axes of a built grid have at least two entries, so the lookup succeeds.
    let inlet_bounds = locate_inlet(
        grid.reservoir_x.view(),
        grid.reservoir_y.view(),
        config.inlet.radius,
    )
    .ok_or(GridError::InsufficientData {
        count: grid.side(),
        required: super::grid::MIN_SAMPLES,
    })?;
    log::debug!("inlet window {:?}", inlet_bounds);

    let inlet = apply_inlet_override(&mut grid, &inlet_bounds, &config.inlet, aperture_cfg.max_aperture);
    reporter.inlet(&inlet);

    Ok(ApertureField {
        grid,
        clipped: apertures,
        contact,
        inlet_bounds,
        inlet,
    })
}

/// Validate `config` and derive the artifact paths for `input`.
pub fn prepare_outputs(input: &Path, config: &PipelineConfig, ctx: &RunContext) -> Result<OutputPaths> {
    config.validate()?;

    OutputPaths::for_input(input, &config.output, &ctx.date_stamp()).ok_or_else(|| {
        PipelineError::Argument(format!("input path {} has no file name", input.display()))
    })
}

/// Render the figures and, if enabled, export the grid.
pub fn write_outputs(
    field: &ApertureField,
    paths: &OutputPaths,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let output_cfg = &config.output;
    let size = (output_cfg.width, output_cfg.height);

    let histogram = if output_cfg.save_histogram {
        ensure_parent_dirs(&paths.histogram)?;
        visualization::plot_aperture_histogram(
            &paths.histogram,
            &field.clipped,
            output_cfg.histogram_bins,
            output_cfg.histogram_range,
            size,
        )?;
        Some(paths.histogram.clone())
    } else {
        None
    };

    ensure_parent_dirs(&paths.field_map)?;
    visualization::plot_aperture_field(
        &paths.field_map,
        &field.grid,
        0.0,
        config.aperture.max_aperture,
        size,
    )?;

    let grid_export = if output_cfg.export_grid {
        write_grid_txt(&paths.grid_export, &field.grid)?;
        Some(paths.grid_export.clone())
    } else {
        None
    };

    Ok(PipelineOutput {
        field_map: paths.field_map.clone(),
        histogram,
        grid_export,
    })
}

/// Load `input`, build the aperture field and write every artifact.
///
/// Nothing is written unless loading and every processing stage succeed.
/// `reporter` sees the artifact paths first, then the statistics, then the
/// start and end of rendering.
pub fn process_aperture_file(
    input: &Path,
    config: &PipelineConfig,
    ctx: &RunContext,
    reporter: &mut dyn StatsReporter,
) -> Result<(ApertureField, PipelineOutput)> {
    let paths = prepare_outputs(input, config, ctx)?;
    reporter.outputs(&paths);

    let samples = load_samples(input)?;
    log::info!("loaded {} samples from {}", samples.len(), input.display());

    let field = build_aperture_field(&samples, config, reporter)?;

    reporter.rendering_started();
    let output = write_outputs(&field, &paths, config);
    reporter.rendering_finished();

    Ok((field, output?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::stats::NullReporter;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingReporter {
        events: Vec<&'static str>,
        snapshots: Vec<(Checkpoint, StatsSnapshot)>,
        contact: Option<ContactSummary>,
        threshold: Option<f64>,
        inlet: Option<InletSummary>,
    }

    impl StatsReporter for RecordingReporter {
        fn snapshot(&mut self, checkpoint: Checkpoint, stats: &StatsSnapshot) {
            self.events.push(match checkpoint {
                Checkpoint::Transformed => "transformed",
                Checkpoint::PreClip => "pre_clip",
                Checkpoint::PostClip => "post_clip",
            });
            self.snapshots.push((checkpoint, *stats));
        }

        fn outputs(&mut self, _paths: &OutputPaths) {
            self.events.push("outputs");
        }

        fn contact(&mut self, summary: &ContactSummary) {
            self.events.push("contact");
            self.contact = Some(*summary);
        }

        fn contact_threshold(&mut self, threshold: f64) {
            self.events.push("threshold");
            self.threshold = Some(threshold);
        }

        fn inlet(&mut self, summary: &InletSummary) {
            self.events.push("inlet");
            self.inlet = Some(*summary);
        }

        fn rendering_started(&mut self) {
            self.events.push("render_start");
        }

        fn rendering_finished(&mut self) {
            self.events.push("render_end");
        }
    }

    fn run_context() -> RunContext {
        RunContext::new(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap())
    }

    fn config_in(dir: &TempDir) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.output.folder = dir.path().join("out");
        config.output.width = 320;
        config.output.height = 256;
        config
    }

    fn write_input(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn four_point_samples() -> SampleSet {
        let mut samples = SampleSet::new();
        for (a, x, y) in [(0.0, 0.0, 0.0), (1.0, 1.0, 0.0), (0.0, 0.0, 1.0), (1.0, 1.0, 1.0)] {
            samples.push(crate::core::loaders::Sample { aperture: a, x, y });
        }
        samples
    }

    #[test]
    fn test_four_point_field() {
        let mut reporter = RecordingReporter::default();
        let field = build_aperture_field(&four_point_samples(), &PipelineConfig::default(), &mut reporter)
            .unwrap();

        // exp/normalize gives {1, e, 1, e} * 0.01 / e, all above max_aperture.
        let transformed = &reporter.snapshots[0].1;
        assert_eq!(reporter.snapshots[0].0, Checkpoint::Transformed);
        assert_relative_eq!(transformed.max, 0.01, max_relative = 1e-12);
        assert_relative_eq!(transformed.min, 0.01 / std::f64::consts::E, max_relative = 1e-12);
        assert_eq!(transformed.mean_xy, Some((0.5, 0.5)));

        assert_eq!(field.clipped, vec![0.001; 4]);
        assert_eq!(reporter.snapshots[2].0, Checkpoint::PostClip);
        assert_eq!(reporter.snapshots[2].1.max, 0.001);

        assert_eq!(field.grid.side(), 2);
        assert_eq!(field.inlet_bounds, InletBounds { ix0: 0, ix1: 1, iy0: 0, iy1: 1 });

        // Only cell (0, 0) is visited; it sits at the origin.
        assert_relative_eq!(field.grid.z[[0, 0]], 1.99 * 0.001, max_relative = 1e-12);
        assert_eq!(field.grid.z[[0, 1]], 0.001);
        assert_eq!(field.grid.z[[1, 0]], 0.001);
        assert_eq!(field.grid.z[[1, 1]], 0.001);

        let inlet = reporter.inlet.unwrap();
        assert_eq!(inlet.visited, 1);
        assert_eq!(inlet.forced_open, 1);
    }

    #[test]
    fn test_contact_threshold_is_diagnostic_only() {
        let mut samples = SampleSet::new();
        for i in 0..100 {
            let raw = -8.0 + i as f64 * 0.05;
            samples.push(crate::core::loaders::Sample {
                aperture: raw,
                x: (i % 10) as f64 * 10.0 + 10.0,
                y: (i / 10) as f64 * 10.0 + 10.0,
            });
        }

        let mut reporter = RecordingReporter::default();
        let field = build_aperture_field(&samples, &PipelineConfig::default(), &mut reporter).unwrap();

        let contact = reporter.contact.unwrap();
        assert_eq!(contact.total_points, 100);
        assert_eq!(contact.contact_points, 10);
        assert_eq!(contact, field.contact);

        // Clipping ignores the threshold: values below it survive unchanged.
        let transformed = exp_normalize(&samples.aperture, 0.01).unwrap();
        for (clipped, raw) in field.clipped.iter().zip(&transformed) {
            if *raw >= 4e-6 && *raw <= 0.001 {
                assert_eq!(clipped, raw);
            }
        }
        assert!(field.clipped.iter().any(|&v| v < contact.threshold));

        // The sample sits far from the origin, so the inlet window is empty.
        assert!(field.inlet_bounds.is_empty());
        assert_eq!(field.inlet.visited, 0);
    }

    #[test]
    fn test_bounding_invariant_after_clip() {
        let mut samples = SampleSet::new();
        for i in 0..49 {
            samples.push(crate::core::loaders::Sample {
                aperture: ((i * 37) % 23) as f64 * 0.4 - 5.0,
                x: (i % 7) as f64 - 3.0,
                y: (i / 7) as f64 - 3.0,
            });
        }
        let field = build_aperture_field(&samples, &PipelineConfig::default(), &mut NullReporter).unwrap();
        assert!(field.clipped.iter().all(|&v| (4e-6..=0.001).contains(&v)));
        assert_eq!(field.grid.side(), 7);
    }

    #[test]
    fn test_underflowing_samples_still_clip_into_range() {
        let mut samples = four_point_samples();
        samples.aperture = vec![-800.0; 4];

        let mut reporter = RecordingReporter::default();
        let field = build_aperture_field(&samples, &PipelineConfig::default(), &mut reporter).unwrap();

        assert_eq!(reporter.snapshots[0].1.max, 0.01);
        assert_eq!(field.clipped, vec![0.001; 4]);
        assert!(field.grid.apertures().all(|v| v.is_finite()));
    }

    #[test]
    fn test_statistics_are_reported_in_order() {
        let mut reporter = RecordingReporter::default();
        build_aperture_field(&four_point_samples(), &PipelineConfig::default(), &mut reporter).unwrap();

        assert_eq!(
            reporter.events,
            vec!["transformed", "contact", "pre_clip", "threshold", "post_clip", "inlet"]
        );
        assert_eq!(reporter.threshold, reporter.contact.map(|c| c.threshold));
    }

    #[test]
    fn test_too_few_samples() {
        let mut samples = four_point_samples();
        samples.aperture.pop();
        samples.x.pop();
        samples.y.pop();

        let result = build_aperture_field(&samples, &PipelineConfig::default(), &mut NullReporter);
        assert!(matches!(
            result,
            Err(PipelineError::Grid(GridError::InsufficientData { count: 3, .. }))
        ));
    }

    #[test]
    fn test_process_file_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "plate.txt",
            &["0.0 0.0 0.0", "1.0 1.0 0.0", "0.0 0.0 1.0", "1.0 1.0 1.0"],
        );
        let mut config = config_in(&dir);
        config.output.export_grid = true;

        let mut reporter = RecordingReporter::default();
        let (field, output) = process_aperture_file(&input, &config, &run_context(), &mut reporter).unwrap();

        assert_eq!(reporter.events.first(), Some(&"outputs"));
        assert_eq!(&reporter.events[reporter.events.len() - 2..], &["render_start", "render_end"]);

        let out = dir.path().join("out");
        assert_eq!(output.field_map, out.join("platenormal_20240517.png"));
        assert_eq!(output.histogram, Some(out.join("platenormal_20240517_histogram.png")));
        assert_eq!(output.grid_export, Some(out.join("platenormal_20240517.txt")));
        assert!(output.field_map.exists());
        assert!(out.join("platenormal_20240517_histogram.png").exists());

        let exported = load_samples(out.join("platenormal_20240517.txt")).unwrap();
        assert_eq!(exported.aperture, field.grid.apertures().collect::<Vec<_>>());
    }

    #[test]
    fn test_process_file_optional_artifacts_off() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "scan.dat", &["0.1 -1 -1", "0.2 1 -1", "0.3 -1 1", "0.4 1 1"]);
        let mut config = config_in(&dir);
        config.output.save_histogram = false;

        let (_, output) = process_aperture_file(&input, &config, &run_context(), &mut NullReporter).unwrap();

        assert_eq!(output.field_map, dir.path().join("out").join("scan.datnormal_20240517.png"));
        assert!(output.histogram.is_none());
        assert!(output.grid_export.is_none());
        assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }

    #[test]
    fn test_malformed_row_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "bad.txt", &["0.0 0.0 0.0", "abc 1.0 2.0", "0.0 0.0 1.0", "1.0 1.0 1.0"]);
        let config = config_in(&dir);

        let mut reporter = RecordingReporter::default();
        let result = process_aperture_file(&input, &config, &run_context(), &mut reporter);

        assert!(matches!(
            result,
            Err(PipelineError::Load(LoaderError::ParseError { line: 2, .. }))
        ));
        assert!(reporter.snapshots.is_empty());
        assert_eq!(reporter.events, vec!["outputs"]);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_empty_file_is_insufficient_data() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "empty.txt", &[]);
        let config = config_in(&dir);

        let result = process_aperture_file(&input, &config, &run_context(), &mut NullReporter);
        assert!(matches!(
            result,
            Err(PipelineError::Grid(GridError::InsufficientData { count: 0, .. }))
        ));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let result = process_aperture_file(
            &dir.path().join("absent.txt"),
            &config,
            &run_context(),
            &mut NullReporter,
        );
        assert!(matches!(result, Err(PipelineError::Load(LoaderError::Io(_)))));
    }

    #[test]
    fn test_input_without_file_name_is_argument_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let result = process_aperture_file(Path::new("/"), &config, &run_context(), &mut NullReporter);
        assert!(matches!(result, Err(PipelineError::Argument(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_loading() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.aperture.contact_fraction = -0.5;
        let result = process_aperture_file(
            &dir.path().join("absent.txt"),
            &config,
            &run_context(),
            &mut NullReporter,
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
