//! Command-line interface for the aperture field pipeline.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::RunContext;
use crate::core::writers::OutputPaths;
use crate::processors::contact::ContactSummary;
use crate::processors::inlet::InletSummary;
use crate::processors::pipeline::{process_aperture_file, ApertureField, PipelineOutput, Result};
use crate::processors::stats::{Checkpoint, ConsoleReporter, StatsReporter, StatsSnapshot};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "aperture-field")]
#[command(
    about = "Grid a point-cloud aperture measurement, open the inlet and plot the field",
    version
)]
pub struct Cli {
    /// Aperture file with one `aperture x y` sample per line
    input: PathBuf,

    /// Path to YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn load_config(cli: &Cli) -> PipelineConfig {
    match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    }
}

/// Console reporter that also spins while the figures render.
#[derive(Default)]
struct ProgressReporter {
    console: ConsoleReporter,
    spinner: Option<ProgressBar>,
}

impl StatsReporter for ProgressReporter {
    fn snapshot(&mut self, checkpoint: Checkpoint, stats: &StatsSnapshot) {
        self.console.snapshot(checkpoint, stats);
    }

    fn outputs(&mut self, paths: &OutputPaths) {
        self.console.outputs(paths);
    }

    fn contact(&mut self, summary: &ContactSummary) {
        self.console.contact(summary);
    }

    fn contact_threshold(&mut self, threshold: f64) {
        self.console.contact_threshold(threshold);
    }

    fn inlet(&mut self, summary: &InletSummary) {
        self.console.inlet(summary);
    }

    fn rendering_started(&mut self) {
        self.spinner = Some(create_spinner("Rendering aperture field..."));
    }

    fn rendering_finished(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Process the input named on the command line.
pub fn try_run(cli: &Cli, ctx: &RunContext) -> Result<(ApertureField, PipelineOutput)> {
    let config = load_config(cli);

    println!("Input file: {}", cli.input.display());

    let mut reporter = ProgressReporter::default();
    process_aperture_file(&cli.input, &config, ctx, &mut reporter)
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let start = Instant::now();

    match try_run(&cli, &RunContext::today()) {
        Ok((field, output)) => {
            let mut items = vec![
                ("Input file", cli.input.display().to_string()),
                ("Grid", format!("{0}x{0}", field.grid.side())),
                ("Dropped samples", field.grid.dropped_samples.to_string()),
                ("Inlet cells", field.inlet.visited.to_string()),
                ("Field map", output.field_map.display().to_string()),
            ];
            if let Some(path) = &output.histogram {
                items.push(("Histogram", path.display().to_string()));
            }
            if let Some(path) = &output.grid_export {
                items.push(("Grid export", path.display().to_string()));
            }
            items.push(("Duration", format!("{:.2?}", start.elapsed())));

            print_summary("Aperture Field Complete", &items);
        }
        Err(e) => {
            error!("Aperture field failed: {}", e);
            std::process::exit(1);
        }
    }
}
