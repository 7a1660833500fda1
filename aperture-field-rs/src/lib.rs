//! Aperture field pipeline for rough-surface and fracture measurements.
//!
//! This crate provides tools for:
//! - Loading point-cloud aperture measurements (`aperture x y` per line)
//! - Exponential re-expression, contact diagnostics and clipping
//! - Rasterizing the samples into a square reservoir grid
//! - Opening up the injection inlet around the origin
//! - Rendering the aperture histogram and field map as PNG
//!
//! # Example
//!
//! ```no_run
//! use aperture_field::{process_aperture_file, ConsoleReporter, PipelineConfig, RunContext};
//!
//! let config = PipelineConfig::default();
//! let (field, output) = process_aperture_file(
//!     "fracture01.txt".as_ref(),
//!     &config,
//!     &RunContext::today(),
//!     &mut ConsoleReporter,
//! )
//! .unwrap();
//! println!("{}x{} grid -> {}", field.grid.side(), field.grid.side(), output.field_map.display());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{ApertureConfig, InletConfig, OutputConfig, PipelineConfig, RunContext};
pub use crate::core::loaders::{Sample, SampleSet};
pub use processors::pipeline::{build_aperture_field, process_aperture_file};
pub use processors::stats::{ConsoleReporter, NullReporter, StatsReporter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
