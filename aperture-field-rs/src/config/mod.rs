//! Configuration types for the aperture field pipeline.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by an inconsistent configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("contact_offset_minimum ({minimum}) exceeds max_aperture ({maximum})")]
    InvertedApertureBounds { minimum: f64, maximum: f64 },

    #[error("contact_fraction must lie in [0, 1], got {0}")]
    ContactFraction(f64),

    #[error("histogram_range [{0}, {1}] is empty")]
    HistogramRange(f64, f64),

    #[error("{0} must be non-zero")]
    Zero(&'static str),
}

/// Aperture normalization and clipping constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApertureConfig {
    /// Value the largest transformed aperture is scaled to
    #[serde(default = "default_normalization_scale")]
    pub normalization_scale: f64,

    /// Smallest aperture kept for points in contact
    #[serde(default = "default_contact_offset_minimum")]
    pub contact_offset_minimum: f64,

    /// Largest admissible aperture
    #[serde(default = "default_max_aperture")]
    pub max_aperture: f64,

    /// Fraction of points considered in contact
    #[serde(default = "default_contact_fraction")]
    pub contact_fraction: f64,
}

fn default_normalization_scale() -> f64 {
    0.01
}

fn default_contact_offset_minimum() -> f64 {
    4e-6
}

fn default_max_aperture() -> f64 {
    0.001
}

fn default_contact_fraction() -> f64 {
    0.1
}

impl Default for ApertureConfig {
    fn default() -> Self {
        Self {
            normalization_scale: default_normalization_scale(),
            contact_offset_minimum: default_contact_offset_minimum(),
            max_aperture: default_max_aperture(),
            contact_fraction: default_contact_fraction(),
        }
    }
}

/// Geometry of the injection inlet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InletConfig {
    /// Half-width of the inlet box and reference radius of the blend
    #[serde(default = "default_inlet_radius")]
    pub radius: f64,

    /// Radius fraction inside which cells are forced to the maximum aperture
    #[serde(default = "default_full_aperture_ratio")]
    pub full_aperture_ratio: f64,

    /// Height of the linear blend, in units of max_aperture
    #[serde(default = "default_blend_height")]
    pub blend_height: f64,
}

fn default_inlet_radius() -> f64 {
    3.0
}

fn default_full_aperture_ratio() -> f64 {
    0.4
}

fn default_blend_height() -> f64 {
    0.33 * 3.0
}

impl Default for InletConfig {
    fn default() -> Self {
        Self {
            radius: default_inlet_radius(),
            full_aperture_ratio: default_full_aperture_ratio(),
            blend_height: default_blend_height(),
        }
    }
}

/// Output artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Folder all artifacts are written to
    #[serde(default = "default_output_folder")]
    pub folder: PathBuf,

    /// Tag inserted between the input name and the date
    #[serde(default = "default_field_name")]
    pub field_name: String,

    /// Field map width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Field map height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Number of histogram bins
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    /// Aperture range covered by the histogram
    #[serde(default = "default_histogram_range")]
    pub histogram_range: [f64; 2],

    /// Write the aperture histogram next to the field map
    #[serde(default = "default_true")]
    pub save_histogram: bool,

    /// Write the final grid as a text file for flow simulation
    #[serde(default)]
    pub export_grid: bool,
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("./")
}

fn default_field_name() -> String {
    "normal".to_string()
}

// 10 x 8 inches at 80 dpi
fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    640
}

fn default_histogram_bins() -> usize {
    100
}

fn default_histogram_range() -> [f64; 2] {
    [0.0, 0.0011]
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: default_output_folder(),
            field_name: default_field_name(),
            width: default_width(),
            height: default_height(),
            histogram_bins: default_histogram_bins(),
            histogram_range: default_histogram_range(),
            save_histogram: true,
            export_grid: false,
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub aperture: ApertureConfig,

    #[serde(default)]
    pub inlet: InletConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the constants describe a usable pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let aperture = &self.aperture;
        for (field, value) in [
            ("normalization_scale", aperture.normalization_scale),
            ("contact_offset_minimum", aperture.contact_offset_minimum),
            ("max_aperture", aperture.max_aperture),
            ("inlet radius", self.inlet.radius),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if aperture.contact_offset_minimum > aperture.max_aperture {
            return Err(ConfigError::InvertedApertureBounds {
                minimum: aperture.contact_offset_minimum,
                maximum: aperture.max_aperture,
            });
        }

        if !(0.0..=1.0).contains(&aperture.contact_fraction) {
            return Err(ConfigError::ContactFraction(aperture.contact_fraction));
        }

        let output = &self.output;
        if output.histogram_bins == 0 {
            return Err(ConfigError::Zero("histogram_bins"));
        }
        if output.width == 0 || output.height == 0 {
            return Err(ConfigError::Zero("image size"));
        }
        let [lo, hi] = output.histogram_range;
        if !(hi > lo) {
            return Err(ConfigError::HistogramRange(lo, hi));
        }

        Ok(())
    }
}

/// Per-run state fixed at startup and handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub run_date: NaiveDate,
}

impl RunContext {
    pub fn new(run_date: NaiveDate) -> Self {
        Self { run_date }
    }

    /// Context for a run starting now, in local time.
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// Run date as `YYYYMMDD`.
    pub fn date_stamp(&self) -> String {
        self.run_date.format("%Y%m%d").to_string()
    }
}
