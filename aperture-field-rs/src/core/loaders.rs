//! Loader for whitespace-delimited aperture measurement files.
//!
//! Each line holds exactly one sample as three single-space separated
//! floating point fields: `aperture x y`. There is no header, and blank or
//! comment lines are rejected rather than skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Number of leading fields consumed per line.
const FIELDS_PER_LINE: usize = 3;

/// One measured point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub aperture: f64,
    pub x: f64,
    pub y: f64,
}

/// Samples in file order, stored as parallel columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    /// Raw aperture values.
    pub aperture: Vec<f64>,
    /// X coordinates.
    pub x: Vec<f64>,
    /// Y coordinates.
    pub y: Vec<f64>,
}

impl SampleSet {
    /// Creates an empty sample set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sample set with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            aperture: Vec::with_capacity(capacity),
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.aperture.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.aperture.is_empty()
    }

    /// Appends a sample.
    #[inline]
    pub fn push(&mut self, sample: Sample) {
        self.aperture.push(sample.aperture);
        self.x.push(sample.x);
        self.y.push(sample.y);
    }
}

/// Parse one line of an aperture file.
///
/// `line_number` is 1-based and only used for error messages. Fields after
/// the third are ignored.
pub fn parse_sample_line(line: &str, line_number: usize) -> Result<Sample> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let fields: Vec<&str> = line.split(' ').collect();

    if fields.len() < FIELDS_PER_LINE {
        return Err(LoaderError::ParseError {
            line: line_number,
            message: format!(
                "expected {} space-separated fields, found {}",
                FIELDS_PER_LINE,
                fields.len()
            ),
        });
    }

    let parse_field = |index: usize, name: &str| -> Result<f64> {
        fields[index].parse::<f64>().map_err(|_| LoaderError::ParseError {
            line: line_number,
            message: format!("invalid {} value: {:?}", name, fields[index]),
        })
    };

    Ok(Sample {
        aperture: parse_field(0, "aperture")?,
        x: parse_field(1, "x")?,
        y: parse_field(2, "y")?,
    })
}

/// Load all samples from an aperture file.
///
/// The file is read in full and closed before returning. An empty file
/// produces an empty set; the caller decides whether that is enough data.
///
/// # Errors
///
/// Returns `LoaderError::Io` if the file cannot be opened or read, and
/// `LoaderError::ParseError` for the first malformed line.
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<SampleSet> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut samples = SampleSet::with_capacity(4096);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        samples.push(parse_sample_line(&line, index + 1)?);
    }

    Ok(samples)
}
