//! Output naming and the grid text export.
//!
//! Artifacts are named `<core><field_name>_<YYYYMMDD>` inside the output
//! folder, where `<core>` is the input file name with its first `.txt`
//! substring removed.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::OutputConfig;
use crate::processors::grid::ApertureGrid;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create the output folder.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Failed to flush data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Remove the first literal `.txt` from `name`, wherever it occurs.
///
/// This is a plain substring strip: `scan.txt.bak` becomes `scan.bak` and a
/// name without `.txt` is returned unchanged.
pub fn strip_txt(name: &str) -> String {
    name.replacen(".txt", "", 1)
}

/// Paths of every artifact a run may produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub field_map: PathBuf,
    pub histogram: PathBuf,
    pub grid_export: PathBuf,
}

impl OutputPaths {
    /// Derive the artifact paths for `input`.
    ///
    /// Returns `None` if `input` has no file name component.
    pub fn for_input(input: &Path, output: &OutputConfig, date_stamp: &str) -> Option<Self> {
        let file_name = input.file_name()?.to_string_lossy();
        let stem = format!("{}{}_{}", strip_txt(&file_name), output.field_name, date_stamp);

        Some(Self {
            field_map: output.folder.join(format!("{}.png", stem)),
            histogram: output.folder.join(format!("{}_histogram.png", stem)),
            grid_export: output.folder.join(format!("{}.txt", stem)),
        })
    }
}

/// Creates parent directories for a file path if they don't exist.
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dirs(path)?;
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Write the grid as `aperture x y` rows, single-space separated, row-major.
///
/// The layout matches the input format, so the export can be loaded back
/// with `load_samples`.
///
/// # Returns
///
/// The number of rows written.
pub fn write_grid_txt(path: &Path, grid: &ApertureGrid) -> Result<usize> {
    let csv_error = |e: csv::Error| WriteError::CsvError {
        path: path.display().to_string(),
        source: e,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(create_buffered_writer(path)?);

    let mut rows = 0;
    for (x, y, aperture) in grid.cells() {
        writer
            .write_record(&[aperture.to_string(), x.to_string(), y.to_string()])
            .map_err(csv_error)?;
        rows += 1;
    }

    let mut inner = writer.into_inner().map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e.into_error(),
    })?;
    inner.flush().map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    log::info!("wrote {} grid rows to {}", rows, path.display());
    Ok(rows)
}
