//! Aperture processing stages.

pub mod clipping;
pub mod contact;
pub mod grid;
pub mod inlet;
pub mod pipeline;
pub mod stats;
pub mod transform;

// Re-export key types for convenience
pub use clipping::{clip_aperture, clip_apertures};
pub use contact::{classify_contact, ContactSummary};
pub use grid::{build_grid, ApertureGrid, GridError};
pub use inlet::{apply_inlet_override, find_nearest, locate_inlet, InletBounds, InletSummary};
pub use pipeline::{
    build_aperture_field, prepare_outputs, process_aperture_file, write_outputs, ApertureField,
    PipelineError, PipelineOutput,
};
pub use stats::{Checkpoint, ConsoleReporter, NullReporter, StatsReporter, StatsSnapshot};
pub use transform::{exp_normalize, TransformError};
