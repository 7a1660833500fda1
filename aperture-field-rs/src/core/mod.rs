//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{load_samples, LoaderError, Sample, SampleSet};
pub use writers::{strip_txt, write_grid_txt, OutputPaths, WriteError};
