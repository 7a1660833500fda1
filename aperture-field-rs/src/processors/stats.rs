//! Descriptive statistics and the reporter used to observe pipeline stages.

use ndarray::ArrayView1;

use crate::core::writers::OutputPaths;

use super::contact::ContactSummary;
use super::inlet::InletSummary;

/// Pipeline stage at which a statistics snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Right after the exponential transform.
    Transformed,
    /// After contact classification, before clipping.
    PreClip,
    /// After clipping to the admissible range.
    PostClip,
}

/// Summary statistics of the aperture column at one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub count: usize,
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    /// Mean coordinates, when the checkpoint reports them.
    pub mean_xy: Option<(f64, f64)>,
}

impl StatsSnapshot {
    /// Statistics of `values`. All fields are NaN for an empty slice.
    pub fn of(values: &[f64]) -> Self {
        let view = ArrayView1::from(values);
        let (min, max) = if view.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            extent(view)
        };

        Self {
            count: view.len(),
            mean: mean(values),
            variance: if view.is_empty() { f64::NAN } else { view.var(0.0) },
            min,
            max,
            mean_xy: None,
        }
    }

    /// Attach the mean coordinates of the samples.
    pub fn with_coordinates(mut self, x: &[f64], y: &[f64]) -> Self {
        self.mean_xy = Some((mean(x), mean(y)));
        self
    }
}

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    ArrayView1::from(values).mean().unwrap_or(f64::NAN)
}

/// Smallest and largest value as `(min, max)`; infinities for an empty view.
pub fn extent(values: ArrayView1<f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Count values into `bins` equal-width bins over `[lo, hi]`.
///
/// The last bin is closed on the right; values outside the range (and NaN)
/// are not counted.
pub fn histogram_counts(values: &[f64], bins: usize, lo: f64, hi: f64) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 || !(hi > lo) {
        return counts;
    }

    let width = (hi - lo) / bins as f64;
    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let index = (((v - lo) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
}

/// Observer for the progress and diagnostic side channel of the pipeline.
///
/// Pure stages never print; the pipeline hands their results here. Only
/// `snapshot` is required.
pub trait StatsReporter {
    fn snapshot(&mut self, checkpoint: Checkpoint, stats: &StatsSnapshot);

    /// Artifact paths, known before any data is read.
    fn outputs(&mut self, _paths: &OutputPaths) {}

    /// Point counts, reported before the pre-clip snapshot.
    fn contact(&mut self, _summary: &ContactSummary) {}

    /// Maximum local aperture, reported after the pre-clip snapshot.
    fn contact_threshold(&mut self, _threshold: f64) {}

    fn inlet(&mut self, _summary: &InletSummary) {}

    fn rendering_started(&mut self) {}

    /// Called once rendering ends, whether it succeeded or not.
    fn rendering_finished(&mut self) {}
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl StatsReporter for NullReporter {
    fn snapshot(&mut self, _checkpoint: Checkpoint, _stats: &StatsSnapshot) {}
}

/// Reporter that prints the statistics to stdout in a fixed order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl StatsReporter for ConsoleReporter {
    fn snapshot(&mut self, checkpoint: Checkpoint, stats: &StatsSnapshot) {
        match checkpoint {
            Checkpoint::Transformed => {
                println!("Mean aperture: {:.6}", stats.mean);
                println!("Variance aperture: {:.6}", stats.variance);
                if let Some((mx, my)) = stats.mean_xy {
                    println!("Mean x-Coordinate: {:.6}", mx);
                    println!("Mean y-Coordinate: {:.6}", my);
                }
            }
            Checkpoint::PreClip => {
                println!();
                println!("\t Maximum global aperture before bringing in contact: {:.6}", stats.max);
                println!("\t Minimum global aperture before bringing in contact: {:.6}", stats.min);
            }
            Checkpoint::PostClip => {
                println!();
                println!("\t Maximum global aperture after bringing in contact: {:.6}", stats.max);
                println!("\t Minimum global aperture after bringing in contact: {:.6}", stats.min);
                println!("\t Mean global aperture after bringing in contact: {:.6}", stats.mean);
                println!("\t Variance global aperture after bringing in contact: {:.6}", stats.variance);
            }
        }
    }

    fn outputs(&mut self, paths: &OutputPaths) {
        println!("Saving field map as {}", paths.field_map.display());
        println!();
    }

    fn contact(&mut self, summary: &ContactSummary) {
        println!("\t Total number of points: {}", summary.total_points);
        println!("\t Number of points in contact: {}", summary.contact_points);
    }

    fn contact_threshold(&mut self, threshold: f64) {
        println!("\t Maximum local aperture: {:.6}", threshold);
    }

    fn inlet(&mut self, summary: &InletSummary) {
        println!(
            "\t Inlet cells visited: {} (forced open: {}, raised by blend: {})",
            summary.visited, summary.forced_open, summary.blended
        );
    }
}
