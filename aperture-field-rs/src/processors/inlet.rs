//! Inlet localization and aperture override.
//!
//! The inlet is the box `[-r, r] x [-r, r]` around the origin. Its bounds are
//! snapped to the nearest reservoir axis samples, and every cell in the
//! resulting index window is opened up according to its radial distance.

use ndarray::ArrayView1;

use crate::config::InletConfig;

use super::grid::ApertureGrid;

/// Ratio beyond which cells keep their measured aperture.
const BLEND_RATIO_LIMIT: f64 = 1.0;

/// Half-open index window covered by the inlet: rows `ix0..ix1`, columns
/// `iy0..iy1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InletBounds {
    pub ix0: usize,
    pub ix1: usize,
    pub iy0: usize,
    pub iy1: usize,
}

impl InletBounds {
    /// True when the window selects no cell.
    pub fn is_empty(&self) -> bool {
        self.ix0 >= self.ix1 || self.iy0 >= self.iy1
    }

    pub fn cell_count(&self) -> usize {
        self.ix1.saturating_sub(self.ix0) * self.iy1.saturating_sub(self.iy0)
    }
}

/// Counts of what the override did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InletSummary {
    /// Cells inside the index window.
    pub visited: usize,
    /// Cells inside the full-aperture disk.
    pub forced_open: usize,
    /// Cells whose aperture the blend raised.
    pub blended: usize,
}

/// Closest entry of `axis` to `value` as `(entry, index)`.
///
/// Ties go to the lowest index. NaN entries never match. Returns `None` when
/// no entry is comparable.
pub fn find_nearest(axis: ArrayView1<f64>, value: f64) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    let mut best_distance = f64::INFINITY;

    for (index, &entry) in axis.indexed_iter() {
        let distance = (entry - value).abs();
        if distance.is_nan() {
            continue;
        }
        if best.is_none() || distance < best_distance {
            best = Some((entry, index));
            best_distance = distance;
        }
    }

    best
}

/// Snap the inlet box `[-radius, radius]^2` onto the reservoir axes.
pub fn locate_inlet(
    reservoir_x: ArrayView1<f64>,
    reservoir_y: ArrayView1<f64>,
    radius: f64,
) -> Option<InletBounds> {
    let (_, ix0) = find_nearest(reservoir_x, -radius)?;
    let (_, ix1) = find_nearest(reservoir_x, radius)?;
    let (_, iy0) = find_nearest(reservoir_y, -radius)?;
    let (_, iy1) = find_nearest(reservoir_y, radius)?;

    Some(InletBounds { ix0, ix1, iy0, iy1 })
}

/// Aperture given by the linear blend at `ratio`.
#[inline]
pub fn blend_aperture(ratio: f64, blend_height: f64, max_aperture: f64) -> f64 {
    (1.0 - ratio + blend_height) * max_aperture
}

/// Open up the cells inside `bounds`.
///
/// Two independent checks run per cell, in order:
/// 1. `ratio <= full_aperture_ratio` sets the aperture to `max_aperture`;
/// 2. `ratio <= 1` raises the aperture to the blend value if that is larger.
///
/// A cell inside the disk therefore passes both. Cells with `ratio > 1` are
/// left untouched, as is everything when the window is empty.
pub fn apply_inlet_override(
    grid: &mut ApertureGrid,
    bounds: &InletBounds,
    inlet: &InletConfig,
    max_aperture: f64,
) -> InletSummary {
    let mut summary = InletSummary::default();

    if bounds.is_empty() {
        log::warn!(
            "inlet window {:?} selects no cells; aperture field left unchanged",
            bounds
        );
        return summary;
    }

    let side = grid.side();
    for i in bounds.ix0..bounds.ix1.min(side) {
        for j in bounds.iy0..bounds.iy1.min(side) {
            summary.visited += 1;

            let radius = (grid.x[[i, j]].powi(2) + grid.y[[i, j]].powi(2)).sqrt();
            let ratio = radius / inlet.radius;

            if ratio <= inlet.full_aperture_ratio {
                grid.z[[i, j]] = max_aperture;
                summary.forced_open += 1;
            }

            if ratio <= BLEND_RATIO_LIMIT {
                let blended = blend_aperture(ratio, inlet.blend_height, max_aperture);
                if blended > grid.z[[i, j]] {
                    grid.z[[i, j]] = blended;
                    summary.blended += 1;
                }
            }
        }
    }

    log::info!(
        "inlet override: {} cells visited, {} forced open, {} raised by blend",
        summary.visited,
        summary.forced_open,
        summary.blended
    );

    summary
}
