//! Rasterization of the flat sample columns into a square reservoir grid.

use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

use super::stats::extent;

/// Smallest sample count that still yields a 2 x 2 grid.
pub const MIN_SAMPLES: usize = 4;

/// Errors that can occur while building the grid.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("insufficient data: {count} samples, at least {required} needed to build a grid")]
    InsufficientData { count: usize, required: usize },

    #[error("column length mismatch: aperture {aperture}, x {x}, y {y}")]
    LengthMismatch { aperture: usize, x: usize, y: usize },

    #[error("failed to shape grid: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, GridError>;

/// Square grid of coordinates and apertures in registration.
///
/// `x[[i, j]]`, `y[[i, j]]` locate cell `(i, j)` and `z[[i, j]]` is its
/// aperture. `reservoir_x` / `reservoir_y` are evenly spaced axis samples
/// spanning the measured extent; they index the same cells but are not the
/// node coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureGrid {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub z: Array2<f64>,
    pub reservoir_x: Array1<f64>,
    pub reservoir_y: Array1<f64>,
    /// Trailing samples left out of the square reshape.
    pub dropped_samples: usize,
}

impl ApertureGrid {
    /// Number of cells per row and per column.
    #[inline]
    pub fn side(&self) -> usize {
        self.z.nrows()
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.z.len()
    }

    /// Aperture values in row-major order.
    pub fn apertures(&self) -> impl Iterator<Item = f64> + '_ {
        self.z.iter().copied()
    }

    /// Cells in row-major order as `(x, y, aperture)`.
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(self.y.iter())
            .zip(self.z.iter())
            .map(|((&x, &y), &z)| (x, y, z))
    }
}

/// Largest `s` with `s * s <= n`.
pub fn grid_side(n: usize) -> usize {
    let mut side = (n as f64).sqrt() as usize;
    while side * side > n {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= n {
        side += 1;
    }
    side
}

/// `side` evenly spaced samples over `[start, stop]` with the end point pinned
/// to `stop`.
pub fn reservoir_axis(start: f64, stop: f64, side: usize) -> Array1<f64> {
    let mut axis = Array1::linspace(start, stop, side);
    if side > 0 {
        axis[side - 1] = stop;
    }
    axis
}

fn square(values: &[f64], side: usize) -> Result<Array2<f64>> {
    Array2::from_shape_vec((side, side), values[..side * side].to_vec())
        .map_err(|e| GridError::Shape(e.to_string()))
}

/// Reject sample counts too small for a grid.
pub fn check_sample_count(count: usize) -> Result<()> {
    if count < MIN_SAMPLES {
        return Err(GridError::InsufficientData {
            count,
            required: MIN_SAMPLES,
        });
    }
    Ok(())
}

/// Reshape the first `side * side` samples row-major into a square grid.
///
/// The reservoir axes span the extent of all samples, dropped ones included.
///
/// # Errors
///
/// `InsufficientData` for fewer than four samples, `LengthMismatch` when the
/// three columns differ in length.
pub fn build_grid(aperture: &[f64], x: &[f64], y: &[f64]) -> Result<ApertureGrid> {
    if aperture.len() != x.len() || aperture.len() != y.len() {
        return Err(GridError::LengthMismatch {
            aperture: aperture.len(),
            x: x.len(),
            y: y.len(),
        });
    }

    let n = aperture.len();
    check_sample_count(n)?;

    let side = grid_side(n);
    let dropped_samples = n - side * side;
    if dropped_samples > 0 {
        log::warn!(
            "{} samples is not a perfect square; dropping the last {} to fit a {}x{} grid",
            n,
            dropped_samples,
            side,
            side
        );
    }

    let (min_x, max_x) = extent(ArrayView1::from(x));
    let (min_y, max_y) = extent(ArrayView1::from(y));

    log::debug!(
        "grid {}x{} over x [{}, {}], y [{}, {}]",
        side,
        side,
        min_x,
        max_x,
        min_y,
        max_y
    );

    Ok(ApertureGrid {
        x: square(x, side)?,
        y: square(y, side)?,
        z: square(aperture, side)?,
        reservoir_x: reservoir_axis(min_x, max_x, side),
        reservoir_y: reservoir_axis(min_y, max_y, side),
        dropped_samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn columns(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let aperture = (0..n).map(|i| i as f64).collect();
        let x = (0..n).map(|i| (i % 7) as f64).collect();
        let y = (0..n).map(|i| (i / 7) as f64).collect();
        (aperture, x, y)
    }

    #[test]
    fn test_grid_side() {
        assert_eq!(grid_side(0), 0);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(8), 2);
        assert_eq!(grid_side(9), 3);
        assert_eq!(grid_side(99), 9);
        assert_eq!(grid_side(1_000_000), 1000);
        assert_eq!(grid_side(999_999), 999);
    }

    #[test]
    fn test_reservoir_axis_hits_both_ends() {
        assert_eq!(reservoir_axis(0.0, 1.0, 5), array![0.0, 0.25, 0.5, 0.75, 1.0]);
        let axis = reservoir_axis(0.1, 0.7, 7);
        assert_eq!(axis[0], 0.1);
        assert_eq!(axis[6], 0.7);
        assert_relative_eq!(axis[3], 0.4, max_relative = 1e-12);
    }

    #[test]
    fn test_build_grid_row_major() {
        let (aperture, x, y) = columns(9);
        let grid = build_grid(&aperture, &x, &y).unwrap();

        assert_eq!(grid.side(), 3);
        assert_eq!(grid.cell_count(), 9);
        assert_eq!(grid.dropped_samples, 0);
        assert_eq!(grid.z.row(1), array![3.0, 4.0, 5.0]);
        assert_eq!(grid.x.row(2), array![6.0, 0.0, 1.0]);
        assert_eq!(grid.y.row(2), array![0.0, 1.0, 1.0]);
        assert_eq!(grid.z[[2, 0]], 6.0);
    }

    #[test]
    fn test_build_grid_truncates_non_square() {
        let (aperture, x, y) = columns(14);
        let grid = build_grid(&aperture, &x, &y).unwrap();

        assert_eq!(grid.side(), 3);
        assert_eq!(grid.dropped_samples, 5);
        assert!(grid.cell_count() <= aperture.len());
        assert_eq!(grid.apertures().collect::<Vec<_>>(), aperture[..9].to_vec());
        // Axes span every sample, including the dropped ones.
        assert_eq!(grid.reservoir_x, array![0.0, 3.0, 6.0]);
        assert_eq!(grid.reservoir_y, array![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_build_grid_insufficient_data() {
        let (aperture, x, y) = columns(3);
        assert_eq!(
            build_grid(&aperture, &x, &y),
            Err(GridError::InsufficientData { count: 3, required: 4 })
        );
        assert!(matches!(
            build_grid(&[], &[], &[]),
            Err(GridError::InsufficientData { count: 0, .. })
        ));
    }

    #[test]
    fn test_build_grid_length_mismatch() {
        let result = build_grid(&[0.0; 4], &[0.0; 4], &[0.0; 5]);
        assert!(matches!(result, Err(GridError::LengthMismatch { y: 5, .. })));
    }

    #[test]
    fn test_cells_follow_registration() {
        let (aperture, x, y) = columns(4);
        let grid = build_grid(&aperture, &x, &y).unwrap();
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[3], (3.0, 0.0, 3.0));
    }
}
