//! Rendering of the aperture histogram and the pseudocolor field map.
//!
//! Both figures are drawn with plotters onto a bitmap and saved as PNG. No
//! text is rendered, so no system fonts are required.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::processors::grid::ApertureGrid;
use crate::processors::stats::histogram_counts;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Nothing to plot")]
    EmptyData,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Width of the colorbar strip in pixels.
const COLORBAR_WIDTH: u32 = 90;

/// Number of color steps drawn in the colorbar.
const COLORBAR_STEPS: usize = 256;

/// Face color of histogram bars.
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Major grid line color.
const GRID_COLOR: RGBColor = RGBColor(211, 211, 211);

fn plotting_error<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

/// Map `t` in `[0, 1]` onto the gnuplot colormap (black, purple, red, yellow).
///
/// Values outside the unit interval are clamped; NaN maps to black.
pub fn gnuplot_color(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

    let r = t.sqrt();
    let g = t.powi(3);
    let b = (2.0 * std::f64::consts::PI * t).sin().clamp(0.0, 1.0);

    let to_u8 = |c: f64| (c * 255.0).round() as u8;
    RGBColor(to_u8(r), to_u8(g), to_u8(b))
}

/// Normalized position of `value` within `[vmin, vmax]`.
fn normalize(value: f64, vmin: f64, vmax: f64) -> f64 {
    if vmax > vmin {
        (value - vmin) / (vmax - vmin)
    } else {
        0.0
    }
}

/// Plot a histogram of aperture values and save it as PNG.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `apertures` - Values to count; those outside `range` are ignored
/// * `bins` - Number of equal-width bins
/// * `range` - Lower and upper edge of the binned interval
/// * `size` - Image size in pixels
pub fn plot_aperture_histogram(
    output_path: &Path,
    apertures: &[f64],
    bins: usize,
    range: [f64; 2],
    size: (u32, u32),
) -> Result<()> {
    if apertures.is_empty() || bins == 0 {
        return Err(VisualizationError::EmptyData);
    }

    let [lo, hi] = range;
    let counts = histogram_counts(apertures, bins, lo, hi);
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let bin_width = (hi - lo) / bins as f64;

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plotting_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(lo..hi, 0.0..max_count * 1.05)
        .map_err(plotting_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(GRID_COLOR)
        .light_line_style(WHITE.mix(0.0))
        .draw()
        .map_err(plotting_error)?;

    chart
        .draw_series(counts.iter().enumerate().filter(|(_, count)| **count > 0).map(|(i, &count)| {
            let x0 = lo + i as f64 * bin_width;
            Rectangle::new([(x0, 0.0), (x0 + bin_width, count as f64)], BAR_COLOR.filled())
        }))
        .map_err(plotting_error)?;

    root.present().map_err(plotting_error)?;

    log::info!("histogram saved to {}", output_path.display());
    Ok(())
}

/// Plot the aperture grid as a flat-shaded pseudocolor map and save as PNG.
///
/// Cell `(i, j)` is the quadrilateral spanned by nodes `(i, j)`, `(i, j + 1)`,
/// `(i + 1, j + 1)` and `(i + 1, j)`, filled with the color of `z[[i, j]]`; the
/// last row and column only serve as corners. Colors saturate outside
/// `[vmin, vmax]`. A colorbar strip is drawn on the right.
pub fn plot_aperture_field(
    output_path: &Path,
    grid: &ApertureGrid,
    vmin: f64,
    vmax: f64,
    size: (u32, u32),
) -> Result<()> {
    let side = grid.side();
    if side < 2 {
        return Err(VisualizationError::EmptyData);
    }

    let mut quads: Vec<(Vec<(f64, f64)>, RGBColor)> = Vec::with_capacity((side - 1) * (side - 1));
    for i in 0..side - 1 {
        for j in 0..side - 1 {
            let corners = vec![
                (grid.x[[i, j]], grid.y[[i, j]]),
                (grid.x[[i, j + 1]], grid.y[[i, j + 1]]),
                (grid.x[[i + 1, j + 1]], grid.y[[i + 1, j + 1]]),
                (grid.x[[i + 1, j]], grid.y[[i + 1, j]]),
            ];
            quads.push((corners, gnuplot_color(normalize(grid.z[[i, j]], vmin, vmax))));
        }
    }

    let (x_min, x_max, y_min, y_max) = compute_bounds(grid);

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plotting_error)?;

    let colorbar_width = COLORBAR_WIDTH.min(size.0 / 4);
    let (field_area, colorbar_area) = root.split_horizontally((size.0 - colorbar_width) as i32);

    let mut chart = ChartBuilder::on(&field_area)
        .margin(10)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plotting_error)?;

    chart
        .configure_mesh()
        .bold_line_style(GRID_COLOR)
        .light_line_style(WHITE.mix(0.0))
        .draw()
        .map_err(plotting_error)?;

    chart
        .draw_series(
            quads
                .into_iter()
                .map(|(corners, color)| Polygon::new(corners, color.filled())),
        )
        .map_err(plotting_error)?;

    draw_colorbar(&colorbar_area, vmin, vmax)?;

    root.present().map_err(plotting_error)?;

    log::info!("aperture field saved to {}", output_path.display());
    Ok(())
}

fn draw_colorbar(
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    vmin: f64,
    vmax: f64,
) -> Result<()> {
    let (lo, hi) = if vmax > vmin { (vmin, vmax) } else { (vmin, vmin + 1.0) };
    let step = (hi - lo) / COLORBAR_STEPS as f64;

    let side_margin = (area.dim_in_pixel().0 / 3) as i32;
    let mut bar = ChartBuilder::on(area)
        .margin_top(10)
        .margin_bottom(10)
        .margin_left(side_margin)
        .margin_right(side_margin)
        .build_cartesian_2d(0.0..1.0, lo..hi)
        .map_err(plotting_error)?;

    bar.draw_series((0..COLORBAR_STEPS).map(|k| {
        let y0 = lo + k as f64 * step;
        let color = gnuplot_color((k as f64 + 0.5) / COLORBAR_STEPS as f64);
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
    }))
    .map_err(plotting_error)?;

    bar.draw_series(std::iter::once(Rectangle::new([(0.0, lo), (1.0, hi)], BLACK.stroke_width(1))))
        .map_err(plotting_error)?;

    Ok(())
}

/// Compute the bounds (min/max) of the node coordinates.
fn compute_bounds(grid: &ApertureGrid) -> (f64, f64, f64, f64) {
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;

    for (x, y, _) in grid.cells() {
        if x < x_min { x_min = x; }
        if x > x_max { x_max = x; }
        if y < y_min { y_min = y; }
        if y > y_max { y_max = y; }
    }

    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (x_min, x_max, y_min, y_max)
}
