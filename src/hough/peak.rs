//! Post-processing of the raw vote grid.
//!
//! Raw votes are spiky: an argmax lands on noise. The grid is coarsened by
//! block summing, smoothed with repeated Gaussian passes, and only then
//! searched for its maximum inside an angle window.

use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::{HoughConfig, HoughDiagnostics};
use crate::error::MechError;
use crate::hough::HoughSpace;
use crate::math::filter::gaussian_filter;

/// Sum `factor x factor` blocks of `grid`. Trailing partial blocks are kept.
pub fn resample(grid: &DMatrix<f64>, factor: usize) -> DMatrix<f64> {
    let factor = factor.max(1);
    let (rows, cols) = grid.shape();
    let out_rows = rows.div_ceil(factor);
    let out_cols = cols.div_ceil(factor);
    let mut out = DMatrix::<f64>::zeros(out_rows, out_cols);
    for j in 0..cols {
        for i in 0..rows {
            out[(i / factor, j / factor)] += grid[(i, j)];
        }
    }
    out
}

/// `passes` successive Gaussian smoothings with the same `sigma`.
pub fn smooth(grid: &DMatrix<f64>, sigma: f64, passes: usize) -> DMatrix<f64> {
    let mut out = grid.clone();
    for _ in 0..passes {
        out = gaussian_filter(&out, sigma);
    }
    out
}

/// Rows of a grid with `rows` angle rows that fall inside the search window.
pub fn search_rows(rows: usize, config: &HoughConfig) -> (usize, usize) {
    let (lo, hi) = config.theta_range;
    let frac = |deg: f64| ((deg.to_radians() - lo) / (hi - lo)).clamp(0.0, 1.0);
    let first = ((frac(config.search_lower_deg) * rows as f64) as usize).min(rows.saturating_sub(1));
    let last = ((frac(config.search_upper_deg) * rows as f64) as usize).min(rows);
    (first, last.max(first + 1))
}

/// Mean `(row, col)` of every cell tied for the maximum within rows
/// `first..last`.
pub fn tied_maximum(grid: &DMatrix<f64>, first: usize, last: usize) -> Option<(f64, f64)> {
    let mut best = f64::NEG_INFINITY;
    let mut cells: Vec<(usize, usize)> = Vec::new();
    for i in first..last.min(grid.nrows()) {
        for j in 0..grid.ncols() {
            let v = grid[(i, j)];
            if v > best {
                best = v;
                cells.clear();
                cells.push((i, j));
            } else if v == best {
                cells.push((i, j));
            }
        }
    }
    if cells.is_empty() {
        return None;
    }
    let n = cells.len() as f64;
    let row = cells.iter().map(|&(i, _)| i as f64).sum::<f64>() / n;
    let col = cells.iter().map(|&(_, j)| j as f64).sum::<f64>() / n;
    Some((row, col))
}

/// Locate the dominant line inside the configured angle window.
///
/// The returned `theta`/`distance` are read off the full-resolution space.
pub fn locate_peak(space: &HoughSpace, config: &HoughConfig) -> Result<HoughDiagnostics, MechError> {
    let factor = config.resample_factor.max(1);
    let resampled = smooth(
        &resample(space.votes(), factor),
        config.smoothing_sigma,
        config.smoothing_passes,
    );

    let (first, last) = search_rows(resampled.nrows(), config);
    let peak = tied_maximum(&resampled, first, last).ok_or_else(|| {
        MechError::InsufficientData(format!("empty Hough search window (rows {first}..{last})"))
    })?;

    // Block centers in the coarse grid map back to fractional fine bins.
    let to_fine = |p: f64| (p + 0.5) * factor as f64 - 0.5;
    let (theta, distance) = space.theta_distance(to_fine(peak.0), to_fine(peak.1));
    debug!(
        row = peak.0,
        col = peak.1,
        theta_deg = theta.to_degrees(),
        distance, "Hough peak located"
    );

    Ok(HoughDiagnostics {
        theta,
        distance,
        peak,
        resampled,
    })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    #[test]
    fn resample_sums_blocks_and_keeps_partial_ones() {
        let grid = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let out = resample(&grid, 2);
        assert_eq!(out.shape(), (2, 2));
        assert_eq!(out[(0, 0)], 12.0);
        assert_eq!(out[(0, 1)], 9.0);
        assert_eq!(out[(1, 0)], 15.0);
        assert_eq!(out[(1, 1)], 9.0);
        assert_eq!(out.sum(), grid.sum());
    }

    #[test]
    fn search_rows_follow_the_degree_window() {
        let config = HoughConfig::default();
        assert_eq!(search_rows(901, &config), (300, 450));
        assert_eq!(search_rows(1801, &config), (600, 900));
    }

    #[test]
    fn tied_maxima_are_averaged() {
        let mut grid = DMatrix::<f64>::zeros(6, 5);
        grid[(1, 1)] = 3.0;
        grid[(3, 3)] = 3.0;
        grid[(5, 4)] = 9.0;
        assert_eq!(tied_maximum(&grid, 0, 5), Some((2.0, 2.0)));
        assert_eq!(tied_maximum(&grid, 0, 6), Some((5.0, 4.0)));
    }

    #[test]
    fn smoothed_peak_recovers_a_steep_line() {
        // 75 degree line through a cloud of background points.
        let theta = 75f64.to_radians();
        let d = -0.1;
        let mut x: Vec<f64> = (0..60).map(|i| i as f64 / 240.0).collect();
        let mut y: Vec<f64> = x.iter().map(|&v| v * theta.tan() - d / theta.cos()).collect();
        for i in 0..40 {
            let t = i as f64 / 40.0;
            x.push(0.3 + 0.7 * t);
            y.push(0.9 + 0.1 * t);
        }
        let config = HoughConfig {
            nq: 721,
            nr: 721,
            ..HoughConfig::default()
        };
        let space = HoughSpace::build(&x, &y, &config).unwrap();
        let diag = locate_peak(&space, &config).unwrap();
        assert!((diag.theta - theta).abs() < 1.5f64.to_radians(), "theta {}", diag.theta.to_degrees());
        assert!((diag.distance - d).abs() < 0.02, "distance {}", diag.distance);
        assert!(diag.theta >= PI / 3.0 && diag.theta <= PI / 2.0);
    }
}
