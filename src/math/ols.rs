//! Least squares for straight lines.
//!
//! Every regression in this crate is a line `y = slope * x + intercept`:
//!
//! - the elastic refinement fits stress on strain over an inlier subset
//! - the manual approximator fits a weighted line over the picked selection
//!
//! Implementation choices:
//! - We scale rows by `sqrt(w_i)` and solve an ordinary least squares problem.
//! - SVD is used so a tall design matrix (many more rows than columns) is
//!   solved robustly. Nalgebra's `QR::solve` is intended for square systems.
//! - Fit statistics (r, standard error of the slope) use closed forms over
//!   the centered sums.

use nalgebra::{DMatrix, DVector};

use crate::error::MechError;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Straight-line fit with the statistics used to judge elastic fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub r_value: f64,
    /// Standard error of the slope, `sqrt(SSres / (n - 2)) / sqrt(Sxx)`.
    /// Zero for an exact two-point fit.
    pub stderr: f64,
    pub n: usize,
}

/// Ordinary least squares line through `(x, y)`.
///
/// Fails with `RegressionDegenerate` for fewer than two points, mismatched
/// lengths, non-finite input, or zero variance in `x`.
pub fn linregress(x: &[f64], y: &[f64]) -> Result<LineFit, MechError> {
    let weights = vec![1.0; x.len()];
    weighted_linregress(x, y, &weights)
}

/// Weighted least squares line; zero weights drop a point entirely.
pub fn weighted_linregress(x: &[f64], y: &[f64], w: &[f64]) -> Result<LineFit, MechError> {
    if x.len() != y.len() || x.len() != w.len() {
        return Err(MechError::RegressionDegenerate(format!(
            "length mismatch: x={}, y={}, w={}",
            x.len(),
            y.len(),
            w.len()
        )));
    }
    if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(MechError::RegressionDegenerate("weights must be finite and >= 0".into()));
    }

    let rows: Vec<usize> = (0..x.len()).filter(|&i| w[i] > 0.0).collect();
    let n = rows.len();
    if n < 2 {
        return Err(MechError::RegressionDegenerate(format!(
            "need at least 2 weighted points, got {n}"
        )));
    }
    if rows.iter().any(|&i| !(x[i].is_finite() && y[i].is_finite())) {
        return Err(MechError::RegressionDegenerate("non-finite sample".into()));
    }

    let sw: f64 = rows.iter().map(|&i| w[i]).sum();
    let x_mean = rows.iter().map(|&i| w[i] * x[i]).sum::<f64>() / sw;
    let y_mean = rows.iter().map(|&i| w[i] * y[i]).sum::<f64>() / sw;
    let sxx: f64 = rows.iter().map(|&i| w[i] * (x[i] - x_mean).powi(2)).sum();
    let syy: f64 = rows.iter().map(|&i| w[i] * (y[i] - y_mean).powi(2)).sum();
    let sxy: f64 = rows
        .iter()
        .map(|&i| w[i] * (x[i] - x_mean) * (y[i] - y_mean))
        .sum();

    let x_scale = rows.iter().map(|&i| x[i].abs()).fold(0.0, f64::max).max(f64::MIN_POSITIVE);
    if sxx <= (x_scale * 1e-12).powi(2) * sw {
        return Err(MechError::RegressionDegenerate("x has zero variance".into()));
    }

    // Build weighted design matrix X_w = [sqrt(w), sqrt(w) * (x - x̄)] and y_w.
    // Centering x keeps the columns well conditioned for strain-sized inputs.
    let mut xw = DMatrix::<f64>::zeros(n, 2);
    let mut yw = DVector::<f64>::zeros(n);
    for (row, &i) in rows.iter().enumerate() {
        let sqw = w[i].sqrt();
        xw[(row, 0)] = sqw;
        xw[(row, 1)] = sqw * (x[i] - x_mean);
        yw[row] = sqw * y[i];
    }
    let beta = solve_least_squares(&xw, &yw)
        .ok_or_else(|| MechError::RegressionDegenerate("singular design matrix".into()))?;

    let slope = beta[1];
    let intercept = beta[0] - slope * x_mean;

    let r_value = if syy > 0.0 {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let stderr = if n > 2 {
        let ss_res: f64 = rows
            .iter()
            .map(|&i| w[i] * (y[i] - (slope * x[i] + intercept)).powi(2))
            .sum();
        (ss_res / (n as f64 - 2.0) / sxx).sqrt()
    } else {
        0.0
    };

    Ok(LineFit {
        slope,
        intercept,
        r_value,
        stderr,
        n,
    })
}
