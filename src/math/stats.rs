//! Goodness-of-fit statistics for the elastic fit.
//!
//! Both statistics compare a measured vector `x` with a predicted vector `y`
//! (in the refinement: measured strain vs. strain predicted from stress).
//!
//! - `r_squared(x, y) = 1 - Σ(y - x)² / Σ(x - x̄)²`
//! - `covariance(x, y) = 100 · sqrt((1/R² - 1) / (n - 2))`, the coefficient of
//!   variation of the slope recommended by ASTM E111. Lower is a tighter
//!   linear fit; a perfect fit scores 0.

use crate::error::MechError;

/// Coefficient of determination of `y` as a prediction of `x`.
pub fn r_squared(x: &[f64], y: &[f64]) -> Result<f64, MechError> {
    if x.len() != y.len() {
        return Err(MechError::RegressionDegenerate(format!(
            "r_squared: length mismatch ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(MechError::RegressionDegenerate(format!(
            "r_squared needs at least 2 observations, got {}",
            x.len()
        )));
    }
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let ss_tot: f64 = x.iter().map(|&v| (v - mean).powi(2)).sum();
    if !(ss_tot > 0.0) {
        return Err(MechError::RegressionDegenerate("r_squared: x has zero variance".into()));
    }
    let ss_res: f64 = x.iter().zip(y.iter()).map(|(&a, &b)| (b - a).powi(2)).sum();
    Ok(1.0 - ss_res / ss_tot)
}

/// ASTM E111 coefficient of variation (percent) of `y` as a prediction of `x`.
///
/// A non-positive R² (prediction worse than the mean) scores `+inf`.
pub fn covariance(x: &[f64], y: &[f64]) -> Result<f64, MechError> {
    if x.len() < 3 {
        return Err(MechError::RegressionDegenerate(format!(
            "covariance needs at least 3 observations, got {}",
            x.len()
        )));
    }
    let rsq = r_squared(x, y)?;
    Ok(coefficient_of_variation(rsq, x.len()))
}

/// `100 · sqrt((1/R² - 1) / (n - 2))` for an already computed R².
pub fn coefficient_of_variation(rsq: f64, n: usize) -> f64 {
    if n < 3 || !(rsq > 0.0) {
        return f64::INFINITY;
    }
    let ratio = (1.0 / rsq - 1.0).max(0.0);
    100.0 * (ratio / (n as f64 - 2.0)).sqrt()
}

/// Trapezoidal integral of `y` over `x` (in sample order).
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERTURBED: [f64; 15] = [
        0.12772934, 0.87629623, 1.57547475, 2.65007133, 4.24801054, 5.18072437, 6.2817513,
        7.37424948, 7.97771838, 8.73240150, 9.65820983, 10.67520638, 12.06516463, 12.95414000,
        13.70856501,
    ];

    const PREDICTED: [f64; 15] = [
        0.09782940, 1.05192404, 2.02236946, 2.90373055, 3.92367251, 4.92883409, 5.97735838,
        6.92685796, 7.91508637, 8.95998904, 10.01092281, 10.99958067, 12.08381427, 12.92445983,
        14.03825360,
    ];

    fn ramp() -> Vec<f64> {
        (0..15).map(|i| i as f64).collect()
    }

    #[test]
    fn r_squared_of_identical_vectors_is_one() {
        let x = ramp();
        assert!((r_squared(&x, &x).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r_squared_reference_value() {
        let rsq = r_squared(&ramp(), &PERTURBED).unwrap();
        assert!((rsq - 0.996308546683).abs() < 1e-9, "got {rsq}");
    }

    #[test]
    fn covariance_of_identical_vectors_is_zero() {
        let x = ramp();
        assert_eq!(covariance(&x, &x).unwrap(), 0.0);
    }

    #[test]
    fn covariance_reference_value() {
        let cov = covariance(&ramp(), &PREDICTED).unwrap();
        assert!((cov - 0.4124658994).abs() < 1e-8, "got {cov}");
    }

    #[test]
    fn degenerate_inputs_are_errors() {
        assert!(r_squared(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(covariance(&[1.0, 2.0], &[1.0, 2.0]).is_err());
        assert!(r_squared(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn trapezoid_integrates_a_line_exactly() {
        let x: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|&v| 3.0 * v).collect();
        assert!((trapezoid(&x, &y) - 1.5).abs() < 1e-12);
    }
}
