//! Iterative refinement of the elastic fit.
//!
//! Starting from an approximate line over the estimated elastic points, each
//! iteration:
//!
//! 1. computes residual strain `e - (s - b) / m` for every point
//! 2. marks everything after the last in-tolerance residual as plastic
//! 3. marks as compliance everything before the longest (median filtered)
//!    run of points inside the `+- tolerance` strain band around the line
//! 4. regresses stress on strain over the remaining points
//! 5. keeps the fit if it lowers the target metric, otherwise perturbs the
//!    mask and restarts from a regression over the perturbed mask
//!
//! The best fit over all iterations is returned, not the last one.

use tracing::{debug, info, warn};

use crate::domain::{ElasticRegionEstimate, FitResult, RefineConfig};
use crate::error::MechError;
use crate::fit::perturb::{MaskPerturbation, perturbation_for};
use crate::math::filter::{longest_run, median_filter};
use crate::math::{LineFit, covariance, linregress, r_squared};
use crate::models::MechanicalProperties;

/// Window of the compliance median filter, as a fraction of the in-band count.
const COMPLIANCE_WINDOW_FRACTION: f64 = 0.03;

#[derive(Debug, Clone)]
struct Candidate {
    modulus: f64,
    intercept: f64,
    stderr: f64,
    covariance: f64,
    r_squared: f64,
    mask: Vec<bool>,
    iteration: usize,
}

pub struct ElasticFitRefiner {
    config: RefineConfig,
    perturbation: Box<dyn MaskPerturbation>,
}

impl ElasticFitRefiner {
    /// Refiner with the perturbation strategy named by `config`.
    pub fn new(config: RefineConfig) -> Self {
        let perturbation = perturbation_for(config.perturbation, config.seed);
        Self { config, perturbation }
    }

    pub fn with_perturbation(config: RefineConfig, perturbation: Box<dyn MaskPerturbation>) -> Self {
        Self { config, perturbation }
    }

    /// Refine an approximate elastic region.
    ///
    /// Works on the estimate's elastic points; the initial mask is their
    /// middle 80%.
    pub fn refine(&mut self, estimate: &ElasticRegionEstimate) -> Result<FitResult, MechError> {
        let n = estimate.len();
        if n < 3 {
            return Err(MechError::InsufficientData(format!(
                "elastic region estimate holds {n} point(s); at least 3 are needed"
            )));
        }
        let mask: Vec<bool> = (0..n).map(|i| i >= n / 10 && i < 9 * n / 10).collect();
        self.refine_with_mask(
            &estimate.elastic_strain,
            &estimate.elastic_stress,
            estimate.modulus,
            estimate.intercept(),
            mask,
        )
    }

    /// Refine from an explicit line and inlier mask.
    pub fn refine_with_mask(
        &mut self,
        strain: &[f64],
        stress: &[f64],
        modulus: f64,
        intercept: f64,
        mask: Vec<bool>,
    ) -> Result<FitResult, MechError> {
        self.config.validate()?;
        let n = strain.len();
        if stress.len() != n || mask.len() != n {
            return Err(MechError::InvalidSeries(format!(
                "refinement inputs differ in length: strain={n}, stress={}, mask={}",
                stress.len(),
                mask.len()
            )));
        }
        if !(modulus.is_finite() && modulus != 0.0 && intercept.is_finite()) {
            return Err(MechError::InvalidParameter(format!(
                "initial line must be finite with non-zero slope (m={modulus}, b={intercept})"
            )));
        }

        let tol = self.config.error_tolerance;
        let optimize_on = self.config.optimize_on;
        let mut best = initial_candidate(strain, stress, modulus, intercept, mask);
        let mut best_target = target_of(&best, self.config);

        let (mut m, mut b) = (modulus, intercept);
        let mut plastic_start = n;
        let mut successes = 0usize;
        let mut last_error: Option<MechError> = None;

        for iteration in 1..=self.config.max_iterations {
            let (mask, boundary) = iteration_mask(strain, stress, m, b, tol, plastic_start);
            plastic_start = boundary;

            let (fit, cov, rsq) = match evaluate(strain, stress, &mask) {
                Ok(v) => v,
                Err(err) => {
                    warn!(iteration, error = %err, "skipping degenerate refinement iteration");
                    last_error = Some(err);
                    continue;
                }
            };
            successes += 1;
            m = fit.slope;
            b = fit.intercept;

            let target = optimize_on.target(cov, rsq);
            debug!(
                iteration,
                inliers = fit.n,
                modulus = m,
                onset = -b / m,
                covariance = cov,
                r_squared = rsq,
                accepted = target < best_target,
                "refinement iteration"
            );

            if target < best_target {
                best_target = target;
                best = Candidate {
                    modulus: m,
                    intercept: b,
                    stderr: fit.stderr,
                    covariance: cov,
                    r_squared: rsq,
                    mask,
                    iteration,
                };
            } else {
                let perturbed = self.perturbation.perturb(&mask);
                match fit_mask(strain, stress, &perturbed) {
                    Ok(trial) => {
                        m = trial.slope;
                        b = trial.intercept;
                    }
                    Err(err) => warn!(iteration, error = %err, "perturbed mask gave no usable fit"),
                }
            }
        }

        if successes == 0 {
            return Err(MechError::RefinementFailed {
                iterations: self.config.max_iterations,
                source: Box::new(last_error.unwrap_or_else(|| {
                    MechError::RegressionDegenerate("no iteration produced a fit".into())
                })),
            });
        }

        let onset_strain = -best.intercept / best.modulus;
        info!(
            modulus = best.modulus,
            onset = onset_strain,
            stderr = best.stderr,
            covariance = best.covariance,
            best_iteration = best.iteration,
            "elastic fit refined"
        );

        Ok(FitResult {
            modulus: best.modulus,
            onset_strain,
            intercept: best.intercept,
            standard_error_of_slope: best.stderr,
            coefficient_of_determination: best.r_squared,
            coefficient_of_variation: best.covariance,
            elastic_strain: select(strain, &best.mask),
            elastic_stress: select(stress, &best.mask),
            inlier_mask: best.mask,
            iterations_used: self.config.max_iterations,
            best_iteration: best.iteration,
        })
    }
}

/// Refine an estimate with the strategy and seed from `config`.
pub fn refine(estimate: &ElasticRegionEstimate, config: &RefineConfig) -> Result<FitResult, MechError> {
    ElasticFitRefiner::new(*config).refine(estimate)
}

/// Refine `estimate` and store the modulus/onset in `model`.
///
/// Fails with `Reassignment` if the model already holds elastic properties.
pub fn set_elastic(
    model: &mut MechanicalProperties,
    estimate: &ElasticRegionEstimate,
    config: &RefineConfig,
) -> Result<FitResult, MechError> {
    model.ensure_elastic_unset()?;
    let fit = refine(estimate, config)?;
    model.set_elastic_modulus(fit.modulus)?;
    model.set_elastic_onset(fit.onset_strain)?;
    Ok(fit)
}

/// Inlier mask of one iteration for the line `stress = m * strain + b`, and
/// the plastic boundary it used.
///
/// The boundary is recomputed from the current line over every point, so a
/// point left out by an earlier line can come back. It only falls back to
/// `plastic_start` when no point is within tolerance.
fn iteration_mask(
    strain: &[f64],
    stress: &[f64],
    m: f64,
    b: f64,
    tol: f64,
    plastic_start: usize,
) -> (Vec<bool>, usize) {
    let n = strain.len();
    // Once the curve leaves the line it does not come back.
    let plastic_start = (0..n)
        .rev()
        .find(|&i| (strain[i] - (stress[i] - b) / m).abs() < tol)
        .map_or(plastic_start, |last| last + 1);

    let in_band: Vec<bool> = strain
        .iter()
        .zip(stress.iter())
        .map(|(&e, &s)| m * (e - tol) + b < s && s < m * (e + tol) + b)
        .collect();
    let band_count = in_band.iter().filter(|&&v| v).count();
    let window = 2 * (COMPLIANCE_WINDOW_FRACTION * band_count as f64) as usize + 1;
    let compliance_end = longest_run(&median_filter(&in_band, window))
        .map(|(start, _)| start)
        .unwrap_or(0);

    let mask = (0..n).map(|i| i >= compliance_end && i < plastic_start).collect();
    (mask, plastic_start)
}

fn select(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values.iter().zip(mask.iter()).filter(|&(_, &m)| m).map(|(&v, _)| v).collect()
}

fn fit_mask(strain: &[f64], stress: &[f64], mask: &[bool]) -> Result<LineFit, MechError> {
    let fit = linregress(&select(strain, mask), &select(stress, mask))?;
    if !(fit.slope.is_finite() && fit.slope != 0.0) {
        return Err(MechError::RegressionDegenerate(format!("unusable slope {}", fit.slope)));
    }
    Ok(fit)
}

/// Regression over `mask` plus its covariance and R² (measured vs. predicted strain).
fn evaluate(strain: &[f64], stress: &[f64], mask: &[bool]) -> Result<(LineFit, f64, f64), MechError> {
    let fit = fit_mask(strain, stress, mask)?;
    let measured = select(strain, mask);
    let predicted: Vec<f64> = select(stress, mask)
        .iter()
        .map(|&s| (s - fit.intercept) / fit.slope)
        .collect();
    let cov = covariance(&measured, &predicted)?;
    let rsq = r_squared(&measured, &predicted)?;
    Ok((fit, cov, rsq))
}

/// Statistics of the starting line over the starting mask.
///
/// Degenerate starting statistics score as infinitely bad so that any
/// successful iteration replaces them.
fn initial_candidate(strain: &[f64], stress: &[f64], modulus: f64, intercept: f64, mask: Vec<bool>) -> Candidate {
    let measured = select(strain, &mask);
    let observed = select(stress, &mask);
    let predicted: Vec<f64> = observed.iter().map(|&s| (s - intercept) / modulus).collect();
    let covariance = covariance(&measured, &predicted).unwrap_or(f64::INFINITY);
    let r_squared = r_squared(&measured, &predicted).unwrap_or(f64::NEG_INFINITY);
    Candidate {
        modulus,
        intercept,
        stderr: slope_standard_error(&measured, &observed, modulus, intercept),
        covariance,
        r_squared,
        mask,
        iteration: 0,
    }
}

fn target_of(candidate: &Candidate, config: RefineConfig) -> f64 {
    let t = config.optimize_on.target(candidate.covariance, candidate.r_squared);
    if t.is_nan() { f64::INFINITY } else { t }
}

/// `sqrt(SSres / (n - 2) / Sxx)` for a given line; infinite when undefined.
fn slope_standard_error(x: &[f64], y: &[f64], slope: f64, intercept: f64) -> f64 {
    let n = x.len();
    if n < 3 {
        return f64::INFINITY;
    }
    let mean = x.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|&v| (v - mean).powi(2)).sum();
    if !(sxx > 0.0) {
        return f64::INFINITY;
    }
    let ss_res: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    (ss_res / (n as f64 - 2.0) / sxx).sqrt()
}
