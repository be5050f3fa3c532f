//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - built by tests without going through file ingest

use std::f64::consts::PI;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::MechError;

/// Engineering strain offset used for the 0.2% yield definition.
pub const ELASTIC_OFFSET: f64 = 0.002;

/// One independently sampled channel of a tensile test: `(time, value)` pairs.
///
/// Invariants (checked by `Series::new`): equal lengths, at least two samples,
/// finite values, strictly increasing time.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    time: Vec<f64>,
    values: Vec<f64>,
}

impl Series {
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> Result<Self, MechError> {
        if time.len() != values.len() {
            return Err(MechError::InvalidSeries(format!(
                "time has {} samples but values has {}",
                time.len(),
                values.len()
            )));
        }
        if time.len() < 2 {
            return Err(MechError::InsufficientData(format!(
                "a series needs at least 2 samples, got {}",
                time.len()
            )));
        }
        if let Some(i) = time
            .iter()
            .zip(values.iter())
            .position(|(t, v)| !(t.is_finite() && v.is_finite()))
        {
            return Err(MechError::InvalidSeries(format!("non-finite sample at index {i}")));
        }
        if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(MechError::InvalidSeries(format!(
                "time must be strictly increasing (index {} -> {}: {} -> {})",
                i,
                i + 1,
                time[i],
                time[i + 1]
            )));
        }
        Ok(Self { time, values })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// First and last timestamp.
    pub fn span(&self) -> (f64, f64) {
        (self.time[0], self.time[self.time.len() - 1])
    }
}

/// Strain and stress registered on one shared time base.
///
/// Built once (normally by `data::merge`) and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCurve {
    time: Vec<f64>,
    strain: Vec<f64>,
    stress: Vec<f64>,
}

impl MergedCurve {
    pub fn new(time: Vec<f64>, strain: Vec<f64>, stress: Vec<f64>) -> Result<Self, MechError> {
        if time.len() != strain.len() || time.len() != stress.len() {
            return Err(MechError::InvalidSeries(format!(
                "merged curve lengths differ: time={}, strain={}, stress={}",
                time.len(),
                strain.len(),
                stress.len()
            )));
        }
        if time.len() < 2 {
            return Err(MechError::InsufficientData(format!(
                "a merged curve needs at least 2 points, got {}",
                time.len()
            )));
        }
        Ok(Self { time, strain, stress })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn strain(&self) -> &[f64] {
        &self.strain
    }

    pub fn stress(&self) -> &[f64] {
        &self.stress
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Which time grid the merged curve is sampled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeGrid {
    /// The series with more samples inside the overlap is the master grid.
    /// The overlap bounds are added as endpoints.
    Denser,
    /// Sorted union of both grids, clipped to the overlap.
    Union,
}

/// Target metric minimized by the elastic refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizeOn {
    /// ASTM E111 coefficient of variation of the fit (lower is better).
    Covariance,
    /// `1 - R²`.
    RSquared,
}

impl OptimizeOn {
    /// Value to minimize for a fit with the given statistics.
    pub fn target(self, covariance: f64, r_squared: f64) -> f64 {
        match self {
            OptimizeOn::Covariance => covariance,
            OptimizeOn::RSquared => 1.0 - r_squared,
        }
    }
}

/// How the refinement escapes a fit that did not improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PerturbationKind {
    /// Seeded coin-flip between dilation and erosion of the inlier mask.
    Random,
    /// Leave the mask untouched (fully deterministic refinement).
    None,
}

/// How a manual (two-point) pick selects the elastic points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualSelection {
    /// Points whose strain lies between the two picks.
    StrainBounds,
    /// Points within `rtol * max|stress|` of the picked line.
    Band { rtol: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub grid: MergeGrid,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            grid: MergeGrid::Denser,
        }
    }
}

/// Hough transform and peak search settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Number of angle bins.
    pub nq: usize,
    /// Number of distance bins.
    pub nr: usize,
    /// Angle domain (radians) covered by the `nq` bins.
    pub theta_range: (f64, f64),
    /// Lower bound (degrees) of the elastic-peak search window.
    pub search_lower_deg: f64,
    /// Upper bound (degrees) of the elastic-peak search window.
    pub search_upper_deg: f64,
    /// Block size used to coarsen the vote grid before smoothing.
    pub resample_factor: usize,
    pub smoothing_passes: usize,
    pub smoothing_sigma: f64,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            nq: 1801,
            nr: 1801,
            theta_range: (0.0, PI),
            search_lower_deg: 60.0,
            search_upper_deg: 90.0,
            resample_factor: 2,
            smoothing_passes: 3,
            smoothing_sigma: 3.0,
        }
    }
}

impl HoughConfig {
    pub fn validate(&self) -> Result<(), MechError> {
        if self.nq < 2 || self.nr < 2 {
            return Err(MechError::InvalidParameter(format!(
                "Hough grid must be at least 2x2 (got nq={}, nr={})",
                self.nq, self.nr
            )));
        }
        let (lo, hi) = self.theta_range;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(MechError::InvalidParameter(format!(
                "invalid theta range ({lo}, {hi})"
            )));
        }
        let (qlo, qhi) = (self.search_lower_deg, self.search_upper_deg);
        let (dlo, dhi) = (lo.to_degrees(), hi.to_degrees());
        if !(qlo.is_finite() && qhi.is_finite() && qhi > qlo && qlo >= dlo - 1e-9 && qhi <= dhi + 1e-9) {
            return Err(MechError::InvalidParameter(format!(
                "search window {qlo}..{qhi} deg must be non-empty and inside {dlo:.3}..{dhi:.3} deg"
            )));
        }
        if self.resample_factor == 0 {
            return Err(MechError::InvalidParameter("resample factor must be >= 1".into()));
        }
        if !(self.smoothing_sigma.is_finite() && self.smoothing_sigma >= 0.0) {
            return Err(MechError::InvalidParameter(format!(
                "smoothing sigma must be finite and >= 0 (got {})",
                self.smoothing_sigma
            )));
        }
        Ok(())
    }
}

/// Elastic refinement settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Strain gage measurement error; residual strains inside it count as linear.
    pub error_tolerance: f64,
    pub max_iterations: usize,
    pub optimize_on: OptimizeOn,
    pub perturbation: PerturbationKind,
    /// Seed for the perturbation RNG.
    pub seed: u64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            error_tolerance: 5e-5,
            max_iterations: 20,
            optimize_on: OptimizeOn::Covariance,
            perturbation: PerturbationKind::Random,
            seed: 42,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<(), MechError> {
        if !(self.error_tolerance.is_finite() && self.error_tolerance > 0.0) {
            return Err(MechError::InvalidParameter(format!(
                "error tolerance must be finite and > 0 (got {})",
                self.error_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(MechError::InvalidParameter("max iterations must be >= 1".into()));
        }
        Ok(())
    }
}

/// A full analysis configuration.
///
/// Loaded from an optional JSON file, then overridden by CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub merge: MergeConfig,
    pub hough: HoughConfig,
    pub refine: RefineConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), MechError> {
        self.hough.validate()?;
        self.refine.validate()
    }
}

/// Hough-specific by-products of the automatic approximation.
#[derive(Debug, Clone)]
pub struct HoughDiagnostics {
    /// Peak angle (radians).
    pub theta: f64,
    /// Peak distance in normalized coordinates.
    pub distance: f64,
    /// Peak position (row, column) in the smoothed grid.
    pub peak: (f64, f64),
    /// Smoothed, resampled vote grid (rows = angle).
    pub resampled: DMatrix<f64>,
}

/// First estimate of the linear-elastic segment.
///
/// Produced by every `RegionApproximator` and consumed by the refinement.
#[derive(Debug, Clone)]
pub struct ElasticRegionEstimate {
    pub modulus: f64,
    pub onset_strain: f64,
    /// Indices into the merged curve of the points kept as elastic.
    pub indices: Vec<usize>,
    pub elastic_strain: Vec<f64>,
    pub elastic_stress: Vec<f64>,
    /// Present for the Hough approximator; `None` for manual picks.
    pub hough: Option<HoughDiagnostics>,
}

impl ElasticRegionEstimate {
    /// Intercept of `stress = modulus * strain + intercept`.
    pub fn intercept(&self) -> f64 {
        -self.modulus * self.onset_strain
    }

    pub fn len(&self) -> usize {
        self.elastic_strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elastic_strain.is_empty()
    }
}

/// Best elastic fit found by the refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub modulus: f64,
    pub onset_strain: f64,
    pub intercept: f64,
    pub standard_error_of_slope: f64,
    pub coefficient_of_determination: f64,
    pub coefficient_of_variation: f64,
    /// Inlier flags over the estimate's elastic points.
    pub inlier_mask: Vec<bool>,
    pub iterations_used: usize,
    /// Iteration that produced this fit (0 = the initial estimate).
    pub best_iteration: usize,
    pub elastic_strain: Vec<f64>,
    pub elastic_stress: Vec<f64>,
}

impl FitResult {
    pub fn inlier_count(&self) -> usize {
        self.inlier_mask.iter().filter(|&&m| m).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_non_increasing_time() {
        let err = Series::new(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]).unwrap_err();
        assert!(matches!(err, MechError::InvalidSeries(_)), "got {err:?}");
    }

    #[test]
    fn series_requires_two_samples() {
        let err = Series::new(vec![0.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, MechError::InsufficientData(_)), "got {err:?}");
    }

    #[test]
    fn merged_curve_rejects_ragged_columns() {
        let err = MergedCurve::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, MechError::InvalidSeries(_)));
    }

    #[test]
    fn default_config_is_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn search_window_outside_theta_range_is_rejected() {
        let cfg = HoughConfig {
            search_lower_deg: 60.0,
            search_upper_deg: 200.0,
            ..HoughConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_deserializes_partial_json() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"refine": {"max_iterations": 7, "optimize_on": "r-squared"}}"#).unwrap();
        assert_eq!(cfg.refine.max_iterations, 7);
        assert_eq!(cfg.refine.optimize_on, OptimizeOn::RSquared);
        assert_eq!(cfg.hough.nq, 1801);
        assert!((cfg.refine.error_tolerance - 5e-5).abs() < 1e-15);
    }
}
