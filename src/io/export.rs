//! Result exports.
//!
//! - JSON report: configuration, approximation, elastic fit statistics and
//!   derived properties, stamped with the generation time
//! - per-point CSV: the merged curve with an inlier flag, easy to consume in
//!   spreadsheets or downstream scripts

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnalysisConfig, ElasticRegionEstimate, FitResult, MergedCurve};
use crate::error::AppError;
use crate::models::MechanicalSummary;

/// How the elastic region was first approximated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximationSummary {
    pub method: String,
    pub modulus: f64,
    pub onset_strain: f64,
    pub points: usize,
    /// Hough peak angle in degrees (automatic approximation only).
    pub peak_theta_deg: Option<f64>,
    pub peak_distance: Option<f64>,
}

/// Statistics of the refined elastic fit, without the point arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub modulus: f64,
    pub onset_strain: f64,
    pub intercept: f64,
    pub standard_error_of_slope: f64,
    pub coefficient_of_determination: f64,
    pub coefficient_of_variation: f64,
    pub inliers: usize,
    pub iterations_used: usize,
    pub best_iteration: usize,
}

/// JSON report schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub config: AnalysisConfig,
    pub approximation: ApproximationSummary,
    pub fit: FitSummary,
    pub properties: MechanicalSummary,
}

impl AnalysisReport {
    pub fn new(
        config: &AnalysisConfig,
        estimate: &ElasticRegionEstimate,
        fit: &FitResult,
        properties: &MechanicalSummary,
    ) -> Self {
        let (method, peak_theta_deg, peak_distance) = match &estimate.hough {
            Some(h) => ("hough", Some(h.theta.to_degrees()), Some(h.distance)),
            None => ("manual", None, None),
        };
        Self {
            tool: "tensile".to_string(),
            generated_at: Utc::now(),
            config: *config,
            approximation: ApproximationSummary {
                method: method.to_string(),
                modulus: estimate.modulus,
                onset_strain: estimate.onset_strain,
                points: estimate.len(),
                peak_theta_deg,
                peak_distance,
            },
            fit: FitSummary {
                modulus: fit.modulus,
                onset_strain: fit.onset_strain,
                intercept: fit.intercept,
                standard_error_of_slope: fit.standard_error_of_slope,
                coefficient_of_determination: fit.coefficient_of_determination,
                coefficient_of_variation: fit.coefficient_of_variation,
                inliers: fit.inlier_count(),
                iterations_used: fit.iterations_used,
                best_iteration: fit.best_iteration,
            },
            properties: *properties,
        }
    }
}

/// Write the JSON report.
pub fn write_report_json(path: &Path, report: &AnalysisReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a JSON report back.
pub fn read_report_json(path: &Path) -> Result<AnalysisReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))
}

#[derive(Debug, Serialize)]
struct PointRow {
    time: f64,
    strain: f64,
    stress: f64,
    inlier: bool,
}

/// Write the merged curve, one row per point, with its inlier flag.
pub fn write_points_csv(path: &Path, curve: &MergedCurve, inliers: &[bool]) -> Result<(), AppError> {
    if inliers.len() != curve.len() {
        return Err(AppError::new(
            4,
            format!("inlier flags ({}) do not match the curve ({})", inliers.len(), curve.len()),
        ));
    }
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for (i, &inlier) in inliers.iter().enumerate() {
        writer
            .serialize(PointRow {
                time: curve.time()[i],
                strain: curve.strain()[i],
                stress: curve.stress()[i],
                inlier,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
