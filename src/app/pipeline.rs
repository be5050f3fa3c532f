//! Shared analysis pipeline used by the `analyze` and `demo` commands.
//!
//! merge -> approximate the elastic region -> refine -> derived properties
//!
//! The commands only differ in where the channels come from and how the
//! elastic region is approximated.

use tracing::info;

use crate::data::{SampleSpec, TensileSample, generate_tensile_sample};
use crate::domain::{AnalysisConfig, ElasticRegionEstimate, FitResult, Series};
use crate::error::MechError;
use crate::fit::{HoughApproximator, RegionApproximator, set_elastic};
use crate::models::{MechanicalProperties, MechanicalSummary};

/// All computed outputs of one analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub model: MechanicalProperties,
    pub estimate: ElasticRegionEstimate,
    pub fit: FitResult,
    pub summary: MechanicalSummary,
}

impl AnalysisOutput {
    /// Inlier flags over the merged curve (the fit itself only covers the
    /// estimate's points).
    pub fn curve_inliers(&self) -> Vec<bool> {
        let mut flags = vec![false; self.model.curve().len()];
        for (&idx, &inlier) in self.estimate.indices.iter().zip(self.fit.inlier_mask.iter()) {
            if inlier {
                flags[idx] = true;
            }
        }
        flags
    }
}

/// Run the full analysis over two channels.
pub fn analyze<A>(
    strain: &Series,
    stress: &Series,
    config: &AnalysisConfig,
    approximator: &mut A,
) -> Result<AnalysisOutput, MechError>
where
    A: RegionApproximator + ?Sized,
{
    config.validate()?;

    let mut model = MechanicalProperties::from_series(strain, stress, config.merge.grid)?;
    info!(
        strain_samples = strain.len(),
        stress_samples = stress.len(),
        merged = model.curve().len(),
        grid = ?config.merge.grid,
        "merged channels"
    );

    let estimate = approximator.approximate(model.curve())?;
    info!(
        modulus = estimate.modulus,
        onset = estimate.onset_strain,
        points = estimate.len(),
        "approximated elastic region"
    );

    let fit = set_elastic(&mut model, &estimate, &config.refine)?;
    let summary = model.summary()?;
    info!(
        yield_stress = summary.yield_stress,
        ultimate_stress = summary.ultimate_stress,
        ductility = summary.ductility,
        "derived mechanical properties"
    );

    Ok(AnalysisOutput {
        model,
        estimate,
        fit,
        summary,
    })
}

/// Generate a synthetic test and analyze it with the Hough approximator.
pub fn analyze_sample(spec: &SampleSpec, config: &AnalysisConfig) -> Result<(TensileSample, AnalysisOutput), MechError> {
    let sample = generate_tensile_sample(spec)?;
    let mut approximator = HoughApproximator::new(config.hough);
    let output = analyze(&sample.strain, &sample.stress, config, &mut approximator)?;
    Ok((sample, output))
}
