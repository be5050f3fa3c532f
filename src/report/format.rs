//! Formatted terminal output.
//!
//! Formatting lives in one place so output changes stay local and the
//! fitting code stays free of presentation concerns.

use crate::domain::{ElasticRegionEstimate, FitResult, MergedCurve};
use crate::models::MechanicalSummary;

/// Full text summary of one analysis.
pub fn format_analysis(
    curve: &MergedCurve,
    estimate: &ElasticRegionEstimate,
    fit: &FitResult,
    summary: &MechanicalSummary,
) -> String {
    let mut out = String::new();

    out.push_str("=== tensile - Mechanical Properties ===\n");
    if let (Some(&t0), Some(&t1)) = (curve.time().first(), curve.time().last()) {
        out.push_str(&format!("Curve: n={} | time=[{t0:.3}, {t1:.3}]\n", curve.len()));
    }

    out.push_str("\nElastic approximation:\n");
    match &estimate.hough {
        Some(h) => out.push_str(&format!(
            "- method: hough (theta={:.3} deg, d={:.4})\n",
            h.theta.to_degrees(),
            h.distance
        )),
        None => out.push_str("- method: manual\n"),
    }
    out.push_str(&format!(
        "- E={} | onset={:.6} | points={}\n",
        fmt_stress(estimate.modulus),
        estimate.onset_strain,
        estimate.len()
    ));

    out.push_str("\nElastic fit:\n");
    out.push_str(&format!(
        "- E={} +/- {} | onset={:.6}\n",
        fmt_stress(fit.modulus),
        fmt_stress(fit.standard_error_of_slope),
        fit.onset_strain
    ));
    out.push_str(&format!(
        "- R2={:.6} | CoV={:.4}% | inliers={}/{}\n",
        fit.coefficient_of_determination,
        fit.coefficient_of_variation,
        fit.inlier_count(),
        fit.inlier_mask.len()
    ));
    out.push_str(&format!(
        "- best iteration {} of {}\n",
        fit.best_iteration, fit.iterations_used
    ));

    out.push_str("\nProperties:\n");
    let rows = [
        ("yield stress (0.2%)", fmt_stress(summary.yield_stress)),
        ("yield strain", fmt_strain(summary.yield_strain)),
        ("ultimate stress", fmt_stress(summary.ultimate_stress)),
        ("necking onset", fmt_strain(summary.necking_onset)),
        ("fracture stress", fmt_stress(summary.fracture_stress)),
        ("total elongation", fmt_strain(summary.total_elongation)),
        ("ductility", fmt_strain(summary.ductility)),
        ("toughness", fmt_stress(summary.toughness)),
    ];
    for (name, value) in rows {
        out.push_str(&format!("  {name:<20} {value:>14}\n"));
    }

    out
}

fn fmt_stress(v: f64) -> String {
    if v.abs() >= 1e5 {
        format!("{v:.4e}")
    } else {
        format!("{v:.3}")
    }
}

fn fmt_strain(v: f64) -> String {
    format!("{v:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_switches_to_scientific_for_moduli() {
        assert_eq!(fmt_stress(572.456), "572.456");
        assert_eq!(fmt_stress(2.0e5), "2.0000e5");
        assert_eq!(fmt_strain(0.00475), "0.004750");
    }

    #[test]
    fn analysis_summary_lists_every_property() {
        let curve = MergedCurve::new(vec![0.0, 1.0, 2.0], vec![0.0, 1e-3, 2e-3], vec![0.0, 100.0, 150.0]).unwrap();
        let estimate = ElasticRegionEstimate {
            modulus: 1e5,
            onset_strain: 0.0,
            indices: vec![0, 1],
            elastic_strain: vec![0.0, 1e-3],
            elastic_stress: vec![0.0, 100.0],
            hough: None,
        };
        let fit = FitResult {
            modulus: 1e5,
            onset_strain: 0.0,
            intercept: 0.0,
            standard_error_of_slope: 0.0,
            coefficient_of_determination: 1.0,
            coefficient_of_variation: 0.0,
            inlier_mask: vec![true, true],
            iterations_used: 20,
            best_iteration: 1,
            elastic_strain: vec![0.0, 1e-3],
            elastic_stress: vec![0.0, 100.0],
        };
        let summary = MechanicalSummary {
            elastic_modulus: 1e5,
            elastic_onset: 0.0,
            yield_stress: 150.0,
            yield_strain: 3.5e-3,
            plastic_onset: 3.5e-3,
            ultimate_stress: 150.0,
            necking_onset: 2e-3,
            fracture_stress: 150.0,
            total_elongation: 2e-3,
            ductility: 5e-4,
            toughness: 0.225,
        };

        let txt = format_analysis(&curve, &estimate, &fit, &summary);
        assert!(txt.contains("Curve: n=3 | time=[0.000, 2.000]"), "{txt}");
        assert!(txt.contains("- method: manual"));
        assert!(txt.contains("inliers=2/2"));
        for name in ["yield stress (0.2%)", "ultimate stress", "ductility", "toughness"] {
            assert!(txt.contains(name), "missing {name}:\n{txt}");
        }
    }
}
