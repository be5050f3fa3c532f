//! Mechanical properties derived from a merged curve and its elastic fit.
//!
//! Every derived property is a pure function of the curve and the
//! `(modulus, onset)` pair. Nothing is cached, so values always follow the
//! current elastic properties. Each getter fails with `Precondition` while
//! the modulus or onset is unset.

use serde::{Deserialize, Serialize};

use crate::data::merge;
use crate::domain::{ELASTIC_OFFSET, MergeGrid, MergedCurve, Series};
use crate::error::{ElasticField, MechError};
use crate::math::trapezoid;

/// Elastic modulus and onset strain, each unset until a fit assigns it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElasticProperties {
    pub modulus: Option<f64>,
    pub onset: Option<f64>,
}

impl ElasticProperties {
    pub fn new(modulus: f64, onset: f64) -> Self {
        Self {
            modulus: Some(modulus),
            onset: Some(onset),
        }
    }

    /// `(modulus, onset)`, or a precondition error naming the first missing field.
    pub fn require(&self, property: &'static str) -> Result<(f64, f64), MechError> {
        let modulus = self.modulus.ok_or(MechError::Precondition {
            field: ElasticField::Modulus,
            property,
        })?;
        let onset = self.onset.ok_or(MechError::Precondition {
            field: ElasticField::Onset,
            property,
        })?;
        Ok((modulus, onset))
    }
}

fn first_argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// 0.2% offset yield stress.
///
/// Over the points with strain above the onset, the offset line is
/// `E (e - onset - 0.002)`. Scanning back from the second-to-last point, the
/// first point not below the line brackets the crossing with its successor;
/// the yield stress is their mean stress.
pub fn yield_stress(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    let (modulus, onset) = elastic.require("yield stress")?;
    let (strain, stress): (Vec<f64>, Vec<f64>) = curve
        .strain()
        .iter()
        .zip(curve.stress().iter())
        .filter(|&(&e, _)| e > onset)
        .map(|(&e, &s)| (e, s))
        .unzip();
    let below: Vec<bool> = strain
        .iter()
        .zip(stress.iter())
        .map(|(&e, &s)| s < modulus * (e - onset - ELASTIC_OFFSET))
        .collect();
    (0..below.len().saturating_sub(1))
        .rev()
        .find(|&i| !below[i])
        .map(|i| 0.5 * (stress[i] + stress[i + 1]))
        .ok_or(MechError::YieldNotFound)
}

/// `yield_stress / E + 0.002`.
pub fn yield_strain(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    let (modulus, _) = elastic.require("yield strain")?;
    Ok(yield_stress(curve, elastic)? / modulus + ELASTIC_OFFSET)
}

/// Alias of the yield strain.
pub fn plastic_onset(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    elastic.require("plastic onset")?;
    yield_strain(curve, elastic)
}

pub fn ultimate_stress(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    elastic.require("ultimate stress")?;
    Ok(curve.stress()[first_argmax(curve.stress())])
}

/// Strain at the (first) maximum stress, measured from the onset.
pub fn necking_onset(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    let (_, onset) = elastic.require("necking onset")?;
    Ok(curve.strain()[first_argmax(curve.stress())] - onset)
}

/// Stress at the largest recorded strain.
pub fn fracture_stress(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    elastic.require("fracture stress")?;
    Ok(curve.stress()[first_argmax(curve.strain())])
}

pub fn total_elongation(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    let (_, onset) = elastic.require("total elongation")?;
    Ok(curve.strain()[first_argmax(curve.strain())] - onset)
}

/// Total elongation less the elastic strain recovered at fracture.
pub fn ductility(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    let (modulus, _) = elastic.require("ductility")?;
    Ok(total_elongation(curve, elastic)? - fracture_stress(curve, elastic)? / modulus)
}

/// Trapezoidal area under the curve over the points with strain above the onset.
pub fn toughness(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<f64, MechError> {
    let (_, onset) = elastic.require("toughness")?;
    let (strain, stress): (Vec<f64>, Vec<f64>) = curve
        .strain()
        .iter()
        .zip(curve.stress().iter())
        .filter(|&(&e, _)| e > onset)
        .map(|(&e, &s)| (e, s))
        .unzip();
    Ok(trapezoid(&strain, &stress))
}

/// Strains with `onset < e < yield_strain + onset`.
pub fn elastic_region(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<Vec<f64>, MechError> {
    let (_, onset) = elastic.require("elastic region")?;
    let limit = yield_strain(curve, elastic)? + onset;
    Ok(curve.strain().iter().copied().filter(|&e| e > onset && e < limit).collect())
}

/// Strains with `e > yield_strain + onset`.
pub fn plastic_region(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<Vec<f64>, MechError> {
    let (_, onset) = elastic.require("plastic region")?;
    let limit = yield_strain(curve, elastic)? + onset;
    Ok(curve.strain().iter().copied().filter(|&e| e > limit).collect())
}

/// Every derived property in one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanicalSummary {
    pub elastic_modulus: f64,
    pub elastic_onset: f64,
    pub yield_stress: f64,
    pub yield_strain: f64,
    pub plastic_onset: f64,
    pub ultimate_stress: f64,
    pub necking_onset: f64,
    pub fracture_stress: f64,
    pub total_elongation: f64,
    pub ductility: f64,
    pub toughness: f64,
}

pub fn summarize(curve: &MergedCurve, elastic: &ElasticProperties) -> Result<MechanicalSummary, MechError> {
    let (elastic_modulus, elastic_onset) = elastic.require("property summary")?;
    Ok(MechanicalSummary {
        elastic_modulus,
        elastic_onset,
        yield_stress: yield_stress(curve, elastic)?,
        yield_strain: yield_strain(curve, elastic)?,
        plastic_onset: plastic_onset(curve, elastic)?,
        ultimate_stress: ultimate_stress(curve, elastic)?,
        necking_onset: necking_onset(curve, elastic)?,
        fracture_stress: fracture_stress(curve, elastic)?,
        total_elongation: total_elongation(curve, elastic)?,
        ductility: ductility(curve, elastic)?,
        toughness: toughness(curve, elastic)?,
    })
}

/// A merged curve plus write-once elastic properties.
#[derive(Debug, Clone)]
pub struct MechanicalProperties {
    curve: MergedCurve,
    elastic: ElasticProperties,
}

impl MechanicalProperties {
    pub fn new(curve: MergedCurve) -> Self {
        Self {
            curve,
            elastic: ElasticProperties::default(),
        }
    }

    /// Merge the two channels and wrap the result.
    pub fn from_series(strain: &Series, stress: &Series, grid: MergeGrid) -> Result<Self, MechError> {
        Ok(Self::new(merge(strain, stress, grid)?))
    }

    pub fn curve(&self) -> &MergedCurve {
        &self.curve
    }

    pub fn elastic(&self) -> &ElasticProperties {
        &self.elastic
    }

    pub fn elastic_modulus(&self) -> Option<f64> {
        self.elastic.modulus
    }

    pub fn elastic_onset(&self) -> Option<f64> {
        self.elastic.onset
    }

    pub fn set_elastic_modulus(&mut self, modulus: f64) -> Result<(), MechError> {
        if self.elastic.modulus.is_some() {
            return Err(MechError::Reassignment {
                field: ElasticField::Modulus,
            });
        }
        if !(modulus.is_finite() && modulus != 0.0) {
            return Err(MechError::InvalidParameter(format!(
                "elastic modulus must be finite and non-zero (got {modulus})"
            )));
        }
        self.elastic.modulus = Some(modulus);
        Ok(())
    }

    pub fn set_elastic_onset(&mut self, onset: f64) -> Result<(), MechError> {
        if self.elastic.onset.is_some() {
            return Err(MechError::Reassignment {
                field: ElasticField::Onset,
            });
        }
        if !onset.is_finite() {
            return Err(MechError::InvalidParameter(format!("elastic onset must be finite (got {onset})")));
        }
        self.elastic.onset = Some(onset);
        Ok(())
    }

    /// Fails with `Reassignment` if either elastic field is already set.
    pub fn ensure_elastic_unset(&self) -> Result<(), MechError> {
        if self.elastic.modulus.is_some() {
            return Err(MechError::Reassignment {
                field: ElasticField::Modulus,
            });
        }
        if self.elastic.onset.is_some() {
            return Err(MechError::Reassignment {
                field: ElasticField::Onset,
            });
        }
        Ok(())
    }

    /// Forget the elastic fit so a new one can be assigned.
    pub fn clear_elastic(&mut self) {
        self.elastic = ElasticProperties::default();
    }

    pub fn yield_stress(&self) -> Result<f64, MechError> {
        yield_stress(&self.curve, &self.elastic)
    }

    pub fn yield_strain(&self) -> Result<f64, MechError> {
        yield_strain(&self.curve, &self.elastic)
    }

    pub fn plastic_onset(&self) -> Result<f64, MechError> {
        plastic_onset(&self.curve, &self.elastic)
    }

    pub fn ultimate_stress(&self) -> Result<f64, MechError> {
        ultimate_stress(&self.curve, &self.elastic)
    }

    pub fn necking_onset(&self) -> Result<f64, MechError> {
        necking_onset(&self.curve, &self.elastic)
    }

    pub fn fracture_stress(&self) -> Result<f64, MechError> {
        fracture_stress(&self.curve, &self.elastic)
    }

    pub fn total_elongation(&self) -> Result<f64, MechError> {
        total_elongation(&self.curve, &self.elastic)
    }

    pub fn ductility(&self) -> Result<f64, MechError> {
        ductility(&self.curve, &self.elastic)
    }

    pub fn toughness(&self) -> Result<f64, MechError> {
        toughness(&self.curve, &self.elastic)
    }

    pub fn elastic_region(&self) -> Result<Vec<f64>, MechError> {
        elastic_region(&self.curve, &self.elastic)
    }

    pub fn plastic_region(&self) -> Result<Vec<f64>, MechError> {
        plastic_region(&self.curve, &self.elastic)
    }

    pub fn summary(&self) -> Result<MechanicalSummary, MechError> {
        summarize(&self.curve, &self.elastic)
    }
}
