//! Synthetic tensile test generation.
//!
//! Produces a strain channel and a stress channel sampled on independent
//! clocks, the way an extensometer and a load cell record a real test.
//! Loading is slow through the elastic ramp (stress-rate control) and fast
//! afterwards (strain-rate control), so most samples sit on the elastic line.
//!
//! Material response as a function of total strain `e`:
//!
//! - toe: zero stress until `onset`
//! - linear elastic: `E (e - onset)` up to `yield_stress`
//! - Voce hardening: `sy + (su - sy)(1 - exp(-ep / k))`, with plastic strain
//!   `ep = e - onset - s / E` (solved implicitly)
//! - necking: stress falls off quadratically from `necking_strain` to
//!   `fracture_strain`, losing `fracture_drop` of its value

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{ELASTIC_OFFSET, Series};
use crate::error::MechError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSpec {
    pub modulus: f64,
    pub onset: f64,
    pub yield_stress: f64,
    pub ultimate_stress: f64,
    /// Voce saturation strain `k`.
    pub hardening_strain: f64,
    pub necking_strain: f64,
    pub fracture_strain: f64,
    /// Fraction of stress lost between necking and fracture.
    pub fracture_drop: f64,
    /// Time at which the elastic limit is reached.
    pub elastic_time: f64,
    /// Test duration; fracture happens at the end.
    pub duration: f64,
    pub strain_window: (f64, f64),
    pub stress_window: (f64, f64),
    pub strain_samples: usize,
    pub stress_samples: usize,
    pub strain_noise: f64,
    pub stress_noise: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            modulus: 200_000.0,
            onset: 1e-4,
            yield_stress: 500.0,
            ultimate_stress: 900.0,
            hardening_strain: 0.01,
            necking_strain: 0.08,
            fracture_strain: 0.12,
            fracture_drop: 0.15,
            elastic_time: 30.0,
            duration: 120.0,
            strain_window: (0.05, 120.0),
            stress_window: (0.0, 119.5),
            strain_samples: 1000,
            stress_samples: 2400,
            strain_noise: 2e-6,
            stress_noise: 0.5,
            seed: 7,
        }
    }
}

impl SampleSpec {
    pub fn validate(&self) -> Result<(), MechError> {
        let positive = [
            ("modulus", self.modulus),
            ("yield stress", self.yield_stress),
            ("hardening strain", self.hardening_strain),
            ("duration", self.duration),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(MechError::InvalidParameter(format!("{name} must be > 0 (got {v})")));
            }
        }
        if !(self.onset >= 0.0 && self.ultimate_stress > self.yield_stress) {
            return Err(MechError::InvalidParameter(
                "need onset >= 0 and ultimate stress > yield stress".into(),
            ));
        }
        let elastic_limit = self.elastic_limit();
        if !(self.necking_strain > elastic_limit && self.fracture_strain > self.necking_strain) {
            return Err(MechError::InvalidParameter(format!(
                "strain milestones must satisfy {elastic_limit:.5} < necking ({}) < fracture ({})",
                self.necking_strain, self.fracture_strain
            )));
        }
        if !(self.elastic_time > 0.0 && self.elastic_time < self.duration) {
            return Err(MechError::InvalidParameter(format!(
                "elastic time must lie inside (0, {}) (got {})",
                self.duration, self.elastic_time
            )));
        }
        if !(0.0..1.0).contains(&self.fracture_drop) {
            return Err(MechError::InvalidParameter(format!(
                "fracture drop must be in [0, 1) (got {})",
                self.fracture_drop
            )));
        }
        for (name, (lo, hi)) in [("strain", self.strain_window), ("stress", self.stress_window)] {
            if !(lo >= 0.0 && hi > lo && hi <= self.duration) {
                return Err(MechError::InvalidParameter(format!(
                    "{name} window ({lo}, {hi}) must lie inside [0, {}]",
                    self.duration
                )));
            }
        }
        if self.strain_samples < 2 || self.stress_samples < 2 {
            return Err(MechError::InvalidParameter("each channel needs at least 2 samples".into()));
        }
        if !(self.strain_noise >= 0.0 && self.stress_noise >= 0.0) {
            return Err(MechError::InvalidParameter("noise levels must be >= 0".into()));
        }
        Ok(())
    }

    /// Strain at the end of the linear-elastic ramp.
    pub fn elastic_limit(&self) -> f64 {
        self.onset + self.yield_stress / self.modulus
    }

    /// Total strain at time `t`: two constant-rate segments.
    pub fn strain_at_time(&self, t: f64) -> f64 {
        let limit = self.elastic_limit();
        if t <= self.elastic_time {
            limit * t / self.elastic_time
        } else {
            limit + (self.fracture_strain - limit) * (t - self.elastic_time) / (self.duration - self.elastic_time)
        }
    }

    /// Noise-free stress for a total strain.
    pub fn stress_at(&self, strain: f64) -> f64 {
        if strain <= self.onset {
            return 0.0;
        }
        if strain > self.necking_strain {
            let peak = self.hardening_stress(self.necking_strain);
            let u = (strain - self.necking_strain) / (self.fracture_strain - self.necking_strain);
            return peak * (1.0 - self.fracture_drop * u * u);
        }
        self.hardening_stress(strain)
    }

    /// 0.2% offset yield stress of the noise-free material law.
    pub fn offset_yield_stress(&self) -> f64 {
        self.voce(ELASTIC_OFFSET)
    }

    fn voce(&self, plastic_strain: f64) -> f64 {
        self.yield_stress
            + (self.ultimate_stress - self.yield_stress) * (1.0 - (-plastic_strain / self.hardening_strain).exp())
    }

    fn hardening_stress(&self, strain: f64) -> f64 {
        let elastic = self.modulus * (strain - self.onset);
        if elastic <= self.yield_stress {
            return elastic;
        }
        // Bisection on g(s) = voce(e - onset - s/E) - s, decreasing in s.
        let (mut lo, mut hi) = (self.yield_stress, elastic.min(self.ultimate_stress));
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            let plastic = strain - self.onset - mid / self.modulus;
            if self.voce(plastic.max(0.0)) > mid {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

/// Strain and stress channels of one synthetic test.
#[derive(Debug, Clone)]
pub struct TensileSample {
    pub strain: Series,
    pub stress: Series,
    pub spec: SampleSpec,
}

pub fn generate_tensile_sample(spec: &SampleSpec) -> Result<TensileSample, MechError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let strain_noise = Normal::new(0.0, spec.strain_noise)
        .map_err(|e| MechError::InvalidParameter(format!("strain noise distribution: {e}")))?;
    let stress_noise = Normal::new(0.0, spec.stress_noise)
        .map_err(|e| MechError::InvalidParameter(format!("stress noise distribution: {e}")))?;

    let strain_time = linspace(spec.strain_window, spec.strain_samples);
    let strain_values = strain_time
        .iter()
        .map(|&t| spec.strain_at_time(t) + strain_noise.sample(&mut rng))
        .collect();

    let stress_time = linspace(spec.stress_window, spec.stress_samples);
    let stress_values = stress_time
        .iter()
        .map(|&t| spec.stress_at(spec.strain_at_time(t)) + stress_noise.sample(&mut rng))
        .collect();

    Ok(TensileSample {
        strain: Series::new(strain_time, strain_values)?,
        stress: Series::new(stress_time, stress_values)?,
        spec: *spec,
    })
}

fn linspace((lo, hi): (f64, f64), n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    let mut v: Vec<f64> = (0..n).map(|i| lo + i as f64 * step).collect();
    v[n - 1] = hi;
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_law_is_continuous_at_yield_and_necking() {
        let spec = SampleSpec::default();
        let ey = spec.elastic_limit();
        assert!((spec.stress_at(ey) - spec.yield_stress).abs() < 1e-6);
        assert!((spec.stress_at(ey + 1e-9) - spec.yield_stress).abs() < 1e-3);

        let before = spec.stress_at(spec.necking_strain - 1e-9);
        let after = spec.stress_at(spec.necking_strain + 1e-9);
        assert!((before - after).abs() < 1e-3);
        assert_eq!(spec.stress_at(0.5 * spec.onset), 0.0);
    }

    #[test]
    fn hardening_satisfies_the_voce_relation() {
        let spec = SampleSpec::default();
        for &e in &[0.003, 0.01, 0.05] {
            let s = spec.stress_at(e);
            let plastic = e - spec.onset - s / spec.modulus;
            assert!((spec.voce(plastic) - s).abs() < 1e-6, "e={e}: s={s}");
        }
    }

    #[test]
    fn loading_profile_hits_its_milestones() {
        let spec = SampleSpec::default();
        assert_eq!(spec.strain_at_time(0.0), 0.0);
        assert!((spec.strain_at_time(spec.elastic_time) - spec.elastic_limit()).abs() < 1e-15);
        assert!((spec.strain_at_time(spec.duration) - spec.fracture_strain).abs() < 1e-15);
    }

    #[test]
    fn offset_yield_lies_on_the_curve() {
        let spec = SampleSpec::default();
        let sy = spec.offset_yield_stress();
        let e = spec.onset + sy / spec.modulus + ELASTIC_OFFSET;
        assert!((spec.stress_at(e) - sy).abs() < 1e-6);
        assert!((sy - 572.5).abs() < 0.1, "got {sy}");
    }

    #[test]
    fn generation_is_deterministic_and_shaped_per_channel() {
        let spec = SampleSpec::default();
        let a = generate_tensile_sample(&spec).unwrap();
        let b = generate_tensile_sample(&spec).unwrap();
        assert_eq!(a.strain.values(), b.strain.values());
        assert_eq!(a.stress.values(), b.stress.values());
        assert_eq!(a.strain.len(), spec.strain_samples);
        assert_eq!(a.stress.len(), spec.stress_samples);
        assert_eq!(a.strain.span(), spec.strain_window);

        let other = generate_tensile_sample(&SampleSpec { seed: 8, ..spec }).unwrap();
        assert_ne!(a.stress.values(), other.stress.values());
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let spec = SampleSpec {
            ultimate_stress: 100.0,
            ..SampleSpec::default()
        };
        assert!(matches!(generate_tensile_sample(&spec), Err(MechError::InvalidParameter(_))));
        let spec = SampleSpec {
            stress_window: (0.0, 500.0),
            ..SampleSpec::default()
        };
        assert!(generate_tensile_sample(&spec).is_err());
    }
}
