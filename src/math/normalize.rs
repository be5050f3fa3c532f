//! Affine rescaling onto `[0, 1]`.
//!
//! Stress and strain live on wildly different scales (hundreds of MPa vs.
//! fractions of a percent), so the Hough transform works on both axes
//! rescaled to the unit interval. The transform is kept so results can be
//! mapped back.

use crate::error::MechError;

/// `x -> (x - lower) / (upper - lower)` and its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    lower: f64,
    upper: f64,
}

impl Normalizer {
    /// Build from explicit bounds. Fails when the domain is empty.
    pub fn from_bounds(lower: f64, upper: f64) -> Result<Self, MechError> {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(MechError::Domain(format!(
                "normalization bounds must be finite (got {lower}, {upper})"
            )));
        }
        if upper == lower {
            return Err(MechError::Domain(format!(
                "degenerate normalization domain: lower == upper == {lower}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Build from the min/max of `values`.
    pub fn from_values(values: &[f64]) -> Result<Self, MechError> {
        if values.is_empty() {
            return Err(MechError::Domain("cannot normalize an empty vector".into()));
        }
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Self::from_bounds(lo, hi)
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// `upper - lower`.
    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn normalize(&self, x: f64) -> f64 {
        (x - self.lower) / self.range()
    }

    pub fn unnormalize(&self, x_norm: f64) -> f64 {
        x_norm * self.range() + self.lower
    }

    pub fn normalize_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.normalize(v)).collect()
    }

    pub fn unnormalize_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.unnormalize(v)).collect()
    }
}

/// A vector together with its normalized copy.
#[derive(Debug, Clone)]
pub struct Normalized {
    original: Vec<f64>,
    scaled: Vec<f64>,
    normalizer: Normalizer,
}

impl Normalized {
    /// Normalize `values` by their own min/max.
    pub fn new(values: &[f64]) -> Result<Self, MechError> {
        let normalizer = Normalizer::from_values(values)?;
        Ok(Self::with_normalizer(values, normalizer))
    }

    pub fn with_normalizer(values: &[f64], normalizer: Normalizer) -> Self {
        Self {
            original: values.to_vec(),
            scaled: normalizer.normalize_all(values),
            normalizer,
        }
    }

    /// Values in the original units.
    pub fn unscaled(&self) -> &[f64] {
        &self.original
    }

    /// Values mapped onto `[0, 1]` (for self-derived bounds).
    pub fn scaled(&self) -> &[f64] {
        &self.scaled
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_normalized_vector_spans_unit_interval() {
        let n = Normalized::new(&[3.0, -1.0, 7.0, 2.5]).unwrap();
        let lo = n.scaled().iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = n.scaled().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
        assert_eq!(n.unscaled(), &[3.0, -1.0, 7.0, 2.5]);
    }

    #[test]
    fn round_trip_preserves_values() {
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin() * 1e3 + 12.0).collect();
        for &(lo, hi) in &[(-5.0, 5.0), (0.0, 1e-4), (1e3, 1e6), (2.0, -3.0)] {
            let n = Normalizer::from_bounds(lo, hi).unwrap();
            let back = n.unnormalize_all(&n.normalize_all(&values));
            assert_eq!(back.len(), values.len());
            for (&v, &b) in values.iter().zip(back.iter()) {
                assert_eq!(b, n.unnormalize(n.normalize(v)));
                let tol = 1e-9 * v.abs().max(lo.abs()).max(hi.abs()).max(1.0);
                assert!((b - v).abs() <= tol, "{v} -> {b} for bounds ({lo}, {hi})");
            }
        }
    }

    #[test]
    fn degenerate_bounds_are_a_domain_error() {
        assert!(matches!(Normalizer::from_bounds(2.0, 2.0), Err(MechError::Domain(_))));
        assert!(matches!(Normalized::new(&[4.0, 4.0, 4.0]), Err(MechError::Domain(_))));
        assert!(matches!(Normalized::new(&[]), Err(MechError::Domain(_))));
    }
}
