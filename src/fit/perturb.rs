//! Mask perturbation used by the refinement to leave a shallow optimum.
//!
//! The randomness source lives inside the strategy, seeded by the caller, so
//! a refinement run is reproducible end to end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::PerturbationKind;
use crate::math::filter::{dilate, erode};

/// Inlier counts below this always dilate.
const MIN_INLIERS_FOR_EROSION: usize = 10;
/// Morphology repetitions per perturbation.
const MORPHOLOGY_ITERATIONS: usize = 2;

pub trait MaskPerturbation {
    fn perturb(&mut self, mask: &[bool]) -> Vec<bool>;
}

/// Coin flip between growing and shrinking the inlier mask.
///
/// Small masks (fewer than 10 inliers) always grow.
#[derive(Debug, Clone)]
pub struct RandomMorphology {
    rng: StdRng,
}

impl RandomMorphology {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl MaskPerturbation for RandomMorphology {
    fn perturb(&mut self, mask: &[bool]) -> Vec<bool> {
        let inliers = mask.iter().filter(|&&m| m).count();
        if inliers < MIN_INLIERS_FOR_EROSION || self.rng.r#gen::<f64>() > 0.5 {
            dilate(mask, MORPHOLOGY_ITERATIONS)
        } else {
            erode(mask, MORPHOLOGY_ITERATIONS)
        }
    }
}

/// Leaves the mask untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPerturbation;

impl MaskPerturbation for NoPerturbation {
    fn perturb(&mut self, mask: &[bool]) -> Vec<bool> {
        mask.to_vec()
    }
}

pub fn perturbation_for(kind: PerturbationKind, seed: u64) -> Box<dyn MaskPerturbation> {
    match kind {
        PerturbationKind::Random => Box::new(RandomMorphology::seeded(seed)),
        PerturbationKind::None => Box::new(NoPerturbation),
    }
}
