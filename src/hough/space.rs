//! Line-vote accumulator over `(theta, r)`.
//!
//! Each point `(x, y)` votes, for every angle bin `theta`, for the line
//! `x sin(theta) - y cos(theta) = r` through it, i.e.
//! `y = x tan(theta) - r sec(theta)`. Colinear points pile their votes into
//! the same cell.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::HoughConfig;
use crate::error::MechError;

#[derive(Debug, Clone)]
pub struct HoughSpace {
    /// Vote counts, rows = angle bins, columns = distance bins.
    votes: DMatrix<f64>,
    theta_range: (f64, f64),
    r_range: (f64, f64),
}

impl HoughSpace {
    /// Accumulate votes for the point cloud `(x, y)`.
    ///
    /// The `nr` distance bins span the observed min/max of `r` over all
    /// points and angles.
    pub fn build(x: &[f64], y: &[f64], config: &HoughConfig) -> Result<Self, MechError> {
        if x.len() != y.len() {
            return Err(MechError::InvalidSeries(format!(
                "Hough input lengths differ: x={}, y={}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(MechError::InsufficientData("Hough transform of an empty point cloud".into()));
        }
        config.validate()?;

        let (nq, nr) = (config.nq, config.nr);
        let (q_lo, q_hi) = config.theta_range;
        let dq = (q_hi - q_lo) / nq as f64;
        let trig: Vec<(f64, f64)> = (0..nq).map(|i| (q_lo + i as f64 * dq).sin_cos()).collect();

        let (r_min, r_max) = trig
            .par_iter()
            .map(|&(sin, cos)| {
                x.iter().zip(y.iter()).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&xi, &yi)| {
                    let r = xi * sin - yi * cos;
                    (lo.min(r), hi.max(r))
                })
            })
            .reduce(|| (f64::INFINITY, f64::NEG_INFINITY), |a, b| (a.0.min(b.0), a.1.max(b.1)));
        // A single point (or a cloud at the origin) still needs a usable bin width.
        let r_max = if r_max > r_min { r_max } else { r_min + 1.0 };
        let dr = (r_max - r_min) / nr as f64;

        let rows: Vec<Vec<f64>> = trig
            .par_iter()
            .map(|&(sin, cos)| {
                let mut row = vec![0.0; nr];
                for (&xi, &yi) in x.iter().zip(y.iter()) {
                    let r = xi * sin - yi * cos;
                    let bin = (((r - r_min) / dr) as usize).min(nr - 1);
                    row[bin] += 1.0;
                }
                row
            })
            .collect();

        Ok(Self {
            votes: DMatrix::from_fn(nq, nr, |i, j| rows[i][j]),
            theta_range: (q_lo, q_hi),
            r_range: (r_min, r_max),
        })
    }

    pub fn votes(&self) -> &DMatrix<f64> {
        &self.votes
    }

    pub fn nq(&self) -> usize {
        self.votes.nrows()
    }

    pub fn nr(&self) -> usize {
        self.votes.ncols()
    }

    pub fn theta_range(&self) -> (f64, f64) {
        self.theta_range
    }

    pub fn r_range(&self) -> (f64, f64) {
        self.r_range
    }

    pub fn theta_step(&self) -> f64 {
        (self.theta_range.1 - self.theta_range.0) / self.nq() as f64
    }

    pub fn r_step(&self) -> f64 {
        (self.r_range.1 - self.r_range.0) / self.nr() as f64
    }

    /// Continuous `(theta, r)` at a (possibly fractional) bin position.
    ///
    /// Angle bins are sampled at their lower edge; distance bins map to their
    /// centers.
    pub fn theta_distance(&self, theta_bin: f64, r_bin: f64) -> (f64, f64) {
        let theta = self.theta_range.0 + theta_bin * self.theta_step();
        let r = self.r_range.0 + (r_bin + 0.5) * self.r_step();
        (theta, r)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn small_config() -> HoughConfig {
        HoughConfig {
            nq: 360,
            nr: 361,
            search_lower_deg: 30.0,
            ..HoughConfig::default()
        }
    }

    fn argmax(m: &DMatrix<f64>) -> (usize, usize, f64) {
        let mut best = (0, 0, f64::NEG_INFINITY);
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                if m[(i, j)] > best.2 {
                    best = (i, j, m[(i, j)]);
                }
            }
        }
        best
    }

    #[test]
    fn colinear_points_vote_into_one_cell() {
        // y = x tan(60deg) + 0.4  <=>  x sin - y cos = -0.2 at 60 degrees.
        let x: Vec<f64> = (0..=20).map(|i| i as f64 / 20.0).collect();
        let y: Vec<f64> = x.iter().map(|&v| v * (PI / 3.0).tan() + 0.4).collect();
        let space = HoughSpace::build(&x, &y, &small_config()).unwrap();

        assert_eq!(space.nq(), 360);
        assert_eq!(space.nr(), 361);
        assert!((space.votes().sum() - 21.0 * 360.0).abs() < 1e-9);

        let (qi, ri, count) = argmax(space.votes());
        assert_eq!(count, 21.0);
        let (theta, r) = space.theta_distance(qi as f64, ri as f64);
        assert!((theta - PI / 3.0).abs() < 1e-9, "theta {theta}");
        assert!((r + 0.2).abs() <= space.r_step(), "r {r}");
    }

    #[test]
    fn theta_distance_maps_the_first_bin() {
        let space = HoughSpace::build(&[0.0, 1.0], &[0.0, 1.0], &small_config()).unwrap();
        let (theta, r) = space.theta_distance(0.0, 0.0);
        assert_eq!(theta, 0.0);
        let (r_min, _) = space.r_range();
        assert!((r - (r_min + 0.5 * space.r_step())).abs() < 1e-15);
    }

    #[test]
    fn empty_cloud_is_rejected() {
        assert!(matches!(
            HoughSpace::build(&[], &[], &small_config()),
            Err(MechError::InsufficientData(_))
        ));
    }
}
