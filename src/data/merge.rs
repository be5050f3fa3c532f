//! Registration of independently sampled strain and stress channels.
//!
//! The extensometer and the load frame log on their own clocks and rates.
//! Both channels are linearly interpolated onto one time grid restricted to
//! the overlap of the two recordings; nothing is extrapolated.

use tracing::debug;

use crate::domain::{MergeGrid, MergedCurve, Series};
use crate::error::MechError;

/// Merge a strain and a stress series onto a shared time base.
pub fn merge(strain: &Series, stress: &Series, grid: MergeGrid) -> Result<MergedCurve, MechError> {
    let (time, strain_values, stress_values) = linear_merge(
        strain.time(),
        strain.values(),
        stress.time(),
        stress.values(),
        grid,
    )?;
    MergedCurve::new(time, strain_values, stress_values)
}

/// `merge(t1, y1, t2, y2) -> (t, y1 interpolated, y2 interpolated)`.
///
/// Both time vectors must be strictly increasing (guaranteed by `Series`).
pub fn linear_merge(
    t1: &[f64],
    y1: &[f64],
    t2: &[f64],
    y2: &[f64],
    grid: MergeGrid,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), MechError> {
    if t1.len() < 2 || t2.len() < 2 {
        return Err(MechError::InsufficientData(format!(
            "merge needs at least 2 samples per series (got {} and {})",
            t1.len(),
            t2.len()
        )));
    }

    let lower = t1[0].max(t2[0]);
    let upper = t1[t1.len() - 1].min(t2[t2.len() - 1]);
    let inside = |t: &f64| *t >= lower && *t <= upper;
    let n1 = t1.iter().filter(|t| inside(t)).count();
    let n2 = t2.iter().filter(|t| inside(t)).count();

    if !(upper > lower) {
        return Err(MechError::InsufficientOverlap {
            lower,
            upper,
            points: n1 + n2,
        });
    }

    let time = match grid {
        MergeGrid::Denser => {
            let master = if n1 >= n2 { t1 } else { t2 };
            let mut time: Vec<f64> = master.iter().copied().filter(|t| inside(t)).collect();
            if time.first().is_none_or(|&t| t > lower) {
                time.insert(0, lower);
            }
            if time.last().is_none_or(|&t| t < upper) {
                time.push(upper);
            }
            time
        }
        MergeGrid::Union => {
            let mut time: Vec<f64> = t1.iter().chain(t2.iter()).copied().filter(|t| inside(t)).collect();
            time.sort_by(f64::total_cmp);
            time.dedup();
            time
        }
    };

    if time.len() < 2 {
        return Err(MechError::InsufficientOverlap {
            lower,
            upper,
            points: time.len(),
        });
    }

    let v1 = time.iter().map(|&t| interp(t, t1, y1)).collect();
    let v2 = time.iter().map(|&t| interp(t, t2, y2)).collect();
    debug!(
        points = time.len(),
        lower, upper, "merged strain/stress onto common time grid"
    );
    Ok((time, v1, v2))
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`, clamped to the ends.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First index with xs[i] > x; x lies in [xs[i-1], xs[i]).
    let i = xs.partition_point(|&v| v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}
