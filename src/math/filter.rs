//! Small signal-processing kernels on masks and grids.
//!
//! - `median_filter`: 1-D boolean median (zero padded at both ends)
//! - `gaussian_filter`: separable 2-D Gaussian with reflected borders
//! - `dilate` / `erode`: 1-D binary morphology with a 3-wide structuring element
//! - `longest_run`: longest contiguous `true` segment of a mask

use nalgebra::DMatrix;
use rayon::prelude::*;

/// Median of each odd-sized window centered on every element.
///
/// Samples outside the mask count as `false`. Even windows are widened by one.
pub fn median_filter(mask: &[bool], window: usize) -> Vec<bool> {
    let window = if window % 2 == 0 { window + 1 } else { window };
    let half = window / 2;
    let n = mask.len();

    // Prefix counts of `true` make every window O(1).
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0usize);
    for &m in mask {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + usize::from(m));
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let trues = prefix[hi] - prefix[lo];
            trues > half
        })
        .collect()
}

/// Normalized 1-D Gaussian kernel truncated at `radius = round(4 sigma)`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as i64;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}

/// Map an out-of-range index back into `0..n` by half-sample reflection
/// (`d c b a | a b c d | d c b a`).
fn reflect(k: i64, n: usize) -> usize {
    let n = n as i64;
    let period = 2 * n;
    let m = k.rem_euclid(period);
    if m >= n { (period - 1 - m) as usize } else { m as usize }
}

fn convolve_reflect(line: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = line.len();
    let radius = (kernel.len() / 2) as i64;
    (0..n as i64)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &w)| w * line[reflect(i + k as i64 - radius, n)])
                .sum()
        })
        .collect()
}

/// Separable Gaussian smoothing of a 2-D grid, one pass along each axis.
///
/// Columns and then rows are convolved independently in parallel.
pub fn gaussian_filter(grid: &DMatrix<f64>, sigma: f64) -> DMatrix<f64> {
    let (rows, cols) = grid.shape();
    if sigma <= 0.0 || rows == 0 || cols == 0 {
        return grid.clone();
    }
    let kernel = gaussian_kernel(sigma);

    let smoothed_cols: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|j| {
            let line: Vec<f64> = grid.column(j).iter().copied().collect();
            convolve_reflect(&line, &kernel)
        })
        .collect();
    let pass = DMatrix::from_fn(rows, cols, |i, j| smoothed_cols[j][i]);

    let smoothed_rows: Vec<Vec<f64>> = (0..rows)
        .into_par_iter()
        .map(|i| {
            let line: Vec<f64> = pass.row(i).iter().copied().collect();
            convolve_reflect(&line, &kernel)
        })
        .collect();
    DMatrix::from_fn(rows, cols, |i, j| smoothed_rows[i][j])
}

/// Binary dilation, repeated `iterations` times.
pub fn dilate(mask: &[bool], iterations: usize) -> Vec<bool> {
    let mut out = mask.to_vec();
    for _ in 0..iterations {
        let prev = out.clone();
        let n = prev.len();
        for (i, o) in out.iter_mut().enumerate() {
            *o = prev[i] || (i > 0 && prev[i - 1]) || (i + 1 < n && prev[i + 1]);
        }
    }
    out
}

/// Binary erosion, repeated `iterations` times. The border counts as `false`.
pub fn erode(mask: &[bool], iterations: usize) -> Vec<bool> {
    let mut out = mask.to_vec();
    for _ in 0..iterations {
        let prev = out.clone();
        let n = prev.len();
        for (i, o) in out.iter_mut().enumerate() {
            *o = prev[i] && i > 0 && prev[i - 1] && i + 1 < n && prev[i + 1];
        }
    }
    out
}

/// `(start, length)` of the first longest run of `true`, or `None`.
pub fn longest_run(mask: &[bool]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut i = 0;
    while i < mask.len() {
        if !mask[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < mask.len() && mask[i] {
            i += 1;
        }
        let len = i - start;
        if best.is_none_or(|(_, l)| len > l) {
            best = Some((start, len));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn median_filter_removes_isolated_flips() {
        let mask = bits("1110111100010000");
        assert_eq!(median_filter(&mask, 3), bits("1111111100000000"));
    }

    #[test]
    fn median_filter_pads_with_false() {
        // The first element sees [0, 1, 1] -> true; a lone edge true dies.
        assert_eq!(median_filter(&bits("110"), 3), bits("110"));
        assert_eq!(median_filter(&bits("100"), 3), bits("000"));
        assert_eq!(median_filter(&bits("1011"), 1), bits("1011"));
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(3.0);
        assert_eq!(k.len(), 25);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-15);
        }
    }

    #[test]
    fn gaussian_filter_preserves_mass_and_moves_peak_nowhere() {
        let mut grid = DMatrix::<f64>::zeros(41, 31);
        grid[(20, 15)] = 100.0;
        let smooth = gaussian_filter(&grid, 2.0);
        assert!((smooth.sum() - 100.0).abs() < 1e-9, "mass {}", smooth.sum());
        let (mut bi, mut bj, mut best) = (0, 0, f64::NEG_INFINITY);
        for i in 0..41 {
            for j in 0..31 {
                if smooth[(i, j)] > best {
                    best = smooth[(i, j)];
                    bi = i;
                    bj = j;
                }
            }
        }
        assert_eq!((bi, bj), (20, 15));
        assert!(best < 100.0);
    }

    #[test]
    fn gaussian_filter_leaves_constants_alone() {
        let grid = DMatrix::<f64>::from_element(7, 5, 3.5);
        let smooth = gaussian_filter(&grid, 3.0);
        for v in smooth.iter() {
            assert!((v - 3.5).abs() < 1e-12);
        }
    }

    #[test]
    fn reflect_mirrors_about_the_edges() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(9, 4), 1);
    }

    #[test]
    fn morphology_grows_and_shrinks_runs() {
        let mask = bits("0000111100000");
        assert_eq!(dilate(&mask, 2), bits("0011111111000"));
        assert_eq!(erode(&mask, 1), bits("0000011000000"));
        assert_eq!(erode(&bits("1111"), 1), bits("0110"));
    }

    #[test]
    fn longest_run_prefers_the_first_of_equal_runs() {
        assert_eq!(longest_run(&bits("0110111011")), Some((4, 3)));
        assert_eq!(longest_run(&bits("1101100")), Some((0, 2)));
        assert_eq!(longest_run(&bits("000")), None);
    }
}
