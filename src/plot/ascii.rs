//! ASCII plotting of a stress-strain curve for terminal output.
//!
//! Fixed-size character grid, deterministic output.
//!
//! Plot elements:
//! - curve points: `.`
//! - elastic inliers: `o`
//! - fitted elastic line: `/`, clipped to the stress range

use crate::domain::MergedCurve;

/// Render the curve, optionally with a fitted line `stress = m * strain + b`
/// and inlier flags (one per curve point).
pub fn render_stress_strain(
    curve: &MergedCurve,
    line: Option<(f64, f64)>,
    inliers: Option<&[bool]>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = range(curve.strain()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(curve.stress()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Line first so points overlay it.
    if let Some(((xa, ya), (xb, yb))) = line.and_then(|(m, b)| clip_line(m, b, (x_min, x_max), (y_min, y_max))) {
        draw_line(
            &mut grid,
            map_x(xa, x_min, x_max, width),
            map_y(ya, y_min, y_max, height),
            map_x(xb, x_min, x_max, width),
            map_y(yb, y_min, y_max, height),
            '/',
        );
    }

    for (i, (&x, &y)) in curve.strain().iter().zip(curve.stress().iter()).enumerate() {
        let inlier = inliers.and_then(|f| f.get(i).copied()).unwrap_or(false);
        let cell = &mut grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)];
        // An inlier marker is never hidden by a later plain point.
        if inlier {
            *cell = 'o';
        } else if *cell != 'o' {
            *cell = '.';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: strain=[{x_min:.6}, {x_max:.6}] | stress=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

/// Segment of `y = m x + b` inside the plot box, if any.
fn clip_line(m: f64, b: f64, (x_min, x_max): (f64, f64), (y_min, y_max): (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
    if !(m.is_finite() && b.is_finite()) {
        return None;
    }
    let (x0, x1) = if m == 0.0 {
        if b < y_min || b > y_max {
            return None;
        }
        (x_min, x_max)
    } else {
        let xa = (y_min - b) / m;
        let xb = (y_max - b) / m;
        (x_min.max(xa.min(xb)), x_max.min(xa.max(xb)))
    };
    if x0 > x1 {
        return None;
    }
    Some(((x0, m * x0 + b), (x1, m * x1 + b)))
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (maximum stress).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_curve() -> MergedCurve {
        MergedCurve::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 10.0, 20.0, 20.0],
        )
        .unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let txt = render_stress_strain(&small_curve(), Some((10.0, 0.0)), Some(&[true, true, true, false]), 10, 5);
        let expected = concat!(
            "Plot: strain=[0.000000, 3.000000] | stress=[-1.00, 21.00]\n",
            "      o  .\n",
            "    //    \n",
            "   o      \n",
            " //       \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn points_only_without_a_fit() {
        let txt = render_stress_strain(&small_curve(), None, None, 10, 5);
        let body: String = txt.lines().skip(1).collect();
        assert!(!body.contains('/'));
        assert!(!body.contains('o'));
        assert_eq!(body.matches('.').count(), 4);
    }

    #[test]
    fn lines_outside_the_box_are_skipped() {
        assert!(clip_line(1.0, 100.0, (0.0, 1.0), (0.0, 10.0)).is_none());
        assert!(clip_line(0.0, 5.0, (0.0, 1.0), (0.0, 10.0)).is_some());
        let ((x0, _), (x1, y1)) = clip_line(20.0, 0.0, (0.0, 1.0), (0.0, 10.0)).unwrap();
        assert_eq!((x0, x1, y1), (0.0, 0.5, 10.0));
    }
}
