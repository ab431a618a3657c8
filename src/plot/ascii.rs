//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - profit curve: `-` line with `X` at the optimum
//! - binned residuals: `o` inside the band, `!` outside, `.` band edges

use crate::diagnostics::BinnedResiduals;
use crate::domain::MarkupOptimum;
use crate::profit::ProfitCurve;

/// Render the expected-profit curve with the optimum marked.
pub fn render_profit_curve(
    curve: &ProfitCurve,
    optimum: &MarkupOptimum,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = range(&curve.markups).unwrap_or((0.0, 100.0));
    let (y_min, y_max) = range(&curve.profits).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let points: Vec<(f64, f64)> = curve
        .markups
        .iter()
        .zip(curve.profits.iter())
        .map(|(&m, &p)| (m, p))
        .collect();
    draw_polyline(&mut grid, &points, x_min, x_max, y_min, y_max, '-');

    // Mark the optimum last so it overwrites the line.
    let x = map_x(optimum.markup_pct, x_min, x_max, width);
    let y = map_y(optimum.expected_profit, y_min, y_max, height);
    grid[y][x] = 'X';

    let mut out = String::new();
    out.push_str(&format!(
        "Expected profit: markup=[{x_min:.1}, {x_max:.1}]% | profit=[{y_min:.3}, {y_max:.3}]$ | X = optimum ({:.2}%)\n",
        optimum.markup_pct
    ));
    push_grid(&mut out, grid);
    out
}

/// Render the binned-residual check: per-bin mean residuals against the
/// `+/-2SE` band around zero.
pub fn render_binned_residuals(binned: &BinnedResiduals, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let centers: Vec<f64> = binned.bins.iter().map(|b| b.center).collect();
    let (x_min, x_max) = range(&centers).unwrap_or((0.0, 1.0));

    // Symmetric y-range holding both residuals and bands, so zero sits on
    // the middle row.
    let mut y_abs = 0.0f64;
    for b in &binned.bins {
        y_abs = y_abs.max(b.mean_residual.abs()).max(b.band);
    }
    let y_abs = (y_abs * 1.1).max(1e-6);
    let (y_min, y_max) = (-y_abs, y_abs);

    let mut grid = vec![vec![' '; width]; height];

    // Band edges first so markers overlay them.
    for b in &binned.bins {
        let x = map_x(b.center, x_min, x_max, width);
        for edge in [b.band, -b.band] {
            let y = map_y(edge, y_min, y_max, height);
            if grid[y][x] == ' ' {
                grid[y][x] = '.';
            }
        }
    }

    for b in &binned.bins {
        let x = map_x(b.center, x_min, x_max, width);
        let y = map_y(b.mean_residual, y_min, y_max, height);
        grid[y][x] = if b.inside() { 'o' } else { '!' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Binned residuals by {}: {}/{} inside the band | x=[{x_min:.2}, {x_max:.2}] | o=inside !=outside .=band\n",
        binned.axis,
        binned.inside,
        binned.total()
    ));
    push_grid(&mut out, grid);
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(v: f64, v_min: f64, v_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, v_min: f64, v_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    // v=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(
    grid: &mut [Vec<char>],
    points: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    if points.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let gx = map_x(x, x_min, x_max, width);
        let gy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, gx, gy, ch);
        } else {
            grid[gy][gx] = ch;
        }
        prev = Some((gx, gy));
    }
}

/// Integer line drawing (Bresenham-ish).
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
    use crate::diagnostics::ResidualBin;

    #[test]
    fn profit_plot_golden_snapshot_small() {
        // A symmetric tent around m=30 makes the expected grid obvious.
        let curve = ProfitCurve {
            markups: vec![10.0, 20.0, 30.0, 40.0, 50.0],
            profits: vec![1.0, 2.0, 3.0, 2.0, 1.0],
        };
        let optimum = MarkupOptimum {
            markup_pct: 30.0,
            expected_profit: 3.0,
            iterations: 1,
            bracket_lo: 20.0,
            bracket_hi: 40.0,
        };

        let txt = render_profit_curve(&curve, &optimum, 11, 5);
        let expected = concat!(
            "Expected profit: markup=[10.0, 50.0]% | profit=[0.900, 3.100]$ | X = optimum (30.00%)\n",
            "     X     \n",
            "    - --   \n",
            "   -    -  \n",
            " --      - \n",
            "-         -\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn optimum_marker_is_always_present() {
        let curve = ProfitCurve {
            markups: (0..50).map(|i| 10.0 + i as f64).collect(),
            profits: (0..50).map(|i| -((i as f64 - 25.0) / 10.0).powi(2)).collect(),
        };
        let optimum = MarkupOptimum {
            markup_pct: 35.0,
            expected_profit: 0.0,
            iterations: 10,
            bracket_lo: 34.0,
            bracket_hi: 36.0,
        };
        let txt = render_profit_curve(&curve, &optimum, 60, 20);
        assert_eq!(txt.matches('X').count(), 2, "one in legend, one in grid");
    }

    fn bin(center: f64, mean_residual: f64, band: f64) -> ResidualBin {
        ResidualBin {
            center,
            n: 10,
            mean_fitted: 0.5,
            mean_residual,
            band,
        }
    }

    #[test]
    fn binned_plot_marks_outside_bins() {
        let bins = vec![
            bin(0.2, 0.01, 0.05),
            bin(0.5, -0.02, 0.05),
            bin(0.8, 0.20, 0.05),
        ];
        let inside = bins.iter().filter(|b| b.inside()).count();
        let binned = BinnedResiduals {
            axis: "fitted probability".to_string(),
            bins,
            inside,
        };

        let txt = render_binned_residuals(&binned, 30, 11);
        assert!(txt.contains("2/3 inside the band"));
        assert_eq!(txt.matches('!').count(), 2, "one in legend, one outlier bin");
        assert!(txt.contains('o'));
        assert!(txt.contains('.'));
    }

    #[test]
    fn plots_are_deterministic() {
        let curve = ProfitCurve {
            markups: vec![5.0, 30.0, 55.0, 80.0],
            profits: vec![0.5, 2.0, 1.5, 0.2],
        };
        let optimum = MarkupOptimum {
            markup_pct: 30.0,
            expected_profit: 2.0,
            iterations: 3,
            bracket_lo: 5.0,
            bracket_hi: 55.0,
        };
        let a = render_profit_curve(&curve, &optimum, 40, 12);
        let b = render_profit_curve(&curve, &optimum, 40, 12);
        assert_eq!(a, b);
    }
}
