//! Article figures rendered with the Plotters SVG backend.
//!
//! Four figures accompany the article:
//!
//! - demand curves per product (fitted sale probability vs markup, with
//!   empirical sold shares by markup decile)
//! - binned residuals with the acceptance band
//! - the expected-profit curve with the optimum marked
//! - the Monte Carlo uplift histogram
//!
//! SVG keeps the output self-contained: no raster buffers, no font
//! rasterization, just text elements a browser lays out itself.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::app::pipeline::RunOutput;
use crate::diagnostics::BinnedResiduals;
use crate::domain::{AnalysisConfig, Dataset, MarkupOptimum, ProductKind};
use crate::error::AppError;
use crate::glm::{predict_eta, GlmFit};
use crate::math::sigmoid;
use crate::profit::ProfitCurve;
use crate::report::markdown::{FIG_BINNED, FIG_DEMAND, FIG_PROFIT, FIG_UPLIFT};

/// Figure pixel dimensions.
const FIG_SIZE: (u32, u32) = (800, 500);

/// Markup grid resolution for the demand-curve lines.
const DEMAND_POINTS: usize = 120;

/// Empirical sold-share buckets per product on the demand figure.
const DEMAND_BUCKETS: usize = 10;

/// Histogram bars on the uplift figure.
const UPLIFT_BARS: usize = 30;

/// Write all article figures into `config.out_dir`.
pub fn write_figures(run: &RunOutput, config: &AnalysisConfig) -> Result<Vec<PathBuf>, AppError> {
    create_dir_all(&config.out_dir).map_err(|e| {
        AppError::config(format!(
            "Failed to create output directory '{}': {e}",
            config.out_dir.display()
        ))
    })?;

    let best = &run.selection.best().fit;
    let mut written = Vec::new();

    let path = config.out_dir.join(FIG_DEMAND);
    draw_demand(&path, &run.dataset, best).map_err(|e| figure_error(&path, e))?;
    written.push(path);

    let path = config.out_dir.join(FIG_BINNED);
    draw_binned(&path, &run.binned_prob).map_err(|e| figure_error(&path, e))?;
    written.push(path);

    let path = config.out_dir.join(FIG_PROFIT);
    draw_profit(&path, &run.curve, &run.optimum).map_err(|e| figure_error(&path, e))?;
    written.push(path);

    if let Some(impact) = &run.impact {
        let path = config.out_dir.join(FIG_UPLIFT);
        draw_uplift(&path, &impact.uplifts).map_err(|e| figure_error(&path, e))?;
        written.push(path);
    }

    Ok(written)
}

fn figure_error(path: &Path, e: Box<dyn std::error::Error>) -> AppError {
    AppError::config(format!("Failed to render '{}': {e}", path.display()))
}

fn product_color(product: ProductKind) -> RGBColor {
    match product {
        ProductKind::Apparel => RGBColor(31, 119, 180),
        ProductKind::Electronics => RGBColor(214, 39, 40),
        ProductKind::Home => RGBColor(44, 160, 44),
    }
}

fn draw_demand(
    path: &Path,
    dataset: &Dataset,
    fit: &GlmFit,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, FIG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let stats = &dataset.stats;
    let (m_lo, m_hi) = (stats.markup_min, stats.markup_max);

    let mut chart = ChartBuilder::on(&root)
        .caption("Fitted demand by product", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(m_lo..m_hi, 0.0..1.0)?;

    chart
        .configure_mesh()
        .x_desc("markup (% of unit cost)")
        .y_desc("P(sale)")
        .draw()?;

    for product in ProductKind::ALL {
        let color = product_color(product);

        // Fitted curve at the product's median cost.
        let mut costs: Vec<f64> = dataset
            .records
            .iter()
            .filter(|r| r.product == product)
            .map(|r| r.unit_cost)
            .collect();
        if costs.is_empty() {
            continue;
        }
        costs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_cost = costs[costs.len() / 2];

        let line: Vec<(f64, f64)> = (0..DEMAND_POINTS)
            .map(|i| {
                let m = m_lo + (m_hi - m_lo) * i as f64 / (DEMAND_POINTS - 1) as f64;
                let p = sigmoid(predict_eta(&fit.coefs, fit.kind, m, median_cost, product));
                (m, p)
            })
            .collect();
        chart
            .draw_series(LineSeries::new(line, color.stroke_width(2)))?
            .label(product.display_name())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });

        // Empirical sold share per markup bucket.
        let bucket_w = (m_hi - m_lo) / DEMAND_BUCKETS as f64;
        let mut sold = vec![0usize; DEMAND_BUCKETS];
        let mut total = vec![0usize; DEMAND_BUCKETS];
        for r in dataset.records.iter().filter(|r| r.product == product) {
            let b = (((r.markup_pct - m_lo) / bucket_w) as usize).min(DEMAND_BUCKETS - 1);
            total[b] += 1;
            if r.sold {
                sold[b] += 1;
            }
        }
        let points: Vec<(f64, f64)> = (0..DEMAND_BUCKETS)
            .filter(|&b| total[b] > 0)
            .map(|b| {
                let center = m_lo + bucket_w * (b as f64 + 0.5);
                (center, sold[b] as f64 / total[b] as f64)
            })
            .collect();
        chart.draw_series(
            points
                .into_iter()
                .map(|xy| Circle::new(xy, 4, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_binned(path: &Path, binned: &BinnedResiduals) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, FIG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_lo = binned.bins.first().map(|b| b.center).unwrap_or(0.0);
    let x_hi = binned.bins.last().map(|b| b.center).unwrap_or(1.0);
    let mut y_abs = 0.0f64;
    for b in &binned.bins {
        y_abs = y_abs.max(b.mean_residual.abs()).max(b.band);
    }
    let y_abs = (y_abs * 1.2).max(1e-6);

    let mut chart = ChartBuilder::on(&root)
        .caption("Binned residuals", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, -y_abs..y_abs)?;

    chart
        .configure_mesh()
        .x_desc(binned.axis.as_str())
        .y_desc("mean residual")
        .draw()?;

    // Zero line and the +/- band envelopes.
    chart.draw_series(LineSeries::new(
        vec![(x_lo, 0.0), (x_hi, 0.0)],
        BLACK.stroke_width(1),
    ))?;
    let grey = RGBColor(120, 120, 120);
    for sign in [1.0, -1.0] {
        let envelope: Vec<(f64, f64)> = binned
            .bins
            .iter()
            .map(|b| (b.center, sign * b.band))
            .collect();
        chart.draw_series(LineSeries::new(envelope, grey.stroke_width(1)))?;
    }

    chart.draw_series(binned.bins.iter().map(|b| {
        let color = if b.inside() {
            RGBColor(31, 119, 180)
        } else {
            RGBColor(214, 39, 40)
        };
        Circle::new((b.center, b.mean_residual), 4, color.filled())
    }))?;

    root.present()?;
    Ok(())
}

fn draw_profit(
    path: &Path,
    curve: &ProfitCurve,
    optimum: &MarkupOptimum,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, FIG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_lo = curve.markups.first().copied().unwrap_or(0.0);
    let x_hi = curve.markups.last().copied().unwrap_or(100.0);
    let y_hi = curve.profits.iter().cloned().fold(f64::MIN, f64::max) * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption("Expected profit per offer", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("markup (% of unit cost)")
        .y_desc("expected profit ($)")
        .draw()?;

    let line: Vec<(f64, f64)> = curve
        .markups
        .iter()
        .zip(curve.profits.iter())
        .map(|(&m, &p)| (m, p))
        .collect();
    chart.draw_series(LineSeries::new(line, RGBColor(31, 119, 180).stroke_width(2)))?;

    // Vertical marker at the optimum.
    let red = RGBColor(214, 39, 40);
    chart.draw_series(LineSeries::new(
        vec![(optimum.markup_pct, 0.0), (optimum.markup_pct, y_hi)],
        red.stroke_width(1),
    ))?;
    chart.draw_series(std::iter::once(Circle::new(
        (optimum.markup_pct, optimum.expected_profit),
        5,
        red.filled(),
    )))?;

    root.present()?;
    Ok(())
}

fn draw_uplift(path: &Path, uplifts: &[f64]) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, FIG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let lo = uplifts.iter().cloned().fold(f64::MAX, f64::min);
    let hi = uplifts.iter().cloned().fold(f64::MIN, f64::max);
    let span = (hi - lo).max(1e-9);
    let bar_w = span / UPLIFT_BARS as f64;

    let mut counts = vec![0u32; UPLIFT_BARS];
    for &u in uplifts {
        let b = (((u - lo) / bar_w) as usize).min(UPLIFT_BARS - 1);
        counts[b] += 1;
    }
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Repricing uplift across replicates", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((lo - bar_w)..(hi + bar_w), 0u32..(max_count + 1))?;

    chart
        .configure_mesh()
        .x_desc("uplift per offer ($)")
        .y_desc("replicates")
        .draw()?;

    let blue = RGBColor(31, 119, 180);
    chart.draw_series((0..UPLIFT_BARS).map(|b| {
        let x0 = lo + bar_w * b as f64;
        Rectangle::new([(x0, 0u32), (x0 + bar_w, counts[b])], blue.mix(0.6).filled())
    }))?;

    // Zero marker: everything right of it is a win.
    chart.draw_series(LineSeries::new(
        vec![(0.0, 0u32), (0.0, max_count + 1)],
        BLACK.stroke_width(1),
    ))?;

    root.present()?;
    Ok(())
}
