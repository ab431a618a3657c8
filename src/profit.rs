//! Expected-profit objective and the one-dimensional markup search.
//!
//! Expected profit per offer at a candidate markup `m` averages over the
//! observed catalog (costs and product mix), plugging `m` into the fitted
//! demand model:
//!
//! ```text
//! profit(m) = mean_i [ P(sale | m, cost_i, product_i) * cost_i * m / 100 ]
//! ```
//!
//! The search runs a coarse grid scan to bracket the peak, then refines it
//! with golden-section. A peak on the search boundary or a search that fails
//! to settle is reported as an error rather than a recommendation: a
//! boundary "optimum" means the model is extrapolating, not optimizing.

use crate::domain::{MarkupOptimum, SaleRecord};
use crate::error::AppError;
use crate::glm::{predict_eta, GlmFit};
use crate::math::sigmoid;

/// Grid points used to bracket the peak before refinement.
const GRID_POINTS: usize = 65;

/// Absolute convergence tolerance for the golden-section interval, in
/// markup percentage points.
const GS_TOL: f64 = 1e-4;

/// Iteration cap for golden-section; hitting it means the search failed.
const MAX_GS_ITER: usize = 120;

/// 1/phi, the golden-section reduction ratio.
const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Sampled profit curve for plots and tables.
#[derive(Debug, Clone)]
pub struct ProfitCurve {
    pub markups: Vec<f64>,
    pub profits: Vec<f64>,
}

/// Expected profit per offer at one candidate markup, averaged over the
/// observed catalog.
pub fn expected_profit(records: &[SaleRecord], fit: &GlmFit, markup_pct: f64) -> f64 {
    let mut total = 0.0;
    for r in records {
        let eta = predict_eta(&fit.coefs, fit.kind, markup_pct, r.unit_cost, r.product);
        let p_sale = sigmoid(eta);
        total += p_sale * r.unit_cost * markup_pct / 100.0;
    }
    total / records.len() as f64
}

/// Sample the profit objective on an even grid over `[lo, hi]`.
pub fn profit_curve(
    records: &[SaleRecord],
    fit: &GlmFit,
    lo: f64,
    hi: f64,
    points: usize,
) -> ProfitCurve {
    let points = points.max(2);
    let step = (hi - lo) / (points - 1) as f64;
    let markups: Vec<f64> = (0..points).map(|i| lo + step * i as f64).collect();
    let profits: Vec<f64> = markups
        .iter()
        .map(|&m| expected_profit(records, fit, m))
        .collect();
    ProfitCurve { markups, profits }
}

/// Locate the profit-maximizing markup in `[lo, hi]`.
pub fn maximize_profit(
    records: &[SaleRecord],
    fit: &GlmFit,
    lo: f64,
    hi: f64,
) -> Result<MarkupOptimum, AppError> {
    if records.is_empty() {
        return Err(AppError::data("Cannot optimize over an empty catalog."));
    }
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(AppError::config(format!(
            "Invalid markup search range [{lo}, {hi}]."
        )));
    }

    // Coarse scan to find the grid cell containing the peak.
    let curve = profit_curve(records, fit, lo, hi, GRID_POINTS);
    if curve.profits.iter().any(|p| !p.is_finite()) {
        return Err(AppError::numeric(
            "Profit objective is not finite over the search range.",
        ));
    }

    let mut best = 0usize;
    for (i, &p) in curve.profits.iter().enumerate() {
        if p > curve.profits[best] {
            best = i;
        }
    }
    if best == 0 || best == curve.markups.len() - 1 {
        return Err(AppError::numeric(format!(
            "Expected profit peaks at the search boundary ({:.1}%); the model \
             is extrapolating rather than locating an interior optimum. \
             Widen --markup-lo/--markup-hi or revisit the fitted model.",
            curve.markups[best]
        )));
    }

    // Golden-section refinement inside the bracketing cell pair.
    let bracket_lo = curve.markups[best - 1];
    let bracket_hi = curve.markups[best + 1];
    let mut a = bracket_lo;
    let mut b = bracket_hi;
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = expected_profit(records, fit, c);
    let mut fd = expected_profit(records, fit, d);

    let mut iterations = 0;
    let mut converged = false;
    for _ in 0..MAX_GS_ITER {
        iterations += 1;
        if !(fc.is_finite() && fd.is_finite()) {
            return Err(AppError::numeric(
                "Profit objective became non-finite during refinement.",
            ));
        }
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = expected_profit(records, fit, c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = expected_profit(records, fit, d);
        }
        if (b - a).abs() <= GS_TOL {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(AppError::numeric(format!(
            "Markup search did not converge within {MAX_GS_ITER} iterations."
        )));
    }

    let markup_pct = 0.5 * (a + b);
    log::debug!(
        "Markup search: bracket [{bracket_lo:.3}, {bracket_hi:.3}] refined to {markup_pct:.5} in {iterations} iterations"
    );
    let value = expected_profit(records, fit, markup_pct);
    if !value.is_finite() {
        return Err(AppError::numeric("Expected profit at the optimum is not finite."));
    }

    Ok(MarkupOptimum {
        markup_pct,
        expected_profit: value,
        iterations,
        bracket_lo,
        bracket_hi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, ProductKind, SaleRecord};
    use nalgebra::DVector;

    fn flat_catalog(n: usize, cost: f64) -> Vec<SaleRecord> {
        (0..n)
            .map(|i| SaleRecord {
                id: format!("c-{i:04}"),
                markup_pct: 30.0,
                unit_cost: cost,
                product: ProductKind::Apparel,
                sold: i % 2 == 0,
            })
            .collect()
    }

    fn markup_fit(b0: f64, b1: f64) -> GlmFit {
        GlmFit {
            kind: ModelKind::Markup,
            coefs: DVector::from_vec(vec![b0, b1]),
            deviance: 0.0,
            null_deviance: 0.0,
            fitted: vec![],
            eta: vec![],
            weights: vec![],
            iterations: 1,
            n: 0,
            k: 2,
        }
    }

    #[test]
    fn optimum_matches_a_brute_force_scan() {
        // profit(m) = sigmoid(2 - 0.05 m) * 0.2 m for a $20 catalog.
        let records = flat_catalog(10, 20.0);
        let fit = markup_fit(2.0, -0.05);
        let opt = maximize_profit(&records, &fit, 5.0, 100.0).unwrap();

        let mut best_m = 5.0;
        let mut best_p = f64::NEG_INFINITY;
        let mut m = 5.0;
        while m <= 100.0 {
            let p = expected_profit(&records, &fit, m);
            if p > best_p {
                best_p = p;
                best_m = m;
            }
            m += 0.001;
        }

        assert!(
            (opt.markup_pct - best_m).abs() < 0.01,
            "golden section {} vs scan {}",
            opt.markup_pct,
            best_m
        );
        assert!((opt.expected_profit - best_p).abs() < 1e-6);
        assert!(opt.bracket_lo < opt.markup_pct && opt.markup_pct < opt.bracket_hi);
    }

    #[test]
    fn optimum_beats_nearby_markups() {
        let records = flat_catalog(8, 35.0);
        let fit = markup_fit(1.5, -0.04);
        let opt = maximize_profit(&records, &fit, 5.0, 100.0).unwrap();

        for delta in [-5.0, -1.0, 1.0, 5.0] {
            let nearby = expected_profit(&records, &fit, opt.markup_pct + delta);
            assert!(
                opt.expected_profit >= nearby,
                "profit at optimum {} < profit at offset {delta}",
                opt.markup_pct
            );
        }
    }

    #[test]
    fn monotone_profit_hits_the_boundary_guard() {
        // A positive markup coefficient makes profit strictly increasing,
        // so the peak lands on the upper boundary.
        let records = flat_catalog(6, 20.0);
        let fit = markup_fit(0.5, 0.02);
        let err = maximize_profit(&records, &fit, 5.0, 100.0).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn invalid_range_is_a_config_error() {
        let records = flat_catalog(6, 20.0);
        let fit = markup_fit(2.0, -0.05);
        let err = maximize_profit(&records, &fit, 60.0, 30.0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_catalog_is_a_data_error() {
        let fit = markup_fit(2.0, -0.05);
        let err = maximize_profit(&[], &fit, 5.0, 100.0).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn curve_grid_is_even_and_finite() {
        let records = flat_catalog(5, 25.0);
        let fit = markup_fit(2.0, -0.05);
        let curve = profit_curve(&records, &fit, 10.0, 50.0, 21);

        assert_eq!(curve.markups.len(), 21);
        assert_eq!(curve.profits.len(), 21);
        assert!((curve.markups[0] - 10.0).abs() < 1e-12);
        assert!((curve.markups[20] - 50.0).abs() < 1e-12);
        let step = curve.markups[1] - curve.markups[0];
        for pair in curve.markups.windows(2) {
            assert!((pair[1] - pair[0] - step).abs() < 1e-9);
        }
        assert!(curve.profits.iter().all(|p| p.is_finite()));
    }
}
