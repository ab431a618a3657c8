//! Coefficient inference for the selected model.
//!
//! Two interval flavors per coefficient:
//!
//! - Wald: estimate ± z * SE, with SE from the inverse information matrix
//! - Profile likelihood: the set of pinned values whose refitted deviance
//!   stays within the chi-square(1) threshold of the minimum
//!
//! Profile intervals respect the curvature of the likelihood and are the
//! ones quoted in the report; Wald serves as the fallback when a profile
//! bound cannot be bracketed (which the output flags).

use nalgebra::{DMatrix, DVector};

use crate::domain::{CoefEstimate, SaleRecord};
use crate::error::AppError;
use crate::glm::design::{build_design, Design};
use crate::glm::irls::{bernoulli_deviance, fit_logistic, GlmFit};
use crate::math::{apply_sqrt_weights, chi2_quantile_1df, normal_quantile, two_sided_p};

/// Step doublings allowed while bracketing a profile bound.
const MAX_EXPAND: usize = 10;

/// Bisection iterations for locating a profile bound.
const MAX_BISECT: usize = 60;

/// Inference output for the selected model.
#[derive(Debug, Clone)]
pub struct Inference {
    pub level: f64,
    /// One row per coefficient, in design order.
    pub estimates: Vec<CoefEstimate>,
    /// Estimated coefficient covariance, `(X' W X)^-1` at the final weights.
    pub covariance: DMatrix<f64>,
}

/// Compute standard errors, tests, and intervals for a converged fit.
pub fn infer(records: &[SaleRecord], fit: &GlmFit, level: f64) -> Result<Inference, AppError> {
    if !(level > 0.5 && level < 1.0) {
        return Err(AppError::config(format!(
            "Confidence level must be in (0.5, 1.0), got {level}."
        )));
    }

    let design = build_design(records, fit.kind);
    let covariance = coef_covariance(&design.x, &fit.weights)?;

    let z_crit = normal_quantile((1.0 + level) / 2.0)
        .ok_or_else(|| AppError::numeric("Normal quantile out of range."))?;
    let dev_target = fit.deviance
        + chi2_quantile_1df(level)
            .ok_or_else(|| AppError::numeric("Chi-square quantile out of range."))?;

    let names = fit.kind.coef_names();
    let mut estimates = Vec::with_capacity(fit.k);
    for j in 0..fit.k {
        let est = fit.coefs[j];
        let var = covariance[(j, j)];
        if !(var.is_finite() && var > 0.0) {
            return Err(AppError::numeric(format!(
                "Non-positive variance for coefficient {}.",
                names[j]
            )));
        }
        let se = var.sqrt();
        let z_value = est / se;
        let wald_low = est - z_crit * se;
        let wald_high = est + z_crit * se;

        let (profile_low, profile_high, profile_fallback) =
            profile_interval(&design, fit, j, se, dev_target, wald_low, wald_high);

        estimates.push(CoefEstimate {
            name: names[j].to_string(),
            estimate: est,
            se,
            z_value,
            p_value: two_sided_p(z_value),
            wald_low,
            wald_high,
            profile_low,
            profile_high,
            profile_fallback,
            odds_ratio: est.exp(),
            or_low: profile_low.exp(),
            or_high: profile_high.exp(),
        });
    }

    Ok(Inference {
        level,
        estimates,
        covariance,
    })
}

/// Inverse of the observed information `X' W X`.
pub fn coef_covariance(x: &DMatrix<f64>, weights: &[f64]) -> Result<DMatrix<f64>, AppError> {
    let mut xw = x.clone();
    apply_sqrt_weights(&mut xw, weights);
    let xtwx = xw.transpose() * &xw;
    let chol = xtwx.cholesky().ok_or_else(|| {
        AppError::numeric("Information matrix is not positive definite; check for collinear columns.")
    })?;
    Ok(chol.inverse())
}

fn profile_interval(
    design: &Design,
    fit: &GlmFit,
    j: usize,
    se: f64,
    dev_target: f64,
    wald_low: f64,
    wald_high: f64,
) -> (f64, f64, bool) {
    let lo = profile_bound(design, fit, j, se, dev_target, -1.0);
    let hi = profile_bound(design, fit, j, se, dev_target, 1.0);
    match (lo, hi) {
        (Some(lo), Some(hi)) => (lo, hi, false),
        _ => {
            log::warn!(
                "Profile interval for {} did not bracket; falling back to Wald.",
                fit.kind.coef_names()[j]
            );
            (wald_low, wald_high, true)
        }
    }
}

/// Locate one profile bound by bracketing then bisection.
///
/// The profile deviance is convex with its minimum at the estimate, so
/// stepping outward in doubling SE units must eventually clear the target
/// unless the likelihood is flat in that direction (near-separation); then
/// the caller falls back to Wald.
fn profile_bound(
    design: &Design,
    fit: &GlmFit,
    j: usize,
    se: f64,
    dev_target: f64,
    dir: f64,
) -> Option<f64> {
    let est = fit.coefs[j];

    let mut step = se;
    let mut outer = est + dir * step;
    let mut expands = 0;
    while profile_deviance(design, j, outer) < dev_target {
        expands += 1;
        if expands > MAX_EXPAND {
            return None;
        }
        step *= 2.0;
        outer = est + dir * step;
    }

    let mut inner = est;
    for _ in 0..MAX_BISECT {
        let mid = 0.5 * (inner + outer);
        if profile_deviance(design, j, mid) < dev_target {
            inner = mid;
        } else {
            outer = mid;
        }
        if (outer - inner).abs() <= 1e-4 * se {
            break;
        }
    }

    Some(0.5 * (inner + outer))
}

/// Deviance with coefficient `j` pinned to `value`, minimized over the
/// remaining coefficients via an offset refit.
fn profile_deviance(design: &Design, j: usize, value: f64) -> f64 {
    let n = design.x.nrows();
    let offset = DVector::from_fn(n, |i, _| value * design.x[(i, j)]);

    // Intercept-only model: nothing left to refit.
    if design.x.ncols() == 1 {
        return bernoulli_deviance(&design.y, &offset);
    }

    let reduced = design.x.clone().remove_column(j);
    match fit_logistic(&reduced, &design.y, Some(&offset)) {
        Ok(refit) => refit.deviance,
        // A refit that diverges at an extreme pinned value has effectively
        // infinite deviance there.
        Err(_) => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, ProductKind, SaleRecord, TrueParams};
    use crate::glm::irls::fit_model;
    use crate::math::sigmoid;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn constant_records(n_sold: usize, n_unsold: usize) -> Vec<SaleRecord> {
        (0..n_sold + n_unsold)
            .map(|i| SaleRecord {
                id: format!("c-{i:04}"),
                markup_pct: 30.0,
                unit_cost: 20.0,
                product: ProductKind::Apparel,
                sold: i < n_sold,
            })
            .collect()
    }

    fn synth_records(n: usize, seed: u64, truth: TrueParams) -> Vec<SaleRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let product = match i % 3 {
                    0 => ProductKind::Apparel,
                    1 => ProductKind::Electronics,
                    _ => ProductKind::Home,
                };
                let markup_pct = rng.gen_range(10.0..=70.0);
                let unit_cost = rng.gen_range(5.0..=80.0);
                let p = sigmoid(truth.eta(markup_pct, unit_cost, product));
                SaleRecord {
                    id: format!("s-{i:04}"),
                    markup_pct,
                    unit_cost,
                    product,
                    sold: rng.r#gen::<f64>() < p,
                }
            })
            .collect()
    }

    #[test]
    fn intercept_only_standard_error_matches_closed_form() {
        // For the null model the information is n * p * (1 - p), so
        // SE = 1 / sqrt(n * p * (1 - p)).
        let records = constant_records(30, 70);
        let fit = fit_model(&records, ModelKind::Null).unwrap();
        let inference = infer(&records, &fit, 0.95).unwrap();

        let expected_se = 1.0 / (100.0_f64 * 0.3 * 0.7).sqrt();
        let got = inference.estimates[0].se;
        assert!(
            (got - expected_se).abs() < 1e-4,
            "SE {got} vs closed form {expected_se}"
        );
    }

    #[test]
    fn wald_rows_are_internally_consistent() {
        let records = synth_records(800, 31, TrueParams::default());
        let fit = fit_model(&records, ModelKind::Main).unwrap();
        let inference = infer(&records, &fit, 0.95).unwrap();

        assert_eq!(inference.estimates.len(), 5);
        for row in &inference.estimates {
            assert!(row.se > 0.0);
            assert!(row.wald_low < row.estimate && row.estimate < row.wald_high);
            assert!((row.z_value - row.estimate / row.se).abs() < 1e-9);
            assert!(row.p_value > 0.0 && row.p_value <= 1.0);
            assert!((row.odds_ratio - row.estimate.exp()).abs() < 1e-9);
        }
    }

    #[test]
    fn profile_bounds_sit_on_the_deviance_threshold() {
        let records = synth_records(400, 7, TrueParams::default());
        let fit = fit_model(&records, ModelKind::Markup).unwrap();
        let inference = infer(&records, &fit, 0.95).unwrap();

        let design = build_design(&records, ModelKind::Markup);
        let target = fit.deviance + chi2_quantile_1df(0.95).unwrap();

        for (j, row) in inference.estimates.iter().enumerate() {
            assert!(!row.profile_fallback);
            assert!(row.profile_low < row.estimate && row.estimate < row.profile_high);
            for bound in [row.profile_low, row.profile_high] {
                let dev = profile_deviance(&design, j, bound);
                assert!(
                    (dev - target).abs() < 0.01,
                    "profile deviance at bound {dev} vs target {target}"
                );
            }
            // Odds-ratio interval is the exponentiated profile interval.
            assert!((row.or_low - row.profile_low.exp()).abs() < 1e-9);
            assert!((row.or_high - row.profile_high.exp()).abs() < 1e-9);
        }
    }

    #[test]
    fn estimates_stay_within_a_wide_band_of_truth() {
        // 6 SE is far outside any plausible sampling fluctuation; this
        // catches sign errors and scale bugs, not sampling noise.
        let truth = TrueParams::default();
        let records = synth_records(4000, 101, truth);
        let fit = fit_model(&records, ModelKind::Main).unwrap();
        let inference = infer(&records, &fit, 0.95).unwrap();

        let expected = truth.as_main_coefs();
        for (j, row) in inference.estimates.iter().enumerate() {
            assert!(
                (row.estimate - expected[j]).abs() < 6.0 * row.se,
                "{}: {} vs truth {} (se {})",
                row.name,
                row.estimate,
                expected[j],
                row.se
            );
        }
    }

    #[test]
    fn covariance_is_symmetric_with_positive_diagonal() {
        let records = synth_records(600, 19, TrueParams::default());
        let fit = fit_model(&records, ModelKind::MarkupCost).unwrap();
        let inference = infer(&records, &fit, 0.9).unwrap();

        let cov = &inference.covariance;
        for i in 0..3 {
            assert!(cov[(i, i)] > 0.0);
            for j in 0..3 {
                assert!((cov[(i, j)] - cov[(j, i)]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn silly_confidence_level_is_rejected() {
        let records = constant_records(20, 20);
        let fit = fit_model(&records, ModelKind::Null).unwrap();
        let err = infer(&records, &fit, 1.5).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
