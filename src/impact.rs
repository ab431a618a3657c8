//! Monte Carlo simulation of the business impact of repricing.
//!
//! Each replicate:
//!
//! 1. draws a coefficient vector from the estimated sampling distribution
//!    (multivariate normal via the Cholesky factor of the covariance), so
//!    parameter uncertainty flows into the answer
//! 2. simulates a fresh cohort of offers from the catalog distributions
//! 3. prices the same cohort at the recommended and the baseline markup,
//!    resolving each sale with a shared uniform draw (common random
//!    numbers), which strips pure demand noise out of the comparison
//!
//! Replicates are independent and self-seeded, so the parallel map is
//! deterministic for a given seed regardless of thread count.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use nalgebra::DVector;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;

use crate::data::sim::{draw_product, draw_unit_cost};
use crate::domain::{AnalysisConfig, ImpactSummary, MarkupOptimum};
use crate::error::AppError;
use crate::glm::{predict_eta, GlmFit, Inference};
use crate::math::sigmoid;

/// Impact distribution plus the raw per-replicate uplifts (for plotting).
#[derive(Debug, Clone)]
pub struct ImpactResult {
    pub summary: ImpactSummary,
    /// Per-offer uplift in dollars, one entry per replicate.
    pub uplifts: Vec<f64>,
}

/// Run the repricing impact simulation.
pub fn simulate_impact(
    fit: &GlmFit,
    inference: &Inference,
    optimum: &MarkupOptimum,
    config: &AnalysisConfig,
) -> Result<ImpactResult, AppError> {
    if config.replicates < 10 {
        return Err(AppError::config("Need at least 10 impact replicates."));
    }
    if config.cohort < 10 {
        return Err(AppError::config("Need a cohort of at least 10 offers."));
    }

    let chol = inference
        .covariance
        .clone()
        .cholesky()
        .ok_or_else(|| AppError::numeric("Coefficient covariance is not positive definite."))?;
    let scale = chol.l();

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let k = fit.k;
    let baseline = config.baseline_markup;
    let optimal = optimum.markup_pct;
    let cohort = config.cohort;

    let rows: Vec<(f64, f64, f64)> = (0..config.replicates)
        .into_par_iter()
        .map(|rep| {
            let mut rng = StdRng::seed_from_u64(replicate_seed(config, rep));

            // Parameter draw: beta_hat + L z.
            let z = DVector::from_fn(k, |_, _| normal.sample(&mut rng));
            let beta = &fit.coefs + &scale * z;

            let mut profit_opt = 0.0;
            let mut profit_base = 0.0;
            for _ in 0..cohort {
                let product = draw_product(&mut rng);
                // The cost distributions cannot fail for the built-in
                // parameters; fall back to the median-ish value if they do.
                let unit_cost = draw_unit_cost(&mut rng, product).unwrap_or(30.0);
                let u: f64 = rng.r#gen();

                let p_opt = sigmoid(predict_eta(&beta, fit.kind, optimal, unit_cost, product));
                if u < p_opt {
                    profit_opt += unit_cost * optimal / 100.0;
                }

                let p_base = sigmoid(predict_eta(&beta, fit.kind, baseline, unit_cost, product));
                if u < p_base {
                    profit_base += unit_cost * baseline / 100.0;
                }
            }

            let per_opt = profit_opt / cohort as f64;
            let per_base = profit_base / cohort as f64;
            (per_opt - per_base, per_opt, per_base)
        })
        .collect();

    let uplifts: Vec<f64> = rows.iter().map(|r| r.0).collect();
    let n = uplifts.len() as f64;

    let mean_uplift = uplifts.iter().sum::<f64>() / n;
    let var = uplifts
        .iter()
        .map(|u| (u - mean_uplift).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let mean_profit_optimal = rows.iter().map(|r| r.1).sum::<f64>() / n;
    let mean_profit_baseline = rows.iter().map(|r| r.2).sum::<f64>() / n;
    let prob_positive = uplifts.iter().filter(|&&u| u > 0.0).count() as f64 / n;

    let mut sorted = uplifts.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let summary = ImpactSummary {
        replicates: config.replicates,
        cohort: config.cohort,
        baseline_markup: baseline,
        optimal_markup: optimal,
        mean_profit_baseline,
        mean_profit_optimal,
        mean_uplift,
        sd_uplift: var.sqrt(),
        q025: quantile(&sorted, 0.025),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        q975: quantile(&sorted, 0.975),
        prob_positive,
    };

    Ok(ImpactResult { summary, uplifts })
}

fn replicate_seed(config: &AnalysisConfig, rep: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    rep.hash(&mut hasher);
    config.cohort.hash(&mut hasher);
    config.baseline_markup.to_bits().hash(&mut hasher);
    hasher.finish()
}

/// Linear-interpolation quantile of an already-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sim::generate_dataset;
    use crate::domain::{ModelChoice, TrueParams};
    use crate::glm::{fit_and_select, infer};
    use crate::profit::maximize_profit;
    use std::path::PathBuf;

    fn test_config(seed: u64) -> AnalysisConfig {
        AnalysisConfig {
            seed,
            sample_count: 1500,
            truth: TrueParams::default(),
            model: ModelChoice::Auto,
            level: 0.95,
            bins: 0,
            markup_lo: 5.0,
            markup_hi: 100.0,
            baseline_markup: 25.0,
            replicates: 300,
            cohort: 400,
            out_dir: PathBuf::from("markopt-report"),
            export_data: None,
            export_results: None,
            export_summary: None,
            plot: false,
            plot_width: 100,
            plot_height: 25,
        }
    }

    fn fitted_pipeline(config: &AnalysisConfig) -> (crate::glm::GlmFit, Inference, MarkupOptimum) {
        let data = generate_dataset(config).unwrap();
        let selection = fit_and_select(&data.records, config).unwrap();
        let fit = selection.best().fit.clone();
        let inference = infer(&data.records, &fit, config.level).unwrap();
        let optimum =
            maximize_profit(&data.records, &fit, config.markup_lo, config.markup_hi).unwrap();
        (fit, inference, optimum)
    }

    #[test]
    fn impact_is_deterministic_for_a_seed() {
        let config = test_config(42);
        let (fit, inference, optimum) = fitted_pipeline(&config);

        let a = simulate_impact(&fit, &inference, &optimum, &config).unwrap();
        let b = simulate_impact(&fit, &inference, &optimum, &config).unwrap();

        assert_eq!(a.uplifts.len(), b.uplifts.len());
        for (ua, ub) in a.uplifts.iter().zip(b.uplifts.iter()) {
            assert_eq!(ua, ub, "replicates must not depend on scheduling");
        }
        assert_eq!(a.summary.mean_uplift, b.summary.mean_uplift);
        assert_eq!(a.summary.q975, b.summary.q975);
    }

    #[test]
    fn repricing_toward_the_optimum_pays_off() {
        // Baseline 25% sits well below the profit-optimal markup under the
        // default truth, so the uplift distribution should be firmly
        // positive.
        let config = test_config(42);
        let (fit, inference, optimum) = fitted_pipeline(&config);
        let impact = simulate_impact(&fit, &inference, &optimum, &config).unwrap();

        assert!(impact.summary.mean_uplift > 0.0);
        assert!(impact.summary.prob_positive > 0.8);
        assert!(impact.summary.mean_profit_optimal > impact.summary.mean_profit_baseline);
    }

    #[test]
    fn quantiles_are_ordered() {
        let config = test_config(7);
        let (fit, inference, optimum) = fitted_pipeline(&config);
        let s = simulate_impact(&fit, &inference, &optimum, &config)
            .unwrap()
            .summary;

        assert!(s.q025 <= s.q25);
        assert!(s.q25 <= s.median);
        assert!(s.median <= s.q75);
        assert!(s.q75 <= s.q975);
        assert!(s.sd_uplift >= 0.0);
    }

    #[test]
    fn identical_arms_yield_exactly_zero_uplift() {
        // With baseline == optimum, common random numbers make both arms
        // identical in every replicate.
        let mut config = test_config(11);
        let (fit, inference, mut optimum) = fitted_pipeline(&config);
        config.baseline_markup = 40.0;
        optimum.markup_pct = 40.0;

        let impact = simulate_impact(&fit, &inference, &optimum, &config).unwrap();
        assert!(impact.uplifts.iter().all(|&u| u == 0.0));
        assert_eq!(impact.summary.prob_positive, 0.0);
        assert_eq!(impact.summary.sd_uplift, 0.0);
    }

    #[test]
    fn tiny_replicate_count_is_rejected() {
        let mut config = test_config(3);
        config.replicates = 5;
        let (fit, inference, optimum) = fitted_pipeline(&config);
        let err = simulate_impact(&fit, &inference, &optimum, &config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn quantile_interpolates_between_order_statistics() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 5.0);
        assert_eq!(quantile(&sorted, 0.5), 3.0);
        assert!((quantile(&sorted, 0.375) - 2.5).abs() < 1e-12);
    }
}
