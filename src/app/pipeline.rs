//! Shared analysis pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! simulate -> fit candidates -> BIC selection -> inference -> diagnostics
//! -> markup optimization -> (optionally) Monte Carlo impact
//!
//! The subcommands then focus on presentation: terminal tables, the Markdown
//! article, figures, exports.

use crate::data::sim::generate_dataset;
use crate::diagnostics::{binned_residuals, influence, BinAxis, BinnedResiduals, InfluenceDiagnostics};
use crate::domain::{AnalysisConfig, Dataset, MarkupOptimum};
use crate::error::AppError;
use crate::glm::{fit_and_select, infer, FitSelection, Inference};
use crate::impact::{simulate_impact, ImpactResult};
use crate::profit::{maximize_profit, profit_curve, ProfitCurve};

/// Grid resolution for the sampled profit curve handed to the plots.
const CURVE_POINTS: usize = 121;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub selection: FitSelection,
    pub inference: Inference,
    pub binned_prob: BinnedResiduals,
    pub binned_markup: BinnedResiduals,
    pub influence: InfluenceDiagnostics,
    pub optimum: MarkupOptimum,
    pub curve: ProfitCurve,
    /// Present only when the impact stage ran.
    pub impact: Option<ImpactResult>,
}

/// Simulate, fit, diagnose, and optimize. No Monte Carlo impact.
pub fn run_fit(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let dataset = generate_dataset(config)?;
    let selection = fit_and_select(&dataset.records, config)?;
    let best = &selection.best().fit;

    let inference = infer(&dataset.records, best, config.level)?;

    let binned_prob = binned_residuals(&dataset.records, best, config.bins, BinAxis::FittedProb)?;
    let binned_markup = binned_residuals(&dataset.records, best, config.bins, BinAxis::Markup)?;
    let influence = influence(&dataset.records, best, &inference.covariance)?;

    let optimum = maximize_profit(&dataset.records, best, config.markup_lo, config.markup_hi)?;
    let curve = profit_curve(
        &dataset.records,
        best,
        config.markup_lo,
        config.markup_hi,
        CURVE_POINTS,
    );

    Ok(RunOutput {
        dataset,
        selection,
        inference,
        binned_prob,
        binned_markup,
        influence,
        optimum,
        curve,
        impact: None,
    })
}

/// Execute the complete pipeline including the impact simulation.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let mut run = run_fit(config)?;
    let impact = simulate_impact(
        &run.selection.best().fit,
        &run.inference,
        &run.optimum,
        config,
    )?;
    run.impact = Some(impact);
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelChoice, ModelKind, TrueParams};
    use std::path::PathBuf;

    fn test_config() -> AnalysisConfig {
        AnalysisConfig {
            seed: 42,
            sample_count: 1200,
            truth: TrueParams::default(),
            model: ModelChoice::Auto,
            level: 0.95,
            bins: 0,
            markup_lo: 5.0,
            markup_hi: 100.0,
            baseline_markup: 30.0,
            replicates: 100,
            cohort: 200,
            out_dir: PathBuf::from("markopt-report"),
            export_data: None,
            export_results: None,
            export_summary: None,
            plot: false,
            plot_width: 100,
            plot_height: 25,
        }
    }

    #[test]
    fn fit_pipeline_produces_consistent_outputs() {
        let config = test_config();
        let run = run_fit(&config).unwrap();

        assert_eq!(run.dataset.records.len(), 1200);
        assert_eq!(run.selection.best().kind(), ModelKind::Main);
        assert_eq!(
            run.inference.estimates.len(),
            run.selection.best().fit.k
        );
        assert!(run.optimum.markup_pct > config.markup_lo);
        assert!(run.optimum.markup_pct < config.markup_hi);
        assert_eq!(run.curve.markups.len(), CURVE_POINTS);
        assert!(run.impact.is_none());
    }

    #[test]
    fn full_pipeline_attaches_the_impact_stage() {
        let config = test_config();
        let run = run_analysis(&config).unwrap();

        let impact = run.impact.expect("impact stage must run");
        assert_eq!(impact.uplifts.len(), config.replicates);
        assert_eq!(impact.summary.baseline_markup, config.baseline_markup);
        assert!((impact.summary.optimal_markup - run.optimum.markup_pct).abs() < 1e-12);
    }
}
