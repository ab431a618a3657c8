//! Result exports: dataset CSV, per-observation CSV, and the JSON summary.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts; the JSON summary captures everything a rerun comparison needs.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::diagnostics::{BinnedResiduals, InfluenceDiagnostics};
use crate::domain::{
    AnalysisConfig, CoefEstimate, Dataset, DatasetStats, FitResult, ImpactSummary,
    InfluenceSummary, MarkupOptimum, SaleRecord, TrueParams,
};
use crate::error::AppError;
use crate::glm::GlmFit;

/// Write the simulated history to CSV.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create dataset CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(file, "id,markup_pct,unit_cost,product,sold")
        .map_err(|e| AppError::config(format!("Failed to write dataset CSV header: {e}")))?;

    for r in &dataset.records {
        writeln!(
            file,
            "{},{:.6},{:.6},{},{}",
            r.id,
            r.markup_pct,
            r.unit_cost,
            r.product.display_name(),
            u8::from(r.sold)
        )
        .map_err(|e| AppError::config(format!("Failed to write dataset CSV row: {e}")))?;
    }

    Ok(())
}

/// Write per-observation results (fitted, residual, influence) to CSV.
pub fn write_results_csv(
    path: &Path,
    records: &[SaleRecord],
    fit: &GlmFit,
    influence: &InfluenceDiagnostics,
) -> Result<(), AppError> {
    if records.len() != fit.fitted.len() || records.len() != influence.leverage.len() {
        return Err(AppError::numeric("Export inputs disagree on record count."));
    }

    let mut file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create results CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(
        file,
        "id,markup_pct,unit_cost,product,sold,fitted,residual,leverage,max_abs_dfbetas"
    )
    .map_err(|e| AppError::config(format!("Failed to write results CSV header: {e}")))?;

    for (i, r) in records.iter().enumerate() {
        let y = if r.sold { 1.0 } else { 0.0 };
        writeln!(
            file,
            "{},{:.6},{:.6},{},{},{:.6},{:.6},{:.6},{:.6}",
            r.id,
            r.markup_pct,
            r.unit_cost,
            r.product.display_name(),
            u8::from(r.sold),
            fit.fitted[i],
            y - fit.fitted[i],
            influence.leverage[i],
            influence.case_max_abs(i)
        )
        .map_err(|e| AppError::config(format!("Failed to write results CSV row: {e}")))?;
    }

    Ok(())
}

/// Everything a rerun comparison needs, in one JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub seed: u64,
    pub level: f64,
    pub truth: TrueParams,
    pub dataset: DatasetStats,
    pub models: Vec<FitResult>,
    pub selected: String,
    pub coefficients: Vec<CoefEstimate>,
    pub binned_by_prob: BinnedResiduals,
    pub binned_by_markup: BinnedResiduals,
    pub influence: InfluenceSummary,
    pub optimum: MarkupOptimum,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactSummary>,
}

impl AnalysisSummary {
    pub fn from_run(run: &RunOutput, config: &AnalysisConfig) -> Self {
        AnalysisSummary {
            seed: config.seed,
            level: config.level,
            truth: run.dataset.truth,
            dataset: run.dataset.stats.clone(),
            models: run.selection.results(),
            selected: run.selection.best().kind().formula().to_string(),
            coefficients: run.inference.estimates.clone(),
            binned_by_prob: run.binned_prob.clone(),
            binned_by_markup: run.binned_markup.clone(),
            influence: run.influence.summary(),
            optimum: run.optimum.clone(),
            impact: run.impact.as_ref().map(|i| i.summary.clone()),
        }
    }
}

/// Write the full analysis summary to pretty-printed JSON.
pub fn write_summary_json(
    path: &Path,
    run: &RunOutput,
    config: &AnalysisConfig,
) -> Result<(), AppError> {
    let summary = AnalysisSummary::from_run(run, config);
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| AppError::numeric(format!("Failed to serialize summary: {e}")))?;

    let mut file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create summary JSON '{}': {e}",
            path.display()
        ))
    })?;
    file.write_all(json.as_bytes())
        .map_err(|e| AppError::config(format!("Failed to write summary JSON: {e}")))?;
    writeln!(file).map_err(|e| AppError::config(format!("Failed to write summary JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_analysis;
    use crate::domain::{ModelChoice, TrueParams};
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
    fn dataset_csv_has_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let config = test_config();
        let run = run_analysis(&config).unwrap();

        write_dataset_csv(&path, &run.dataset).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "id,markup_pct,unit_cost,product,sold");
        assert_eq!(lines.len(), 1 + run.dataset.records.len());
        assert!(lines[1].contains(','));
    }

    #[test]
    fn results_csv_rows_align_with_the_fit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let config = test_config();
        let run = run_analysis(&config).unwrap();

        write_results_csv(
            &path,
            &run.dataset.records,
            &run.selection.best().fit,
            &run.influence,
        )
        .unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 1 + run.dataset.records.len());
        // Each data row carries all nine fields.
        assert_eq!(lines[1].split(',').count(), 9);
    }

    #[test]
    fn summary_json_round_trips_the_headline_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let config = test_config();
        let run = run_analysis(&config).unwrap();

        write_summary_json(&path, &run, &config).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(parsed["seed"], 42);
        assert_eq!(parsed["selected"], "sold ~ markup + cost + product");
        let opt = parsed["optimum"]["markup_pct"].as_f64().unwrap();
        assert!((opt - run.optimum.markup_pct).abs() < 1e-9);
        assert!(parsed["impact"]["mean_uplift"].is_f64());
        assert_eq!(parsed["models"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn unwritable_export_path_is_a_config_error() {
        let config = test_config();
        let run = run_analysis(&config).unwrap();
        let err =
            write_dataset_csv(Path::new("/nonexistent-dir/data.csv"), &run.dataset).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let config = test_config();
        let run = run_analysis(&config).unwrap();

        let err = write_results_csv(
            &path,
            &run.dataset.records[..10],
            &run.selection.best().fit,
            &run.influence,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
