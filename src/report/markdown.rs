//! The rendered article.
//!
//! `write_article` produces a self-contained Markdown report under the output
//! directory: narrative walkthrough, tables, inline math, references to the
//! SVG figures written by `plot::svg`, session metadata, and a short
//! bibliography. The structure mirrors the terminal summary but is written
//! for readers, not for grepping.

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::AnalysisConfig;
use crate::error::AppError;

/// File name of the article inside the output directory.
pub const ARTICLE_FILE: &str = "report.md";

/// Render the article and write it to `config.out_dir`.
pub fn write_article(run: &RunOutput, config: &AnalysisConfig) -> Result<PathBuf, AppError> {
    create_dir_all(&config.out_dir).map_err(|e| {
        AppError::config(format!(
            "Failed to create output directory '{}': {e}",
            config.out_dir.display()
        ))
    })?;

    let path = config.out_dir.join(ARTICLE_FILE);
    let body = render_article(run, config);

    let mut file = File::create(&path)
        .map_err(|e| AppError::config(format!("Failed to create '{}': {e}", path.display())))?;
    file.write_all(body.as_bytes())
        .map_err(|e| AppError::config(format!("Failed to write '{}': {e}", path.display())))?;

    Ok(path)
}

/// Render the article body as a Markdown string.
pub fn render_article(run: &RunOutput, config: &AnalysisConfig) -> String {
    let stats = &run.dataset.stats;
    let truth = &run.dataset.truth;
    let best = run.selection.best();
    let mut out = String::new();

    out.push_str("# Pricing by demand curve: a profit-optimal markup for a simulated storefront\n\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- seed: {}\n", config.seed));
    out.push_str(&format!("- offers simulated: {}\n", stats.n_records));
    out.push_str(&format!("- tool: markopt {}\n\n", env!("CARGO_PKG_VERSION")));

    // --- Data ---
    out.push_str("## The simulated history\n\n");
    out.push_str(&format!(
        "One season of single-unit offers: {} products listed, {} sold \
         ({:.1}%). Historical markups ranged from {:.1}% to {:.1}% of unit \
         cost; production costs from ${:.2} to ${:.2}. Because the data are \
         simulated, the generating coefficients are known and reported next \
         to every estimate below.\n\n",
        stats.n_records,
        stats.n_sold,
        100.0 * stats.sold_share,
        stats.markup_min,
        stats.markup_max,
        stats.cost_min,
        stats.cost_max
    ));
    out.push_str("| category | offers |\n|---|---|\n");
    out.push_str(&format!("| apparel | {} |\n", stats.n_apparel));
    out.push_str(&format!("| electronics | {} |\n", stats.n_electronics));
    out.push_str(&format!("| home | {} |\n\n", stats.n_home));
    out.push_str(&format!("![Demand curves by product]({FIG_DEMAND})\n\n"));

    // --- Model ---
    out.push_str("## Choosing a demand model\n\n");
    out.push_str(
        "Each candidate is a logistic regression of the sale outcome on the \
         offer's terms, $\\log \\frac{p}{1-p} = x^\\top \\beta$, fitted by \
         maximum likelihood. With a Bernoulli outcome the deviance is \
         $-2\\log L$ exactly, so $\\mathrm{BIC} = \\mathrm{deviance} + k \\ln n$ \
         and differences read directly as evidence strength. A simpler model \
         within 2 BIC points of the minimum wins the tie.\n\n",
    );
    out.push_str("| formula | k | deviance | AIC | BIC | McFadden $R^2$ | |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for (i, fit) in run.selection.fits.iter().enumerate() {
        let q = &fit.quality;
        let chosen = if i == run.selection.best_index {
            "selected"
        } else {
            ""
        };
        out.push_str(&format!(
            "| `{}` | {} | {:.2} | {:.2} | {:.2} | {:.4} | {chosen} |\n",
            fit.fit.kind.formula(),
            q.k,
            q.deviance,
            q.aic,
            q.bic,
            q.mcfadden
        ));
    }
    for (kind, reason) in &run.selection.skipped {
        out.push_str(&format!("\n*Skipped `{}`: {reason}*\n", kind.formula()));
    }
    out.push('\n');

    // --- Coefficients ---
    out.push_str(&format!(
        "## Coefficients ({:.0}% profile-likelihood intervals)\n\n",
        config.level * 100.0
    ));
    out.push_str(
        "Intervals come from profiling the deviance; where a profile bound \
         could not be bracketed the Wald interval is shown and marked. Odds \
         ratios exponentiate the estimate and its interval.\n\n",
    );
    out.push_str("| coefficient | estimate | SE | z | CI | odds ratio |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for row in &run.inference.estimates {
        let mark = if row.profile_fallback { " (Wald)" } else { "" };
        out.push_str(&format!(
            "| `{}` | {:+.4} | {:.4} | {:.2} | [{:+.4}, {:+.4}]{mark} | {:.3} [{:.3}, {:.3}] |\n",
            row.name,
            row.estimate,
            row.se,
            row.z_value,
            row.profile_low,
            row.profile_high,
            row.odds_ratio,
            row.or_low,
            row.or_high
        ));
    }
    out.push_str(&format!(
        "\nGenerating values: intercept {:+.3}, markup {:+.3} per point, cost \
         {:+.3} per dollar, electronics {:+.3}, home {:+.3} (log-odds scale). \
         A 5-point markup increase multiplies the sale odds by \
         $e^{{5 \\hat\\beta_{{\\mathrm{{markup}}}}}}$.\n\n",
        truth.intercept, truth.markup, truth.cost, truth.electronics, truth.home
    ));

    // --- Diagnostics ---
    out.push_str("## Does the model hold up?\n\n");
    for binned in [&run.binned_prob, &run.binned_markup] {
        out.push_str(&format!(
            "Binned residuals by {}: {} of {} bins inside the \
             $\\pm 2\\sqrt{{p(1-p)/n_b}}$ band.\n\n",
            binned.axis,
            binned.inside,
            binned.total()
        ));
    }
    out.push_str(&format!("![Binned residuals]({FIG_BINNED})\n\n"));

    let diag = &run.influence;
    out.push_str(&format!(
        "Case influence: DFBETAS against the $2/\\sqrt{{n}}$ cutoff \
         ({:.4}) flags {} observation(s); the largest displacement is \
         {:.4} standard errors.\n",
        diag.threshold,
        diag.flagged_cases(),
        diag.max_abs()
    ));
    if !diag.flagged.is_empty() {
        out.push_str("\n| id | coefficient | DFBETAS |\n|---|---|---|\n");
        for case in diag.flagged.iter().take(5) {
            out.push_str(&format!(
                "| {} | `{}` | {:+.4} |\n",
                case.id, case.coef, case.dfbetas
            ));
        }
    }
    out.push('\n');

    // --- Optimization ---
    out.push_str("## The profit-optimal markup\n\n");
    out.push_str(&format!(
        "Expected profit per offer at markup $m$ averages \
         $\\hat p(m, c_i, g_i) \\cdot c_i \\cdot m / 100$ over the observed \
         catalog. A coarse scan over [{:.0}%, {:.0}%] brackets the peak and \
         golden-section refinement settles it in {} iteration(s):\n\n",
        config.markup_lo, config.markup_hi, run.optimum.iterations
    ));
    out.push_str(&format!(
        "**Recommended markup: {:.2}%**, worth ${:.3} of expected profit per \
         offer.\n\n",
        run.optimum.markup_pct, run.optimum.expected_profit
    ));
    out.push_str(&format!("![Expected profit by markup]({FIG_PROFIT})\n\n"));

    // --- Impact ---
    if let Some(impact) = &run.impact {
        let s = &impact.summary;
        out.push_str("## What is repricing worth?\n\n");
        out.push_str(&format!(
            "{} Monte Carlo replicates, each drawing coefficients from \
             $\\mathcal{{N}}(\\hat\\beta, \\hat\\Sigma)$ and pricing a fresh \
             cohort of {} offers at both markups with common random numbers:\n\n",
            s.replicates, s.cohort
        ));
        out.push_str("| | per offer |\n|---|---|\n");
        out.push_str(&format!(
            "| profit at {:.2}% (recommended) | ${:.3} |\n",
            s.optimal_markup, s.mean_profit_optimal
        ));
        out.push_str(&format!(
            "| profit at {:.1}% (baseline) | ${:.3} |\n",
            s.baseline_markup, s.mean_profit_baseline
        ));
        out.push_str(&format!(
            "| mean uplift | ${:.3} (sd {:.3}) |\n",
            s.mean_uplift, s.sd_uplift
        ));
        out.push_str(&format!(
            "| 95% interval | [${:.3}, ${:.3}] |\n",
            s.q025, s.q975
        ));
        out.push_str(&format!(
            "| P(uplift > 0) | {:.1}% |\n\n",
            100.0 * s.prob_positive
        ));
        out.push_str(&format!("![Uplift distribution]({FIG_UPLIFT})\n\n"));
    }

    // --- Session ---
    out.push_str("## Session\n\n");
    out.push_str(&format!(
        "- model: `{}` ({})\n",
        best.fit.kind.formula(),
        match config.model.to_kind() {
            Some(_) => "forced",
            None => "selected by BIC",
        }
    ));
    out.push_str(&format!("- confidence level: {}\n", config.level));
    out.push_str(&format!(
        "- markup search range: [{}, {}]%\n",
        config.markup_lo, config.markup_hi
    ));
    out.push_str(&format!("- baseline markup: {}%\n", config.baseline_markup));
    out.push_str(&format!(
        "- impact: {} replicates x {} offers\n\n",
        config.replicates, config.cohort
    ));

    // --- References ---
    out.push_str("## References\n\n");
    out.push_str("- Schwarz, G. (1978). Estimating the dimension of a model. *Annals of Statistics* 6(2).\n");
    out.push_str("- Gelman, A. & Hill, J. (2007). *Data Analysis Using Regression and Multilevel/Hierarchical Models*. Cambridge University Press.\n");
    out.push_str("- Belsley, D., Kuh, E. & Welsch, R. (1980). *Regression Diagnostics*. Wiley.\n");
    out.push_str("- Brent, R. (1973). *Algorithms for Minimization without Derivatives*. Prentice-Hall.\n");

    out
}

// Figure file names; `plot::svg` writes these into the same directory.
pub const FIG_DEMAND: &str = "fig_demand.svg";
pub const FIG_BINNED: &str = "fig_binned.svg";
pub const FIG_PROFIT: &str = "fig_profit.svg";
pub const FIG_UPLIFT: &str = "fig_uplift.svg";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_analysis;
    use crate::domain::{ModelChoice, TrueParams};
    use std::path::PathBuf;

    fn test_config(out_dir: PathBuf) -> AnalysisConfig {
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
            out_dir,
            export_data: None,
            export_results: None,
            export_summary: None,
            plot: false,
            plot_width: 100,
            plot_height: 25,
        }
    }

    #[test]
    fn article_contains_every_section() {
        let config = test_config(PathBuf::from("unused"));
        let run = run_analysis(&config).unwrap();
        let body = render_article(&run, &config);

        for heading in [
            "# Pricing by demand curve",
            "## The simulated history",
            "## Choosing a demand model",
            "## Coefficients",
            "## Does the model hold up?",
            "## The profit-optimal markup",
            "## What is repricing worth?",
            "## Session",
            "## References",
        ] {
            assert!(body.contains(heading), "missing section: {heading}");
        }
        for fig in [FIG_DEMAND, FIG_BINNED, FIG_PROFIT, FIG_UPLIFT] {
            assert!(body.contains(fig), "missing figure reference: {fig}");
        }
        assert!(body.contains("selected"));
        assert!(body.contains("Schwarz"));
    }

    #[test]
    fn article_quotes_the_recommendation() {
        let config = test_config(PathBuf::from("unused"));
        let run = run_analysis(&config).unwrap();
        let body = render_article(&run, &config);
        assert!(body.contains(&format!(
            "Recommended markup: {:.2}%",
            run.optimum.markup_pct
        )));
    }

    #[test]
    fn write_article_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().join("report"));
        let run = run_analysis(&config).unwrap();

        let path = write_article(&run, &config).unwrap();
        assert!(path.ends_with("report/report.md"));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# Pricing by demand curve"));
    }

    #[test]
    fn unwritable_output_directory_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let config = test_config(blocker.join("report"));
        let run = run_analysis(&config).unwrap();
        let err = write_article(&run, &config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
