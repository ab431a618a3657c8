//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisConfig, ImpactSummary, MarkupOptimum, ModelKind};

/// Flagged influence cases shown in the terminal table.
const TOP_INFLUENCE: usize = 10;

/// Format the full run summary (dataset stats + model comparison + coefficients).
pub fn format_run_summary(run: &RunOutput, config: &AnalysisConfig) -> String {
    let stats = &run.dataset.stats;
    let mut out = String::new();

    out.push_str("=== markopt - Profit-Optimal Markup Analysis ===\n");
    out.push_str(&format!("Seed: {}\n", config.seed));
    out.push_str(&format!(
        "Sample: n={} | sold={} ({:.1}%)\n",
        stats.n_records,
        stats.n_sold,
        100.0 * stats.sold_share
    ));
    out.push_str(&format!(
        "Markup: [{:.1}, {:.1}]% | Cost: [${:.2}, ${:.2}]\n",
        stats.markup_min, stats.markup_max, stats.cost_min, stats.cost_max
    ));
    out.push_str(&format!(
        "Mix: apparel={} electronics={} home={}\n",
        stats.n_apparel, stats.n_electronics, stats.n_home
    ));

    out.push_str("\nModel comparison:\n");
    out.push_str(&format!(
        "  {:<30} {:>3} {:>10} {:>10} {:>10} {:>8}\n",
        "formula", "k", "deviance", "AIC", "BIC", "R2_McF"
    ));
    for (i, fit) in run.selection.fits.iter().enumerate() {
        let chosen = if i == run.selection.best_index { "*" } else { " " };
        let q = &fit.quality;
        out.push_str(&format!(
            "{chosen} {:<30} {:>3} {:>10.2} {:>10.2} {:>10.2} {:>8.4}\n",
            fit.fit.kind.formula(),
            q.k,
            q.deviance,
            q.aic,
            q.bic,
            q.mcfadden
        ));
    }
    for (kind, reason) in &run.selection.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.formula()));
    }

    out.push_str(&format!(
        "\nCoefficients ({}% profile-likelihood intervals):\n",
        (config.level * 100.0).round()
    ));
    out.push_str(&format!(
        "  {:<30} {:>10} {:>8} {:>7} {:>9} {:>20} {:>8} {:>8}\n",
        "coefficient", "estimate", "SE", "z", "p", "CI", "OR", "truth"
    ));
    let truth = truth_by_name(run);
    for row in &run.inference.estimates {
        let ci = format!("[{:+.4}, {:+.4}]", row.profile_low, row.profile_high);
        let ci = if row.profile_fallback {
            format!("{ci} (Wald)")
        } else {
            ci
        };
        let truth_col = truth
            .iter()
            .find(|(name, _)| *name == row.name)
            .map(|(_, v)| format!("{v:+.4}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:<30} {:>+10.4} {:>8.4} {:>7.2} {:>9} {:>20} {:>8.3} {:>8}\n",
            row.name,
            row.estimate,
            row.se,
            row.z_value,
            fmt_p(row.p_value),
            ci,
            row.odds_ratio,
            truth_col
        ));
    }

    out
}

/// Format the diagnostics block (binned residuals + influence).
pub fn format_diagnostics(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("Diagnostics:\n");
    for binned in [&run.binned_prob, &run.binned_markup] {
        out.push_str(&format!(
            "- binned residuals by {}: {}/{} bins inside the +/-2SE band\n",
            binned.axis,
            binned.inside,
            binned.total()
        ));
    }

    let diag = &run.influence;
    out.push_str(&format!(
        "- DFBETAS cutoff 2/sqrt(n) = {:.4}: {} observation(s) flagged, max |DFBETAS| = {:.4}\n",
        diag.threshold,
        diag.flagged_cases(),
        diag.max_abs()
    ));

    if !diag.flagged.is_empty() {
        out.push_str(&format!(
            "  {:<20} {:<30} {:>10}\n",
            "id", "coefficient", "DFBETAS"
        ));
        for case in diag.flagged.iter().take(TOP_INFLUENCE) {
            out.push_str(&format!(
                "  {:<20} {:<30} {:>+10.4}\n",
                truncate(&case.id, 20),
                case.coef,
                case.dfbetas
            ));
        }
        if diag.flagged.len() > TOP_INFLUENCE {
            out.push_str(&format!(
                "  ... and {} more exceedance(s)\n",
                diag.flagged.len() - TOP_INFLUENCE
            ));
        }
    }

    out
}

/// Format the optimization result.
pub fn format_optimum(optimum: &MarkupOptimum, config: &AnalysisConfig) -> String {
    let mut out = String::new();
    out.push_str("Markup optimization:\n");
    out.push_str(&format!(
        "- searched [{:.1}, {:.1}]%, bracketed [{:.2}, {:.2}]%, {} refinement iteration(s)\n",
        config.markup_lo, config.markup_hi, optimum.bracket_lo, optimum.bracket_hi, optimum.iterations
    ));
    out.push_str(&format!(
        "- recommended markup: {:.2}% (expected profit ${:.3} per offer)\n",
        optimum.markup_pct, optimum.expected_profit
    ));
    out
}

/// Format the Monte Carlo impact table.
pub fn format_impact(summary: &ImpactSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Impact simulation ({} replicates x {} offers):\n",
        summary.replicates, summary.cohort
    ));
    out.push_str(&format!(
        "- profit per offer: ${:.3} at {:.2}% vs ${:.3} at the {:.1}% baseline\n",
        summary.mean_profit_optimal,
        summary.optimal_markup,
        summary.mean_profit_baseline,
        summary.baseline_markup
    ));
    out.push_str(&format!(
        "- uplift per offer: mean ${:.3} (sd {:.3}), P(uplift > 0) = {:.1}%\n",
        summary.mean_uplift,
        summary.sd_uplift,
        100.0 * summary.prob_positive
    ));
    out.push_str(&format!(
        "- quantiles: 2.5%={:.3} 25%={:.3} 50%={:.3} 75%={:.3} 97.5%={:.3}\n",
        summary.q025, summary.q25, summary.median, summary.q75, summary.q975
    ));
    out
}

/// Generating values aligned with coefficient names, where the selected
/// model has a counterpart in the simulation truth.
fn truth_by_name(run: &RunOutput) -> Vec<(&'static str, f64)> {
    let truth = run.dataset.truth;
    match run.selection.best().kind() {
        ModelKind::Null => vec![],
        ModelKind::Markup => vec![("markup_pct", truth.markup)],
        ModelKind::MarkupCost => vec![("markup_pct", truth.markup), ("unit_cost", truth.cost)],
        // The generating model has no interaction terms, so their truth is 0.
        ModelKind::Main | ModelKind::Interaction => vec![
            ("(Intercept)", truth.intercept),
            ("markup_pct", truth.markup),
            ("unit_cost", truth.cost),
            ("productElectronics", truth.electronics),
            ("productHome", truth.home),
            ("markup_pct:productElectronics", 0.0),
            ("markup_pct:productHome", 0.0),
        ],
    }
}

fn fmt_p(p: f64) -> String {
    if p < 1e-4 {
        "<1e-4".to_string()
    } else {
        format!("{p:.4}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
