//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - simulates the storefront history
//! - runs fitting + model selection + diagnostics
//! - optimizes the markup and simulates the impact
//! - prints reports/plots and writes the article + exports

use clap::Parser;

use crate::cli::{Command, RunArgs};
use crate::domain::AnalysisConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `markopt` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    // We want bare `markopt` and `markopt --seed 7` to behave like
    // `markopt report ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing. This preserves a clean clap structure while
    // retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Fit(args) => handle_fit(args),
        Command::Impact(args) => handle_impact(args),
    }
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

fn handle_report(args: RunArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let run = pipeline::run_analysis(&config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));
    println!("{}", crate::report::format_diagnostics(&run));
    println!("{}", crate::report::format_optimum(&run.optimum, &config));
    if let Some(impact) = &run.impact {
        println!("{}", crate::report::format_impact(&impact.summary));
    }

    if config.plot {
        println!(
            "{}",
            crate::plot::render_profit_curve(
                &run.curve,
                &run.optimum,
                config.plot_width,
                config.plot_height
            )
        );
    }

    let figures = crate::plot::write_figures(&run, &config)?;
    let article = crate::report::write_article(&run, &config)?;
    println!("Wrote {}", article.display());
    for f in figures {
        println!("Wrote {}", f.display());
    }

    write_exports(&run, &config)
}

fn handle_fit(args: RunArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));
    println!("{}", crate::report::format_diagnostics(&run));
    println!("{}", crate::report::format_optimum(&run.optimum, &config));

    if config.plot {
        println!(
            "{}",
            crate::plot::render_binned_residuals(
                &run.binned_prob,
                config.plot_width,
                config.plot_height
            )
        );
    }

    write_exports(&run, &config)
}

fn handle_impact(args: RunArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let run = pipeline::run_analysis(&config)?;

    println!("{}", crate::report::format_optimum(&run.optimum, &config));
    if let Some(impact) = &run.impact {
        println!("{}", crate::report::format_impact(&impact.summary));
    }

    write_exports(&run, &config)
}

fn write_exports(run: &pipeline::RunOutput, config: &AnalysisConfig) -> Result<(), AppError> {
    if let Some(path) = &config.export_data {
        crate::io::write_dataset_csv(path, &run.dataset)?;
    }
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(
            path,
            &run.dataset.records,
            &run.selection.best().fit,
            &run.influence,
        )?;
    }
    if let Some(path) = &config.export_summary {
        crate::io::write_summary_json(path, run, config)?;
    }
    Ok(())
}

pub fn analysis_config_from_args(args: &RunArgs) -> AnalysisConfig {
    AnalysisConfig {
        seed: args.seed,
        sample_count: args.sample_count,
        truth: Default::default(),
        model: args.model,
        level: args.level,
        bins: args.bins,
        markup_lo: args.markup_lo,
        markup_hi: args.markup_hi,
        baseline_markup: args.baseline_markup,
        replicates: args.replicates,
        cohort: args.cohort,
        out_dir: args.out.clone(),
        export_data: args.export_data.clone(),
        export_results: args.export_results.clone(),
        export_summary: args.export_summary.clone(),
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
    }
}

/// Rewrite argv so `markopt` defaults to `markopt report`.
///
/// Rules:
/// - `markopt`                      -> `markopt report`
/// - `markopt --seed 7 ...`         -> `markopt report --seed 7 ...`
/// - `markopt --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("report".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "report" | "fit" | "impact");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "report flags".
    if arg1.starts_with('-') {
        argv.insert(1, "report".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_report() {
        assert_eq!(rewrite_args(argv(&["markopt"])), argv(&["markopt", "report"]));
    }

    #[test]
    fn leading_flag_goes_to_report() {
        assert_eq!(
            rewrite_args(argv(&["markopt", "--seed", "7"])),
            argv(&["markopt", "report", "--seed", "7"])
        );
    }

    #[test]
    fn explicit_subcommands_pass_through() {
        for sub in ["report", "fit", "impact"] {
            assert_eq!(
                rewrite_args(argv(&["markopt", sub])),
                argv(&["markopt", sub])
            );
        }
    }

    #[test]
    fn help_and_version_pass_through() {
        for flag in ["-h", "--help", "-V", "--version", "help"] {
            assert_eq!(
                rewrite_args(argv(&["markopt", flag])),
                argv(&["markopt", flag])
            );
        }
    }
}
