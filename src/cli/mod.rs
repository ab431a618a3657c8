//! Command-line parsing for the markup analysis tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ModelChoice;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "markopt",
    version,
    about = "Profit-optimal markup analysis via a simulated logistic demand model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full analysis and write the Markdown article plus SVG figures.
    Report(RunArgs),
    /// Fit and diagnose only; print the terminal summary without writing files.
    Fit(RunArgs),
    /// Optimize the markup and simulate the repricing impact (for scripting).
    Impact(RunArgs),
}

/// Common options shared by all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Random seed; drives the simulated history and every replicate.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of historical offers to simulate.
    #[arg(short = 'n', long, default_value_t = 2000)]
    pub sample_count: usize,

    /// Which model(s) to fit.
    #[arg(long, value_enum, default_value_t = ModelChoice::Auto)]
    pub model: ModelChoice,

    /// Confidence level for coefficient intervals.
    #[arg(long, default_value_t = 0.95)]
    pub level: f64,

    /// Binned-residual bin count (0 = floor(sqrt(n))).
    #[arg(long, default_value_t = 0)]
    pub bins: usize,

    /// Lower end of the markup search range (percent of unit cost).
    #[arg(long, default_value_t = 5.0)]
    pub markup_lo: f64,

    /// Upper end of the markup search range (percent of unit cost).
    #[arg(long, default_value_t = 100.0)]
    pub markup_hi: f64,

    /// Status-quo markup the impact simulation compares against.
    #[arg(long, default_value_t = 30.0)]
    pub baseline_markup: f64,

    /// Monte Carlo replicates for the impact simulation.
    #[arg(long, default_value_t = 2000)]
    pub replicates: usize,

    /// Offers per simulated cohort in each replicate.
    #[arg(long, default_value_t = 1000)]
    pub cohort: usize,

    /// Output directory for the article and figures.
    #[arg(long, default_value = "markopt-report")]
    pub out: PathBuf,

    /// Export the simulated dataset to CSV.
    #[arg(long = "export-data")]
    pub export_data: Option<PathBuf>,

    /// Export per-observation results (fitted, residual, influence) to CSV.
    #[arg(long = "export-results")]
    pub export_results: Option<PathBuf>,

    /// Export the full analysis summary to JSON.
    #[arg(long = "export-summary")]
    pub export_summary: Option<PathBuf>,

    /// Render ASCII plots in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
