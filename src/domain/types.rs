//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and optimization
//! - exported to JSON/CSV
//! - reloaded later for comparisons across runs

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Product category of a simulated storefront item.
///
/// `Apparel` is the reference level in treatment coding: the product
/// coefficients in the fitted model measure log-odds shifts relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Apparel,
    Electronics,
    Home,
}

impl ProductKind {
    pub const ALL: [ProductKind; 3] = [
        ProductKind::Apparel,
        ProductKind::Electronics,
        ProductKind::Home,
    ];

    /// Human-readable label for tables and CSV exports.
    pub fn display_name(self) -> &'static str {
        match self {
            ProductKind::Apparel => "apparel",
            ProductKind::Electronics => "electronics",
            ProductKind::Home => "home",
        }
    }

    /// Treatment-coded dummy pair `(electronics, home)` against apparel.
    pub fn dummies(self) -> (f64, f64) {
        match self {
            ProductKind::Apparel => (0.0, 0.0),
            ProductKind::Electronics => (1.0, 0.0),
            ProductKind::Home => (0.0, 1.0),
        }
    }
}

/// Candidate model formulas, ordered from simplest to most complex.
///
/// The comparison table in the report shows all of them; selection picks by
/// BIC with a preference for the simplest model within the tie margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `sold ~ 1`
    Null,
    /// `sold ~ markup`
    Markup,
    /// `sold ~ markup + cost`
    MarkupCost,
    /// `sold ~ markup + cost + product`
    Main,
    /// `sold ~ markup * product + cost`
    Interaction,
}

impl ModelKind {
    /// All candidates in increasing complexity order.
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Null,
        ModelKind::Markup,
        ModelKind::MarkupCost,
        ModelKind::Main,
        ModelKind::Interaction,
    ];

    /// R-style formula label used in tables.
    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Null => "sold ~ 1",
            ModelKind::Markup => "sold ~ markup",
            ModelKind::MarkupCost => "sold ~ markup + cost",
            ModelKind::Main => "sold ~ markup + cost + product",
            ModelKind::Interaction => "sold ~ markup * product + cost",
        }
    }

    /// Number of coefficients (design-matrix columns).
    pub fn coef_len(self) -> usize {
        match self {
            ModelKind::Null => 1,
            ModelKind::Markup => 2,
            ModelKind::MarkupCost => 3,
            ModelKind::Main => 5,
            ModelKind::Interaction => 7,
        }
    }

    /// Coefficient names, aligned with the design-row layout.
    pub fn coef_names(self) -> &'static [&'static str] {
        const NULL: [&str; 1] = ["(Intercept)"];
        const MARKUP: [&str; 2] = ["(Intercept)", "markup_pct"];
        const MARKUP_COST: [&str; 3] = ["(Intercept)", "markup_pct", "unit_cost"];
        const MAIN: [&str; 5] = [
            "(Intercept)",
            "markup_pct",
            "unit_cost",
            "productElectronics",
            "productHome",
        ];
        const INTERACTION: [&str; 7] = [
            "(Intercept)",
            "markup_pct",
            "unit_cost",
            "productElectronics",
            "productHome",
            "markup_pct:productElectronics",
            "markup_pct:productHome",
        ];
        match self {
            ModelKind::Null => &NULL,
            ModelKind::Markup => &MARKUP,
            ModelKind::MarkupCost => &MARKUP_COST,
            ModelKind::Main => &MAIN,
            ModelKind::Interaction => &INTERACTION,
        }
    }
}

/// Which model(s) to fit (CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Fit every candidate and select by BIC.
    Auto,
    Null,
    Markup,
    MarkupCost,
    Main,
    Interaction,
}

impl ModelChoice {
    pub fn to_kind(self) -> Option<ModelKind> {
        match self {
            ModelChoice::Auto => None,
            ModelChoice::Null => Some(ModelKind::Null),
            ModelChoice::Markup => Some(ModelKind::Markup),
            ModelChoice::MarkupCost => Some(ModelKind::MarkupCost),
            ModelChoice::Main => Some(ModelKind::Main),
            ModelChoice::Interaction => Some(ModelKind::Interaction),
        }
    }
}

/// One product-sale observation.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub id: String,
    /// Listed markup as a percentage of unit cost.
    pub markup_pct: f64,
    /// Production cost in dollars.
    pub unit_cost: f64,
    pub product: ProductKind,
    /// Whether the offer converted to a sale.
    pub sold: bool,
}

/// The known simulation truth, on the log-odds scale.
///
/// Carried through the run so the report can show truth next to estimates
/// and the tests can check interval coverage against it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrueParams {
    pub intercept: f64,
    /// Log-odds change per markup point.
    pub markup: f64,
    /// Log-odds change per dollar of unit cost.
    pub cost: f64,
    /// Electronics offset vs apparel.
    pub electronics: f64,
    /// Home-goods offset vs apparel.
    pub home: f64,
}

impl TrueParams {
    /// Linear predictor under the truth for one offer.
    pub fn eta(&self, markup_pct: f64, unit_cost: f64, product: ProductKind) -> f64 {
        let offset = match product {
            ProductKind::Apparel => 0.0,
            ProductKind::Electronics => self.electronics,
            ProductKind::Home => self.home,
        };
        self.intercept + self.markup * markup_pct + self.cost * unit_cost + offset
    }

    /// Truth values in `ModelKind::Main` coefficient order.
    pub fn as_main_coefs(&self) -> [f64; 5] {
        [
            self.intercept,
            self.markup,
            self.cost,
            self.electronics,
            self.home,
        ]
    }
}

impl Default for TrueParams {
    fn default() -> Self {
        // Chosen so the profit-optimal markup lands in the high-30s while the
        // simulated history spans well past it on both sides.
        Self {
            intercept: 1.8,
            markup: -0.045,
            cost: -0.012,
            electronics: -0.8,
            home: 0.45,
        }
    }
}

/// Summary stats about the simulated records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_records: usize,
    pub n_sold: usize,
    pub sold_share: f64,
    pub markup_min: f64,
    pub markup_max: f64,
    pub cost_min: f64,
    pub cost_max: f64,
    pub n_apparel: usize,
    pub n_electronics: usize,
    pub n_home: usize,
}

/// The simulated storefront history plus the truth that generated it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<SaleRecord>,
    pub stats: DatasetStats,
    pub truth: TrueParams,
}

/// Fit quality for one candidate model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub n: usize,
    pub k: usize,
    pub deviance: f64,
    pub aic: f64,
    pub bic: f64,
    /// McFadden pseudo-R²: `1 - deviance / null_deviance`.
    pub mcfadden: f64,
}

/// One row of the model-comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub kind: ModelKind,
    pub formula: String,
    pub quality: FitQuality,
}

/// Per-coefficient inference output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefEstimate {
    pub name: String,
    pub estimate: f64,
    pub se: f64,
    pub z_value: f64,
    pub p_value: f64,
    pub wald_low: f64,
    pub wald_high: f64,
    /// Profile-likelihood interval (falls back to Wald when the profile
    /// deviance never crosses the threshold; see `profile_fallback`).
    pub profile_low: f64,
    pub profile_high: f64,
    pub profile_fallback: bool,
    pub odds_ratio: f64,
    pub or_low: f64,
    pub or_high: f64,
}

/// Result of the one-dimensional markup optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupOptimum {
    /// The recommended markup (percent of unit cost).
    pub markup_pct: f64,
    /// Expected profit per offer at the optimum, in dollars.
    pub expected_profit: f64,
    /// Golden-section iterations used after bracketing.
    pub iterations: usize,
    pub bracket_lo: f64,
    pub bracket_hi: f64,
}

/// Monte Carlo uplift distribution summary.
///
/// Uplift is measured per offer, in dollars: profit at the recommended
/// markup minus profit at the status-quo baseline, averaged over a cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub replicates: usize,
    pub cohort: usize,
    pub baseline_markup: f64,
    pub optimal_markup: f64,
    pub mean_profit_baseline: f64,
    pub mean_profit_optimal: f64,
    pub mean_uplift: f64,
    pub sd_uplift: f64,
    pub q025: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub q975: f64,
    /// Share of replicates with positive uplift.
    pub prob_positive: f64,
}

/// Compact influence view for exports (the full DFBETAS matrix stays
/// in memory only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceSummary {
    pub threshold: f64,
    pub flagged: usize,
    pub max_abs_dfbetas: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub seed: u64,
    pub sample_count: usize,
    pub truth: TrueParams,
    pub model: ModelChoice,

    /// Confidence level for intervals, e.g. `0.95`.
    pub level: f64,
    /// Binned-residual bin count; `0` means `floor(sqrt(n))`.
    pub bins: usize,

    /// Markup search range for the optimizer.
    pub markup_lo: f64,
    pub markup_hi: f64,
    /// Status-quo markup the impact simulation compares against.
    pub baseline_markup: f64,

    pub replicates: usize,
    pub cohort: usize,

    pub out_dir: PathBuf,
    pub export_data: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}
