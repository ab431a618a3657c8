//! Synthetic storefront history generation.
//!
//! We simulate one season of single-unit offers. Each record draws a product
//! category, a production cost, and a historical markup, then resolves the
//! sale from the true logistic model. The truth travels with the dataset so
//! downstream tables can put estimates and generating values side by side.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;

use crate::domain::{AnalysisConfig, Dataset, DatasetStats, ProductKind, SaleRecord, TrueParams};
use crate::error::AppError;
use crate::math::sigmoid;

/// Historical markup policy: percentages drawn uniformly over this range.
/// Wide on purpose so the demand curve is identified on both sides of the
/// eventual optimum.
pub const HIST_MARKUP_LO: f64 = 10.0;
pub const HIST_MARKUP_HI: f64 = 70.0;

/// Catalog mix: share of offers per category.
const MIX_APPAREL: f64 = 0.45;
const MIX_ELECTRONICS: f64 = 0.25;

/// Per-category cost distributions, log-normal `(ln median, sigma)`.
/// Medians roughly: apparel $18, electronics $55, home $32.
const COST_APPAREL: (f64, f64) = (2.890_371_757_896_165, 0.35);
const COST_ELECTRONICS: (f64, f64) = (4.007_333_185_232_471, 0.45);
const COST_HOME: (f64, f64) = (3.465_735_902_799_726, 0.40);

pub fn generate_dataset(config: &AnalysisConfig) -> Result<Dataset, AppError> {
    if config.sample_count < 10 {
        return Err(AppError::config("Sample count must be at least 10."));
    }
    let truth = config.truth;
    if !truth.as_main_coefs().iter().all(|b| b.is_finite()) {
        return Err(AppError::config("True parameters must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(dataset_seed(config));

    let mut records = Vec::with_capacity(config.sample_count);
    for i in 0..config.sample_count {
        let product = draw_product(&mut rng);
        let unit_cost = draw_unit_cost(&mut rng, product)?;
        let markup_pct = rng.gen_range(HIST_MARKUP_LO..=HIST_MARKUP_HI);

        let p_sale = sigmoid(truth.eta(markup_pct, unit_cost, product));
        let sold = rng.r#gen::<f64>() < p_sale;

        let id = format!("{}-{:04}", product.display_name(), i + 1);
        records.push(SaleRecord {
            id,
            markup_pct,
            unit_cost,
            product,
            sold,
        });
    }

    let stats = compute_stats(&records)
        .ok_or_else(|| AppError::numeric("Failed to compute dataset stats."))?;

    // A one-class outcome column makes the logistic likelihood unbounded.
    if stats.n_sold == 0 || stats.n_sold == stats.n_records {
        return Err(AppError::data(format!(
            "Degenerate simulated outcome: {} of {} offers sold. \
             Adjust the true parameters or the markup range.",
            stats.n_sold, stats.n_records
        )));
    }

    Ok(Dataset {
        records,
        stats,
        truth,
    })
}

/// Draw a product category from the catalog mix.
pub fn draw_product(rng: &mut StdRng) -> ProductKind {
    let roll: f64 = rng.r#gen();
    if roll < MIX_APPAREL {
        ProductKind::Apparel
    } else if roll < MIX_APPAREL + MIX_ELECTRONICS {
        ProductKind::Electronics
    } else {
        ProductKind::Home
    }
}

/// Draw a production cost for the given category.
pub fn draw_unit_cost(rng: &mut StdRng, product: ProductKind) -> Result<f64, AppError> {
    let (mu, sigma) = match product {
        ProductKind::Apparel => COST_APPAREL,
        ProductKind::Electronics => COST_ELECTRONICS,
        ProductKind::Home => COST_HOME,
    };
    let dist = LogNormal::new(mu, sigma)
        .map_err(|e| AppError::numeric(format!("Cost distribution error: {e}")))?;
    Ok(dist.sample(rng))
}

fn dataset_seed(config: &AnalysisConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.sample_count.hash(&mut hasher);
    config.truth.intercept.to_bits().hash(&mut hasher);
    config.truth.markup.to_bits().hash(&mut hasher);
    config.truth.cost.to_bits().hash(&mut hasher);
    config.truth.electronics.to_bits().hash(&mut hasher);
    config.truth.home.to_bits().hash(&mut hasher);
    HIST_MARKUP_LO.to_bits().hash(&mut hasher);
    HIST_MARKUP_HI.to_bits().hash(&mut hasher);
    hasher.finish()
}

fn compute_stats(records: &[SaleRecord]) -> Option<DatasetStats> {
    let mut markup_min = f64::INFINITY;
    let mut markup_max = f64::NEG_INFINITY;
    let mut cost_min = f64::INFINITY;
    let mut cost_max = f64::NEG_INFINITY;
    let mut n_sold = 0usize;
    let mut n_apparel = 0usize;
    let mut n_electronics = 0usize;
    let mut n_home = 0usize;

    for r in records {
        markup_min = markup_min.min(r.markup_pct);
        markup_max = markup_max.max(r.markup_pct);
        cost_min = cost_min.min(r.unit_cost);
        cost_max = cost_max.max(r.unit_cost);
        if r.sold {
            n_sold += 1;
        }
        match r.product {
            ProductKind::Apparel => n_apparel += 1,
            ProductKind::Electronics => n_electronics += 1,
            ProductKind::Home => n_home += 1,
        }
    }

    if !markup_min.is_finite() || !markup_max.is_finite() || !cost_min.is_finite() || !cost_max.is_finite() {
        return None;
    }

    Some(DatasetStats {
        n_records: records.len(),
        n_sold,
        sold_share: n_sold as f64 / records.len() as f64,
        markup_min,
        markup_max,
        cost_min,
        cost_max,
        n_apparel,
        n_electronics,
        n_home,
    })
}
