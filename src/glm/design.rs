//! Design-matrix construction for the candidate formulas.
//!
//! Column layout per model (always intercept first):
//!
//! - `Null`:        [1]
//! - `Markup`:      [1, markup]
//! - `MarkupCost`:  [1, markup, cost]
//! - `Main`:        [1, markup, cost, electronics, home]
//! - `Interaction`: [1, markup, cost, electronics, home, markup*electronics, markup*home]
//!
//! Product dummies are treatment-coded against apparel, so the layout matches
//! `ModelKind::coef_names` one to one.

use nalgebra::{DMatrix, DVector};

use crate::domain::{ModelKind, ProductKind, SaleRecord};

/// Design matrix plus response for one candidate model.
#[derive(Debug, Clone)]
pub struct Design {
    pub kind: ModelKind,
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
}

pub fn build_design(records: &[SaleRecord], kind: ModelKind) -> Design {
    let n = records.len();
    let k = kind.coef_len();

    let mut x = DMatrix::zeros(n, k);
    for (i, r) in records.iter().enumerate() {
        let mut row = vec![0.0; k];
        fill_design_row(&mut row, kind, r.markup_pct, r.unit_cost, r.product);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }

    let y = DVector::from_fn(n, |i, _| if records[i].sold { 1.0 } else { 0.0 });

    Design { kind, x, y }
}

/// Fill one design row in place. `row` must have length `kind.coef_len()`.
///
/// Shared with the profit objective, which predicts at hypothetical markups
/// without materializing a record.
pub fn fill_design_row(
    row: &mut [f64],
    kind: ModelKind,
    markup_pct: f64,
    unit_cost: f64,
    product: ProductKind,
) {
    debug_assert_eq!(row.len(), kind.coef_len());
    let (e, h) = product.dummies();

    row[0] = 1.0;
    match kind {
        ModelKind::Null => {}
        ModelKind::Markup => {
            row[1] = markup_pct;
        }
        ModelKind::MarkupCost => {
            row[1] = markup_pct;
            row[2] = unit_cost;
        }
        ModelKind::Main => {
            row[1] = markup_pct;
            row[2] = unit_cost;
            row[3] = e;
            row[4] = h;
        }
        ModelKind::Interaction => {
            row[1] = markup_pct;
            row[2] = unit_cost;
            row[3] = e;
            row[4] = h;
            row[5] = markup_pct * e;
            row[6] = markup_pct * h;
        }
    }
}

/// Linear predictor for one hypothetical offer under fitted coefficients.
pub fn predict_eta(
    coefs: &DVector<f64>,
    kind: ModelKind,
    markup_pct: f64,
    unit_cost: f64,
    product: ProductKind,
) -> f64 {
    let mut row = vec![0.0; kind.coef_len()];
    fill_design_row(&mut row, kind, markup_pct, unit_cost, product);
    row.iter().zip(coefs.iter()).map(|(x, b)| x * b).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(markup: f64, cost: f64, product: ProductKind, sold: bool) -> SaleRecord {
        SaleRecord {
            id: "t-0001".to_string(),
            markup_pct: markup,
            unit_cost: cost,
            product,
            sold,
        }
    }

    #[test]
    fn column_counts_match_coef_names() {
        let records = vec![record(30.0, 20.0, ProductKind::Electronics, true)];
        for kind in ModelKind::ALL {
            let design = build_design(&records, kind);
            assert_eq!(design.x.ncols(), kind.coef_len());
            assert_eq!(design.x.ncols(), kind.coef_names().len());
            assert_eq!(design.x.nrows(), 1);
        }
    }

    #[test]
    fn interaction_row_layout() {
        let records = vec![record(40.0, 25.0, ProductKind::Home, false)];
        let design = build_design(&records, ModelKind::Interaction);
        let row: Vec<f64> = design.x.row(0).iter().copied().collect();
        assert_eq!(row, vec![1.0, 40.0, 25.0, 0.0, 1.0, 0.0, 40.0]);
        assert_eq!(design.y[0], 0.0);
    }

    #[test]
    fn apparel_is_the_reference_level() {
        let records = vec![record(40.0, 25.0, ProductKind::Apparel, true)];
        let design = build_design(&records, ModelKind::Main);
        assert_eq!(design.x[(0, 3)], 0.0);
        assert_eq!(design.x[(0, 4)], 0.0);
        assert_eq!(design.y[0], 1.0);
    }

    #[test]
    fn predict_eta_matches_matrix_product() {
        let records = vec![
            record(22.0, 18.5, ProductKind::Electronics, true),
            record(61.0, 44.0, ProductKind::Home, false),
        ];
        let design = build_design(&records, ModelKind::Interaction);
        let coefs = DVector::from_vec(vec![0.5, -0.03, -0.01, -0.6, 0.3, 0.002, -0.004]);
        let eta = &design.x * &coefs;
        for (i, r) in records.iter().enumerate() {
            let direct = predict_eta(&coefs, ModelKind::Interaction, r.markup_pct, r.unit_cost, r.product);
            assert!((eta[i] - direct).abs() < 1e-12);
        }
    }
}
