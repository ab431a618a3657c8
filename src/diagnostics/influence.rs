//! Case influence diagnostics: leverage and DFBETAS.
//!
//! DFBETAS uses the standard one-step deletion approximation for GLMs:
//!
//! ```text
//! dfbeta_i  = (X'WX)^-1 x_i (y_i - mu_i) / (1 - h_i)
//! dfbetas_i = dfbeta_i ./ SE
//! h_i       = w_i * x_i' (X'WX)^-1 x_i
//! ```
//!
//! so no refits are needed. Cases are flagged against the conventional
//! `2 / sqrt(n)` cutoff.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::{InfluenceSummary, SaleRecord};
use crate::error::AppError;
use crate::glm::{build_design, GlmFit};

/// One coefficient-level exceedance of the DFBETAS cutoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedCase {
    pub index: usize,
    pub id: String,
    pub coef: String,
    pub dfbetas: f64,
}

/// Influence diagnostics for every observation under the selected model.
#[derive(Debug, Clone)]
pub struct InfluenceDiagnostics {
    /// DFBETAS cutoff, `2 / sqrt(n)`.
    pub threshold: f64,
    /// Hat-matrix diagonal per observation.
    pub leverage: Vec<f64>,
    /// `n x k` standardized coefficient displacements.
    pub dfbetas: DMatrix<f64>,
    /// Exceedances sorted by magnitude, largest first.
    pub flagged: Vec<FlaggedCase>,
}

impl InfluenceDiagnostics {
    /// Largest |DFBETAS| across coefficients for one observation.
    pub fn case_max_abs(&self, i: usize) -> f64 {
        self.dfbetas.row(i).amax()
    }

    pub fn max_abs(&self) -> f64 {
        if self.dfbetas.is_empty() {
            0.0
        } else {
            self.dfbetas.amax()
        }
    }

    /// Number of distinct observations with at least one exceedance.
    pub fn flagged_cases(&self) -> usize {
        let mut seen: Vec<usize> = self.flagged.iter().map(|f| f.index).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    pub fn summary(&self) -> InfluenceSummary {
        InfluenceSummary {
            threshold: self.threshold,
            flagged: self.flagged_cases(),
            max_abs_dfbetas: self.max_abs(),
        }
    }
}

/// Compute leverage and DFBETAS from a converged fit and its covariance.
pub fn influence(
    records: &[SaleRecord],
    fit: &GlmFit,
    covariance: &DMatrix<f64>,
) -> Result<InfluenceDiagnostics, AppError> {
    let n = records.len();
    let k = fit.k;
    if n != fit.fitted.len() {
        return Err(AppError::numeric("Fit does not match the record count."));
    }
    if covariance.nrows() != k || covariance.ncols() != k {
        return Err(AppError::numeric("Covariance dimension mismatch."));
    }

    let design = build_design(records, fit.kind);
    let names = fit.kind.coef_names();

    let se: Vec<f64> = (0..k).map(|j| covariance[(j, j)].sqrt()).collect();
    if se.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return Err(AppError::numeric("Invalid standard errors for DFBETAS."));
    }

    let threshold = 2.0 / (n as f64).sqrt();
    let mut leverage = Vec::with_capacity(n);
    let mut dfbetas = DMatrix::zeros(n, k);
    let mut flagged = Vec::new();

    for i in 0..n {
        let xi: DVector<f64> = design.x.row(i).transpose();
        let cxi = covariance * &xi;
        let h = (fit.weights[i] * xi.dot(&cxi)).clamp(0.0, 1.0);
        leverage.push(h);

        let y = if records[i].sold { 1.0 } else { 0.0 };
        let scale = (y - fit.fitted[i]) / (1.0 - h).max(1e-6);
        for j in 0..k {
            let value = cxi[j] * scale / se[j];
            dfbetas[(i, j)] = value;
            if value.abs() > threshold {
                flagged.push(FlaggedCase {
                    index: i,
                    id: records[i].id.clone(),
                    coef: names[j].to_string(),
                    dfbetas: value,
                });
            }
        }
    }

    flagged.sort_by(|a, b| {
        b.dfbetas
            .abs()
            .partial_cmp(&a.dfbetas.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(InfluenceDiagnostics {
        threshold,
        leverage,
        dfbetas,
        flagged,
    })
}
