//! Candidate-model comparison using BIC with guardrails.
//!
//! The tool fits each enabled formula and computes:
//! - deviance, McFadden pseudo-R²
//! - AIC = deviance + 2k
//! - BIC = deviance + k * ln(n)
//!
//! For a saturated-at-zero Bernoulli likelihood these are the exact
//! `-2 log L` forms, so BIC differences read directly as evidence strength.
//!
//! Selection rules:
//! 1. Exclude underdetermined candidates: require `n >= k + 5`
//! 2. Choose the candidate with minimum BIC
//! 3. If a simpler candidate sits within 2 BIC points of the minimum,
//!    pick the simpler one

use crate::domain::{AnalysisConfig, FitQuality, FitResult, ModelKind, SaleRecord};
use crate::error::AppError;
use crate::glm::irls::{fit_model, GlmFit};

/// Minimum number of extra observations beyond parameter count.
const MIN_N_BUFFER: usize = 5;

/// Margin within which a simpler model wins the tie.
const BIC_TIE_MARGIN: f64 = 2.0;

/// One fitted candidate with its comparison scores.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub fit: GlmFit,
    pub quality: FitQuality,
}

impl ModelFit {
    pub fn kind(&self) -> ModelKind {
        self.fit.kind
    }

    /// Serializable table row for reports and exports.
    pub fn to_fit_result(&self) -> FitResult {
        FitResult {
            kind: self.fit.kind,
            formula: self.fit.kind.formula().to_string(),
            quality: self.quality.clone(),
        }
    }
}

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    /// Fits for all attempted candidates (after guardrails), in
    /// increasing-complexity order.
    pub fits: Vec<ModelFit>,
    /// Candidates that were skipped and why (for diagnostics).
    pub skipped: Vec<(ModelKind, String)>,
    /// Index into `fits` of the selected candidate.
    pub best_index: usize,
}

impl FitSelection {
    pub fn best(&self) -> &ModelFit {
        &self.fits[self.best_index]
    }

    pub fn results(&self) -> Vec<FitResult> {
        self.fits.iter().map(ModelFit::to_fit_result).collect()
    }
}

/// Fit the candidate set and select the working model.
pub fn fit_and_select(
    records: &[SaleRecord],
    config: &AnalysisConfig,
) -> Result<FitSelection, AppError> {
    let n = records.len();

    let kinds: Vec<ModelKind> = match config.model.to_kind() {
        Some(kind) => vec![kind],
        None => ModelKind::ALL.to_vec(),
    };

    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for kind in kinds {
        let k = kind.coef_len();
        if n < k + MIN_N_BUFFER {
            skipped.push((
                kind,
                format!("Underdetermined: n={n} < k+{MIN_N_BUFFER}={}", k + MIN_N_BUFFER),
            ));
            continue;
        }

        match fit_model(records, kind) {
            Ok(fit) => {
                let quality = score(&fit);
                fits.push(ModelFit { fit, quality });
            }
            // A diverging candidate (separation, no convergence) should not
            // sink the run while simpler candidates remain viable.
            Err(e) => skipped.push((kind, e.to_string())),
        }
    }

    if fits.is_empty() {
        let reasons: Vec<String> = skipped
            .iter()
            .map(|(kind, why)| format!("{}: {why}", kind.formula()))
            .collect();
        return Err(AppError::data(format!(
            "No candidate model could be fitted. {}",
            reasons.join("; ")
        )));
    }

    let best_index = select_by_bic(&fits);

    Ok(FitSelection {
        fits,
        skipped,
        best_index,
    })
}

fn score(fit: &GlmFit) -> FitQuality {
    let n_f = fit.n as f64;
    let k_f = fit.k as f64;
    let mcfadden = if fit.null_deviance > 0.0 {
        1.0 - fit.deviance / fit.null_deviance
    } else {
        0.0
    };

    FitQuality {
        n: fit.n,
        k: fit.k,
        deviance: fit.deviance,
        aic: fit.deviance + 2.0 * k_f,
        bic: fit.deviance + k_f * n_f.ln(),
        mcfadden,
    }
}

fn select_by_bic(fits: &[ModelFit]) -> usize {
    let mut best = 0;
    for (i, f) in fits.iter().enumerate().skip(1) {
        if f.quality.bic < fits[best].quality.bic {
            best = i;
        }
    }
    let best_bic = fits[best].quality.bic;

    // Prefer simplicity when the evidence is thin.
    //
    // `fits` is in increasing-complexity order, so the first candidate
    // within the margin of the minimum is the simplest such candidate.
    for (i, f) in fits.iter().enumerate() {
        if f.quality.bic <= best_bic + BIC_TIE_MARGIN {
            return i;
        }
    }

    best
}
