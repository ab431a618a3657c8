//! Logistic-regression fitting via iteratively reweighted least squares.
//!
//! Each iteration linearizes the log-likelihood at the current estimate and
//! solves the resulting weighted least-squares problem through the shared SVD
//! path. Safeguards:
//!
//! - fitted probabilities clamped away from 0/1 before forming weights
//! - working weights floored so the WLS system stays well-conditioned
//! - step-halving when a proposed update worsens the deviance
//! - a hard cap on coefficient magnitude, which turns complete separation
//!   into a clean numeric error instead of a runaway fit

use nalgebra::{DMatrix, DVector};

use crate::domain::{ModelKind, SaleRecord};
use crate::error::AppError;
use crate::glm::design::build_design;
use crate::math::{apply_sqrt_weights, log1pexp, logit, sigmoid, solve_least_squares, PROB_EPS};

/// IRLS iteration cap. Well-posed problems settle in well under 10.
pub const MAX_IRLS_ITER: usize = 50;

/// Relative-deviance convergence tolerance (same form as R's `glm.control`):
/// `|D_t - D_{t-1}| / (|D_t| + 0.1) < DEV_TOL`.
const DEV_TOL: f64 = 1e-8;

/// Floor for the working weights `mu * (1 - mu)`.
const MIN_WEIGHT: f64 = 1e-6;

/// Maximum step-halvings per iteration before giving up.
const MAX_HALVINGS: usize = 10;

/// Coefficient magnitude beyond which we call the fit separated.
const BETA_LIMIT: f64 = 1e4;

/// A converged logistic fit for one candidate model.
#[derive(Debug, Clone)]
pub struct GlmFit {
    pub kind: ModelKind,
    /// Coefficients in `ModelKind::coef_names` order.
    pub coefs: DVector<f64>,
    pub deviance: f64,
    /// Deviance of the intercept-only fit on the same response.
    pub null_deviance: f64,
    /// Fitted sale probabilities, one per observation.
    pub fitted: Vec<f64>,
    /// Linear predictor per observation.
    pub eta: Vec<f64>,
    /// Final IRLS working weights `mu * (1 - mu)` per observation.
    pub weights: Vec<f64>,
    pub iterations: usize,
    pub n: usize,
    pub k: usize,
}

/// Raw IRLS output before model bookkeeping is attached.
#[derive(Debug, Clone)]
pub struct IrlsFit {
    pub coefs: DVector<f64>,
    pub deviance: f64,
    pub fitted: Vec<f64>,
    pub eta: Vec<f64>,
    pub weights: Vec<f64>,
    pub iterations: usize,
}

/// Fit one candidate model to the sale records.
pub fn fit_model(records: &[SaleRecord], kind: ModelKind) -> Result<GlmFit, AppError> {
    let design = build_design(records, kind);
    let irls = fit_logistic(&design.x, &design.y, None)?;
    let null_dev = null_deviance(&design.y);

    Ok(GlmFit {
        kind,
        coefs: irls.coefs,
        deviance: irls.deviance,
        null_deviance: null_dev,
        fitted: irls.fitted,
        eta: irls.eta,
        weights: irls.weights,
        iterations: irls.iterations,
        n: design.x.nrows(),
        k: design.x.ncols(),
    })
}

/// Fit a logistic regression of `y` on `x`, optionally with a per-observation
/// offset added to the linear predictor.
///
/// The offset path is what the profile-likelihood machinery uses: to pin one
/// coefficient, its column is dropped from `x` and `value * column` is passed
/// here as the offset.
pub fn fit_logistic(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    offset: Option<&DVector<f64>>,
) -> Result<IrlsFit, AppError> {
    let n = x.nrows();
    let k = x.ncols();
    if n == 0 {
        return Err(AppError::data("Cannot fit a model to zero observations."));
    }
    if y.len() != n {
        return Err(AppError::numeric("Design/response length mismatch."));
    }
    if let Some(o) = offset {
        if o.len() != n {
            return Err(AppError::numeric("Offset length mismatch."));
        }
    }

    // Start at the empty model: intercept at the sample log-odds, the rest
    // zero. Column 0 is the intercept in every candidate design. When an
    // offset is present (pinned-coefficient refits) the design may have no
    // intercept column, so start from zero and let the offset carry the
    // signal.
    let mut beta = DVector::zeros(k);
    if offset.is_none() {
        let p_bar = y.mean().clamp(PROB_EPS, 1.0 - PROB_EPS);
        beta[0] = logit(p_bar);
    }

    let mut eta = linear_predictor(x, &beta, offset);
    let mut deviance = bernoulli_deviance(y, &eta);
    let mut iterations = 0;

    for iter in 1..=MAX_IRLS_ITER {
        iterations = iter;

        // Working weights and response at the current estimate.
        let mut w = vec![0.0; n];
        let mut z = DVector::zeros(n);
        for i in 0..n {
            let mu = sigmoid(eta[i]).clamp(PROB_EPS, 1.0 - PROB_EPS);
            let wi = (mu * (1.0 - mu)).max(MIN_WEIGHT);
            let off = offset.map_or(0.0, |o| o[i]);
            w[i] = wi;
            z[i] = (eta[i] - off) + (y[i] - mu) / wi;
        }

        // Solve the weighted system for the proposed new coefficients.
        let mut xw = x.clone();
        apply_sqrt_weights(&mut xw, &w);
        let zw = DVector::from_fn(n, |i, _| z[i] * w[i].sqrt());
        let proposal = solve_least_squares(&xw, &zw)?;

        // Step-halving: back off toward the previous estimate until the
        // deviance stops getting worse.
        let slack = 1e-8 * (deviance.abs() + 1.0);
        let mut candidate = proposal;
        let mut cand_eta;
        let mut cand_dev;
        let mut halvings = 0;
        loop {
            cand_eta = linear_predictor(x, &candidate, offset);
            cand_dev = bernoulli_deviance(y, &cand_eta);
            if cand_dev.is_finite() && cand_dev <= deviance + slack {
                break;
            }
            halvings += 1;
            if halvings > MAX_HALVINGS {
                return Err(AppError::numeric(format!(
                    "IRLS step-halving failed at iteration {iter}; deviance would not decrease."
                )));
            }
            candidate = (&candidate + &beta) * 0.5;
        }

        if candidate.iter().any(|b| !b.is_finite()) || candidate.amax() > BETA_LIMIT {
            return Err(AppError::numeric(
                "Coefficients diverged during IRLS; the outcome may be completely separated.",
            ));
        }

        let rel_change = (deviance - cand_dev).abs() / (cand_dev.abs() + 0.1);
        beta = candidate;
        eta = cand_eta;
        deviance = cand_dev;
        log::debug!(
            "IRLS iter {iter}: deviance {deviance:.6} (rel change {rel_change:.2e}, {halvings} halvings)"
        );

        if rel_change < DEV_TOL {
            let mut fitted = Vec::with_capacity(n);
            let mut weights = Vec::with_capacity(n);
            for i in 0..n {
                let mu = sigmoid(eta[i]).clamp(PROB_EPS, 1.0 - PROB_EPS);
                fitted.push(mu);
                weights.push((mu * (1.0 - mu)).max(MIN_WEIGHT));
            }
            return Ok(IrlsFit {
                coefs: beta,
                deviance,
                fitted,
                eta: eta.iter().copied().collect(),
                weights,
                iterations,
            });
        }
    }

    Err(AppError::numeric(format!(
        "IRLS did not converge after {MAX_IRLS_ITER} iterations."
    )))
}

fn linear_predictor(
    x: &DMatrix<f64>,
    beta: &DVector<f64>,
    offset: Option<&DVector<f64>>,
) -> DVector<f64> {
    let mut eta = x * beta;
    if let Some(o) = offset {
        eta += o;
    }
    eta
}

/// Bernoulli deviance `-2 * log-likelihood`, evaluated on the linear
/// predictor scale.
///
/// Uses the identity `d_i = 2 * (log1pexp(eta_i) - y_i * eta_i)`, which is
/// exact for 0/1 outcomes and stays finite for any finite `eta`.
pub fn bernoulli_deviance(y: &DVector<f64>, eta: &DVector<f64>) -> f64 {
    let mut dev = 0.0;
    for i in 0..y.len() {
        dev += 2.0 * (log1pexp(eta[i]) - y[i] * eta[i]);
    }
    dev
}

/// Deviance of the intercept-only model, in closed form.
pub fn null_deviance(y: &DVector<f64>) -> f64 {
    let n = y.len() as f64;
    let p_bar = y.mean().clamp(PROB_EPS, 1.0 - PROB_EPS);
    let eta0 = logit(p_bar);
    let ones: f64 = y.iter().sum();
    2.0 * (n * log1pexp(eta0) - ones * eta0)
}
