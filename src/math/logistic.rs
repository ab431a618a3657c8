//! Stable primitives for the logit link.
//!
//! The fitting loop and the profit objective evaluate these functions many
//! times, so they need to behave across the whole real line:
//!
//! - `sigmoid(x) = 1 / (1 + exp(-x))`
//! - `log1pexp(x) = ln(1 + exp(x))`
//! - `logit(p) = ln(p / (1 - p))`
//!
//! Numerical notes:
//! - For large negative `x`, `1 + exp(-x)` overflows; we branch on the sign
//!   and compute via `exp(x) / (1 + exp(x))` instead.
//! - `log1pexp` uses the standard three-regime split (exp underflow, `ln_1p`,
//!   and the `x + exp(-x)` tail) so the binomial log-likelihood never sees
//!   `inf - inf`.

/// Epsilon used to clamp probabilities away from 0 and 1.
pub const PROB_EPS: f64 = 1e-8;

/// Compute `sigmoid(x)` without overflow on either tail.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Compute `ln(1 + exp(x))` in a numerically stable way.
pub fn log1pexp(x: f64) -> f64 {
    if x < -37.0 {
        // exp(x) underflows toward 0; ln(1 + eps) ~= eps.
        x.exp()
    } else if x <= 18.0 {
        x.exp().ln_1p()
    } else if x <= 33.3 {
        x + (-x).exp()
    } else {
        x
    }
}

/// Inverse of `sigmoid` on clamped probabilities.
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
    (p / (1.0 - p)).ln()
}
