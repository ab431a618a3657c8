//! Standard-normal helpers for interval construction.
//!
//! Confidence levels are user-configurable, so we need `Φ` and `Φ⁻¹` at
//! arbitrary points rather than a table of hardcoded z values. Both are
//! classic rational approximations:
//!
//! - `normal_quantile`: Acklam's algorithm (relative error ~1e-9)
//! - `normal_cdf`: Abramowitz & Stegun 26.2.17 (absolute error < 7.5e-8)
//!
//! The χ²₁ quantile used by profile deviances follows from
//! `chi2_quantile_1df(p) = Φ⁻¹((1+p)/2)²`.

/// Inverse standard-normal CDF.
///
/// Returns `None` for `p` outside the open interval `(0, 1)`.
pub fn normal_quantile(p: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    const P_LOW: f64 = 0.02425;

    let x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -((((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0))
    };

    if x.is_finite() { Some(x) } else { None }
}

/// Standard-normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    if x < 0.0 {
        return 1.0 - normal_cdf(-x);
    }

    const INV_SQRT_2PI: f64 = 0.39894228040143267794;

    let t = 1.0 / (1.0 + 0.2316419 * x);
    let poly = t
        * (0.319381530
            + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429))));
    let pdf = INV_SQRT_2PI * (-0.5 * x * x).exp();
    (1.0 - pdf * poly).clamp(0.0, 1.0)
}

/// Two-sided p-value for a z statistic.
pub fn two_sided_p(z: f64) -> f64 {
    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Quantile of the χ² distribution with one degree of freedom.
pub fn chi2_quantile_1df(p: f64) -> Option<f64> {
    normal_quantile((1.0 + p) / 2.0).map(|z| z * z)
}
