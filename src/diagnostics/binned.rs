//! Binned-residual calibration check.
//!
//! Raw residuals from a binary outcome are useless to eyeball, so we order
//! observations along an axis (fitted probability, or markup), cut them into
//! near-equal bins, and compare each bin's mean residual against a
//! `±2 * sqrt(p(1-p)/n_bin)` band. A well-specified model keeps roughly 95%
//! of bins inside the band; systematic excursions flag a missing term.

use serde::{Deserialize, Serialize};

use crate::domain::SaleRecord;
use crate::error::AppError;
use crate::glm::GlmFit;

/// Smallest number of bins we will cut the data into.
const MIN_BINS: usize = 4;

/// Target minimum observations per bin when auto-sizing.
const MIN_BIN_OBS: usize = 5;

/// Axis along which observations are ordered before binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinAxis {
    FittedProb,
    Markup,
}

impl BinAxis {
    pub fn label(self) -> &'static str {
        match self {
            BinAxis::FittedProb => "fitted probability",
            BinAxis::Markup => "markup (%)",
        }
    }
}

/// One bin of the calibration check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualBin {
    /// Mean of the ordering axis within the bin.
    pub center: f64,
    pub n: usize,
    pub mean_fitted: f64,
    /// Mean of `y - fitted` within the bin.
    pub mean_residual: f64,
    /// Half-width of the acceptance band.
    pub band: f64,
}

impl ResidualBin {
    pub fn inside(&self) -> bool {
        self.mean_residual.abs() <= self.band
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinnedResiduals {
    pub axis: String,
    pub bins: Vec<ResidualBin>,
    /// Bins whose mean residual stays inside the band.
    pub inside: usize,
}

impl BinnedResiduals {
    pub fn total(&self) -> usize {
        self.bins.len()
    }
}

/// Compute binned residuals for a converged fit.
///
/// `bins == 0` auto-sizes to `floor(sqrt(n))`, clamped so no bin drops
/// below a handful of observations.
pub fn binned_residuals(
    records: &[SaleRecord],
    fit: &GlmFit,
    bins: usize,
    axis: BinAxis,
) -> Result<BinnedResiduals, AppError> {
    let n = records.len();
    if n != fit.fitted.len() {
        return Err(AppError::numeric("Fit does not match the record count."));
    }
    if n < MIN_BINS {
        return Err(AppError::data(format!(
            "Need at least {MIN_BINS} observations for binned residuals, got {n}."
        )));
    }

    let b = if bins == 0 {
        let auto = (n as f64).sqrt().floor() as usize;
        auto.clamp(MIN_BINS, (n / MIN_BIN_OBS).max(MIN_BINS))
    } else {
        bins.clamp(1, n)
    };

    let axis_value = |i: usize| -> f64 {
        match axis {
            BinAxis::FittedProb => fit.fitted[i],
            BinAxis::Markup => records[i].markup_pct,
        }
    };

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        axis_value(a)
            .partial_cmp(&axis_value(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Near-equal chunks: the first `n % b` bins take one extra observation.
    let base = n / b;
    let extra = n % b;

    let mut out = Vec::with_capacity(b);
    let mut start = 0usize;
    for bin_idx in 0..b {
        let size = base + usize::from(bin_idx < extra);
        if size == 0 {
            continue;
        }
        let members = &order[start..start + size];
        start += size;

        let n_bin = members.len() as f64;
        let mut sum_axis = 0.0;
        let mut sum_fitted = 0.0;
        let mut sum_resid = 0.0;
        for &i in members {
            let y = if records[i].sold { 1.0 } else { 0.0 };
            sum_axis += axis_value(i);
            sum_fitted += fit.fitted[i];
            sum_resid += y - fit.fitted[i];
        }
        let mean_fitted = sum_fitted / n_bin;
        let p = mean_fitted.clamp(1e-6, 1.0 - 1e-6);
        out.push(ResidualBin {
            center: sum_axis / n_bin,
            n: members.len(),
            mean_fitted,
            mean_residual: sum_resid / n_bin,
            band: 2.0 * (p * (1.0 - p) / n_bin).sqrt(),
        });
    }

    let inside = out.iter().filter(|bin| bin.inside()).count();

    Ok(BinnedResiduals {
        axis: axis.label().to_string(),
        bins: out,
        inside,
    })
}
