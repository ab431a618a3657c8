//! Mathematical utilities: logit-link primitives, weighted least squares,
//! and standard-normal helpers.

pub mod logistic;
pub mod stats;
pub mod wls;

pub use logistic::*;
pub use stats::*;
pub use wls::*;
