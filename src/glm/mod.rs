//! Logistic-model fitting orchestration.
//!
//! Responsibilities:
//!
//! - build design matrices for the candidate formulas
//! - fit each candidate by IRLS
//! - select the working model using BIC + guardrails
//! - attach per-coefficient inference (Wald + profile likelihood)

pub mod design;
pub mod inference;
pub mod irls;
pub mod selection;

pub use design::*;
pub use inference::*;
pub use irls::*;
pub use selection::*;
