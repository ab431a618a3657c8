//! Model validation diagnostics.
//!
//! Responsibilities:
//!
//! - binned-residual calibration checks (by fitted probability and by markup)
//! - case influence via leverage and one-step DFBETAS

pub mod binned;
pub mod influence;

pub use binned::*;
pub use influence::*;
