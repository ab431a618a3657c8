//! Plot rendering.
//!
//! - `ascii` — deterministic fixed-grid terminal plots
//! - `svg` — article figures via the Plotters SVG backend

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
