//! Output helpers: dataset/result CSV exports and the JSON summary.

pub mod export;

pub use export::*;
