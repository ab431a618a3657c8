//! Report rendering.
//!
//! - `format` — terminal tables and summaries
//! - `markdown` — the rendered article (tables, math, figure references)

pub mod format;
pub mod markdown;

pub use format::*;
pub use markdown::*;
