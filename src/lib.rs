//! `markopt` library crate.
//!
//! The binary (`markopt`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., future notebooks, batch reruns, etc.)
//! - code stays easy to navigate as the analysis grows

pub mod app;
pub mod cli;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod glm;
pub mod impact;
pub mod io;
pub mod math;
pub mod plot;
pub mod profit;
pub mod report;
