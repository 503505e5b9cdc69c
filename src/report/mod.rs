//! Report generation.
//!
//! This module renders the score summary and the full report envelope.

pub mod generator;
pub mod summary;

pub use generator::*;
