//! Risk scoring.
//!
//! Pure, synchronous scoring over already-collected producer results:
//! per-component scorers and the weighted aggregation on top of them.

pub mod aggregator;
pub mod scorers;

pub use aggregator::{applied_penalties, compute_risk_score};
