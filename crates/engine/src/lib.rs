//! Alert evaluation and multi-source scoring engine.
//!
//! This crate contains the core logic: rule evaluation over time-series
//! samples, weighted sentiment aggregation with time decay, and KOL trade
//! signal confidence scoring. Sample retrieval and persistence live behind
//! collaborator traits; the scoring math itself is synchronous.

pub mod error;
pub mod evaluator;
pub mod kol;
pub mod sentiment;
pub mod store;

pub use error::*;
pub use evaluator::*;
pub use kol::*;
pub use sentiment::*;
pub use store::*;
