#![forbid(unsafe_code)]
//! parcost-estimator: aggregates a plan tree into one cost per measure.
//!
//! Responsibilities:
//! - `LeafCostModel`: the pluggable capability that costs atomic nodes,
//!   plus two stock models (defaults-only and a profile table).
//! - `CostEstimator`: walks a `PlanNode` tree and combines child costs per
//!   (measure, node kind), honoring iteration counts, parallelism and
//!   execution placement.
//! - Explain output and YAML plan documents for the CLI and tests.
//!
//! **No I/O, no shared state.** An estimator is immutable once built and can
//! be shared across threads of a parallel plan search.

pub mod dsl;
pub mod estimator;
pub mod explain;
pub mod leaf;

pub use dsl::yaml::{parse_plan_document, LeafCostEntry, ParsedPlan, PlanConfig, PlanDocument};
pub use estimator::{CostEstimator, NodeEstimate};
pub use explain::explain_estimates;
pub use leaf::{
    default_estimate, DefaultLeafModel, Fallback, FnLeafModel, LeafCostModel, TableLeafModel,
};
