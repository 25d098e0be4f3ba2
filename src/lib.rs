#![forbid(unsafe_code)]
//! parcost: cost estimation for parfor plan trees.
//!
//! Facade over the workspace crates:
//! - [`parcost_core`]: plan model, ids, config, errors, hashing, verification
//! - [`parcost_estimator`]: leaf cost models, the aggregation engine, explain,
//!   YAML documents

pub use parcost_core;
pub use parcost_estimator;

pub use parcost_core::prelude::*;
pub use parcost_estimator::{
    default_estimate, explain_estimates, parse_plan_document, CostEstimator, DefaultLeafModel,
    Fallback, FnLeafModel, LeafCostModel, NodeEstimate, ParsedPlan, PlanConfig,
    TableLeafModel,
};
