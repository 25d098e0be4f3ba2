#![forbid(unsafe_code)]
//! parcost-core: the plan-tree model consumed by the parfor cost estimator.
//!
//! This crate holds only data and invariants:
//! - `PlanNode`/`PlanTree` and the enums that classify them
//! - strongly-typed node ids
//! - the shared error type
//! - `EstimatorConfig` (iteration factors, default estimates)
//! - stable plan hashing and structural verification
//!
//! No estimation logic lives here; see `parcost-estimator`.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod plan;
pub mod prelude;
pub mod verify;

pub use config::EstimatorConfig;
pub use error::{Error, Result};
pub use id::NodeId;
pub use plan::{ExecType, Measure, NodeKind, ParamType, PlanNode, PlanTree};
