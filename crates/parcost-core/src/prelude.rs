//! Convenient re-exports for downstream crates.

pub use crate::config::EstimatorConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::{hash_plan, Hash256};
pub use crate::id::NodeId;
pub use crate::plan::{ExecType, Measure, NodeKind, ParamType, PlanNode, PlanTree};
