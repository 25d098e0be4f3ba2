use thiserror::Error;

use crate::id::NodeId;
use crate::plan::{Measure, NodeKind};

/// Canonical result for the estimator stack.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The leaf cost model could not produce a value for `node`.
    #[error("leaf estimation failed for node {node}: {reason}")]
    LeafEstimation { node: NodeId, reason: String },

    /// An iteration-count parameter is present but is not a non-negative integer.
    /// This points at a plan-construction bug upstream, so we never substitute a default.
    #[error("malformed iteration count '{value}' on node {node}")]
    MalformedIterationCount { node: NodeId, value: String },

    #[error("no aggregation rule for {kind} node under {measure}: {detail}")]
    Unhandled {
        kind: NodeKind,
        measure: Measure,
        detail: String,
    },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Plan document error: {0}")]
    Document(String),
}
