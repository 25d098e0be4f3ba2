//! Leaf cost models: the capability that prices one atomic plan node.
//!
//! The estimator never prices a leaf itself. It hands the leaf to a
//! `LeafCostModel` and uses the answer unchanged; failures propagate.

use std::collections::HashMap;
use std::sync::Arc;

use parcost_core::config::{DEFAULT_MEM_ESTIMATE, DEFAULT_TIME_ESTIMATE};
use parcost_core::prelude::*;

/// Prices leaf nodes.
///
/// `forced` asks for the cost as if the leaf ran under that execution type,
/// regardless of the type assigned in the plan. `None` means "as planned".
pub trait LeafCostModel {
    fn leaf_estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64>;
}

impl<T: LeafCostModel + ?Sized> LeafCostModel for &T {
    fn leaf_estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        (**self).leaf_estimate(measure, node, forced)
    }
}

impl<T: LeafCostModel + ?Sized> LeafCostModel for Box<T> {
    fn leaf_estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        (**self).leaf_estimate(measure, node, forced)
    }
}

impl<T: LeafCostModel + ?Sized> LeafCostModel for Arc<T> {
    fn leaf_estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        (**self).leaf_estimate(measure, node, forced)
    }
}

/// Adapts a closure into a leaf model.
pub struct FnLeafModel<F>(pub F);

impl<F> LeafCostModel for FnLeafModel<F>
where
    F: Fn(Measure, &PlanNode, Option<ExecType>) -> Result<f64>,
{
    fn leaf_estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        (self.0)(measure, node, forced)
    }
}

/// Built-in fallback: 5ms of time, 1KB of memory.
pub fn default_estimate(measure: Measure) -> f64 {
    match measure {
        Measure::ExecTime => DEFAULT_TIME_ESTIMATE,
        Measure::MemoryUsage => DEFAULT_MEM_ESTIMATE,
    }
}

/// Prices every leaf at the configured default estimate.
#[derive(Debug, Clone, Default)]
pub struct DefaultLeafModel {
    config: EstimatorConfig,
}

impl DefaultLeafModel {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }
}

impl LeafCostModel for DefaultLeafModel {
    fn leaf_estimate(
        &self,
        measure: Measure,
        _node: &PlanNode,
        _forced: Option<ExecType>,
    ) -> Result<f64> {
        Ok(self.config.default_estimate(measure))
    }
}

/// What a `TableLeafModel` does for a leaf it has no entry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Answer with the configured default estimate.
    #[default]
    DefaultEstimate,
    /// Fail with `Error::LeafEstimation`.
    Fail,
}

type TableKey = (NodeId, Measure, Option<ExecType>);

/// Leaf costs looked up from a profile table keyed by node id.
///
/// An entry recorded without an execution type applies to any type. When
/// both exist, the entry for the effective type (forced, else assigned) wins.
#[derive(Debug, Clone, Default)]
pub struct TableLeafModel {
    entries: HashMap<TableKey, f64>,
    fallback: Fallback,
    config: EstimatorConfig,
}

impl TableLeafModel {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: Fallback::default(),
            config,
        }
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn insert(
        &mut self,
        node: NodeId,
        measure: Measure,
        exec_type: Option<ExecType>,
        value: f64,
    ) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Config(format!(
                "leaf cost for {node} ({measure}) must be finite and non-negative, got {value}"
            )));
        }
        self.entries.insert((node, measure, exec_type), value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, measure: Measure, node: &PlanNode, forced: Option<ExecType>) -> Option<f64> {
        let et = forced.unwrap_or(node.exec_type);
        self.entries
            .get(&(node.id, measure, Some(et)))
            .or_else(|| self.entries.get(&(node.id, measure, None)))
            .copied()
    }
}

impl LeafCostModel for TableLeafModel {
    fn leaf_estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        if let Some(v) = self.lookup(measure, node, forced) {
            return Ok(v);
        }
        match self.fallback {
            Fallback::DefaultEstimate => Ok(self.config.default_estimate(measure)),
            Fallback::Fail => Err(Error::LeafEstimation {
                node: node.id,
                reason: format!(
                    "no {measure} entry for exec type {}",
                    forced.unwrap_or(node.exec_type)
                ),
            }),
        }
    }
}
