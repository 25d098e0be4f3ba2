//! Cost aggregation over plan trees.
//!
//! Leaves are priced by the injected `LeafCostModel`. Internal nodes combine
//! their children's costs by (measure, kind):
//!
//! | kind              | EXEC_TIME                | MEMORY_USAGE                  |
//! |-------------------|--------------------------|-------------------------------|
//! | GENERIC, FUNCCALL | sum                      | max                           |
//! | IF                | mean (1 or 2 branches)   | max                           |
//! | WHILE             | while_iterations × sum   | max                           |
//! | FOR               | N × sum                  | max                           |
//! | PARFOR            | N × sum / k              | distributed: max, else max × k |
//!
//! N is the node's `num_iterations` parameter, or `default_iterations` when
//! absent. The IF mean is unweighted: branch probabilities are unknown.
//!
//! Evaluation is a post-order walk over an explicit stack of frames, so plan
//! depth is bounded by heap, not by the thread's call stack.

use parcost_core::prelude::*;

use crate::leaf::LeafCostModel;

/// Estimate of one node, as recorded by `CostEstimator::annotate`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeEstimate {
    pub id: NodeId,
    pub kind: NodeKind,
    pub depth: usize,
    pub value: f64,
}

/// Aggregates plan-tree costs. Holds configuration and the leaf model only,
/// so one estimator can serve any number of trees and threads.
#[derive(Debug, Clone)]
pub struct CostEstimator<M> {
    config: EstimatorConfig,
    leaf_model: M,
}

/// An internal node whose children are being evaluated.
struct Frame<'a> {
    node: &'a PlanNode,
    depth: usize,
    next: usize,
    values: Vec<f64>,
}

impl<M: LeafCostModel> CostEstimator<M> {
    pub fn new(leaf_model: M) -> Self {
        Self {
            config: EstimatorConfig::default(),
            leaf_model,
        }
    }

    pub fn with_config(leaf_model: M, config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, leaf_model })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn leaf_model(&self) -> &M {
        &self.leaf_model
    }

    /// Fallback estimate leaf models may hand out for unknown leaves.
    pub fn default_estimate(&self, measure: Measure) -> f64 {
        self.config.default_estimate(measure)
    }

    /// Estimate `measure` for the subtree rooted at `node`.
    ///
    /// `forced` is passed unchanged to the leaf model for every leaf in the
    /// subtree. Parfor memory aggregation still uses each parfor's assigned
    /// execution type.
    pub fn estimate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        let value = self.evaluate(measure, node, forced, |_, _, _| {})?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            node = %node.id,
            kind = %node.kind,
            %measure,
            forced = ?forced,
            value,
            "plan estimate"
        );
        Ok(value)
    }

    pub fn estimate_tree(
        &self,
        measure: Measure,
        tree: &PlanTree,
        forced: Option<ExecType>,
    ) -> Result<f64> {
        self.estimate(measure, &tree.root, forced)
    }

    /// Like `estimate`, but records every node's value (post-order).
    pub fn annotate(
        &self,
        measure: Measure,
        node: &PlanNode,
        forced: Option<ExecType>,
    ) -> Result<Vec<NodeEstimate>> {
        let mut out = Vec::with_capacity(node.size());
        self.evaluate(measure, node, forced, |n, depth, value| {
            out.push(NodeEstimate {
                id: n.id,
                kind: n.kind,
                depth,
                value,
            })
        })?;
        Ok(out)
    }

    pub(crate) fn evaluate<'a>(
        &self,
        measure: Measure,
        root: &'a PlanNode,
        forced: Option<ExecType>,
        mut visit: impl FnMut(&'a PlanNode, usize, f64),
    ) -> Result<f64> {
        if root.is_leaf() {
            let value = self.leaf_model.leaf_estimate(measure, root, forced)?;
            visit(root, 0, value);
            return Ok(value);
        }

        let mut stack = vec![Frame::open(root, 0)];
        while let Some(frame) = stack.last_mut() {
            match frame.node.children.get(frame.next) {
                Some(child) if child.is_leaf() => {
                    frame.next += 1;
                    let depth = frame.depth + 1;
                    let value = self.leaf_model.leaf_estimate(measure, child, forced)?;
                    visit(child, depth, value);
                    frame.values.push(value);
                }
                Some(child) => {
                    frame.next += 1;
                    let depth = frame.depth + 1;
                    stack.push(Frame::open(child, depth));
                }
                None => {
                    let Some(done) = stack.pop() else { break };
                    let value = self.aggregate(measure, done.node, &done.values)?;
                    visit(done.node, done.depth, value);
                    match stack.last_mut() {
                        Some(parent) => parent.values.push(value),
                        None => return Ok(value),
                    }
                }
            }
        }
        Err(Error::InvalidPlan(format!(
            "evaluation of node {} ended without a result",
            root.id
        )))
    }

    /// Combine the children's values of an internal node. `values` is never
    /// empty: internal nodes have at least one child.
    fn aggregate(&self, measure: Measure, node: &PlanNode, values: &[f64]) -> Result<f64> {
        let value = match (measure, node.kind) {
            (Measure::ExecTime, NodeKind::Generic | NodeKind::FuncCall) => sum(values),
            (Measure::ExecTime, NodeKind::If) => match values.len() {
                1 => values[0],
                2 => mean(values),
                n => {
                    return Err(Error::Unhandled {
                        kind: node.kind,
                        measure,
                        detail: format!("node {} has {n} branches", node.id),
                    })
                }
            },
            (Measure::ExecTime, NodeKind::While) => {
                self.config.while_iterations as f64 * sum(values)
            }
            (Measure::ExecTime, NodeKind::For) => {
                let n = node.iteration_count(self.config.default_iterations)?;
                n as f64 * sum(values)
            }
            (Measure::ExecTime, NodeKind::Parfor) => {
                let n = node.iteration_count(self.config.default_iterations)?;
                n as f64 * sum(values) / f64::from(node.k())
            }
            (
                Measure::MemoryUsage,
                NodeKind::Generic
                | NodeKind::FuncCall
                | NodeKind::If
                | NodeKind::While
                | NodeKind::For,
            ) => max(values),
            // Each worker runs in its own process: peak per process is unaffected by k.
            (Measure::MemoryUsage, NodeKind::Parfor) => match node.exec_type {
                ExecType::Distributed => max(values),
                ExecType::InProcess => max(values) * f64::from(node.k()),
            },
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(
            node = %node.id,
            kind = %node.kind,
            %measure,
            children = values.len(),
            value,
            "aggregated"
        );
        Ok(value)
    }
}

impl<'a> Frame<'a> {
    fn open(node: &'a PlanNode, depth: usize) -> Self {
        Self {
            node,
            depth,
            next: 0,
            values: Vec::with_capacity(node.children.len()),
        }
    }
}

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

fn mean(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::DefaultLeafModel;

    #[test]
    fn annotate_is_post_order_and_ends_with_root() {
        let root = PlanNode::new(NodeKind::Generic)
            .with_id(1)
            .with_child(
                PlanNode::new(NodeKind::While)
                    .with_id(2)
                    .with_child(PlanNode::new(NodeKind::Generic).with_id(3)),
            )
            .with_child(PlanNode::new(NodeKind::Generic).with_id(4));
        let est = CostEstimator::new(DefaultLeafModel::default());
        let rows = est.annotate(Measure::ExecTime, &root, None).unwrap();

        let ids: Vec<u64> = rows.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
        assert_eq!(rows[0].depth, 2);
        assert_eq!(rows[1].value, 50.0);
        assert_eq!(rows[3].value, 55.0);
        assert_eq!(
            rows[3].value,
            est.estimate(Measure::ExecTime, &root, None).unwrap()
        );
    }

    #[test]
    fn with_config_validates() {
        let cfg = EstimatorConfig {
            default_iterations: 0,
            ..EstimatorConfig::default()
        };
        assert!(CostEstimator::with_config(DefaultLeafModel::default(), cfg).is_err());
    }

    #[test]
    fn configured_iteration_factors_apply() {
        let cfg = EstimatorConfig {
            default_iterations: 3,
            while_iterations: 4,
            ..EstimatorConfig::default()
        };
        let est = CostEstimator::with_config(DefaultLeafModel::new(cfg.clone()), cfg).unwrap();
        let for_node = PlanNode::new(NodeKind::For).with_child(PlanNode::new(NodeKind::Generic));
        let while_node =
            PlanNode::new(NodeKind::While).with_child(PlanNode::new(NodeKind::Generic));
        assert_eq!(est.estimate(Measure::ExecTime, &for_node, None).unwrap(), 15.0);
        assert_eq!(est.estimate(Measure::ExecTime, &while_node, None).unwrap(), 20.0);
    }
}
