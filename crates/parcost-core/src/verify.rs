//! Structural checks for plan trees handed over by the plan builder.
//!
//! The estimator surfaces the same violations lazily, on the subtree it is
//! asked about. Running `verify_plan` up front reports them for the whole
//! tree before a search starts. The walk is iterative, so it is safe on
//! arbitrarily deep plans.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::plan::{NodeKind, PlanNode, PlanTree};

/// Most branches an `If` node may carry (the if-body and the else-body).
pub const MAX_IF_BRANCHES: usize = 2;

/// Check a subtree:
/// - assigned node ids are unique
/// - `If` nodes have at most two branches
/// - iteration-count parameters on `For`/`Parfor` nodes parse as integers
pub fn verify_plan(root: &PlanNode) -> Result<()> {
    let mut seen = HashSet::<NodeId>::new();
    for (_, node) in root.walk() {
        if node.id.is_assigned() && !seen.insert(node.id) {
            return Err(Error::InvalidPlan(format!("duplicate node id {}", node.id)));
        }
        match node.kind {
            NodeKind::If if node.children.len() > MAX_IF_BRANCHES => {
                return Err(Error::InvalidPlan(format!(
                    "IF node {} has {} branches, at most {} allowed",
                    node.id,
                    node.children.len(),
                    MAX_IF_BRANCHES
                )));
            }
            NodeKind::For | NodeKind::Parfor => {
                node.iteration_count(0)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Check a whole tree, including its constraints.
pub fn verify_tree(tree: &PlanTree) -> Result<()> {
    if tree.cm == Some(0) {
        return Err(Error::InvalidPlan("memory budget cm must be positive".into()));
    }
    verify_plan(&tree.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ParamType;

    #[test]
    fn accepts_well_formed_plan() {
        let root = PlanNode::new(NodeKind::If)
            .with_id(1)
            .with_child(PlanNode::new(NodeKind::Generic).with_id(2))
            .with_child(PlanNode::new(NodeKind::Generic).with_id(3));
        verify_plan(&root).unwrap();
    }

    #[test]
    fn rejects_duplicate_ids() {
        let root = PlanNode::new(NodeKind::Generic)
            .with_id(1)
            .with_child(PlanNode::new(NodeKind::Generic).with_id(1));
        assert!(matches!(verify_plan(&root), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn unassigned_ids_do_not_collide() {
        let root = PlanNode::new(NodeKind::Generic)
            .with_child(PlanNode::new(NodeKind::Generic))
            .with_child(PlanNode::new(NodeKind::Generic));
        verify_plan(&root).unwrap();
    }

    #[test]
    fn rejects_if_with_three_branches() {
        let root = PlanNode::new(NodeKind::If).with_children(
            (0..3).map(|_| PlanNode::new(NodeKind::Generic)),
        );
        assert!(matches!(verify_plan(&root), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn rejects_malformed_iteration_count() {
        let root = PlanNode::new(NodeKind::Generic).with_child(
            PlanNode::new(NodeKind::Parfor)
                .with_param(ParamType::NumIterations, "1.5")
                .with_child(PlanNode::new(NodeKind::Generic)),
        );
        assert!(matches!(
            verify_plan(&root),
            Err(Error::MalformedIterationCount { .. })
        ));
    }

    #[test]
    fn rejects_zero_memory_budget() {
        let tree = PlanTree::new(PlanNode::new(NodeKind::Generic))
            .with_constraints(std::num::NonZeroU32::MIN, Some(0));
        assert!(verify_tree(&tree).is_err());
    }
}
