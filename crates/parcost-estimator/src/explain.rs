//! Human-readable plan listings annotated with estimates.

use std::collections::HashMap;

use parcost_core::prelude::*;

use crate::estimator::CostEstimator;
use crate::leaf::LeafCostModel;

/// Render `tree` one node per line, each with its estimate for `measure`.
///
/// For `MemoryUsage` on a tree with a memory budget, a trailing line reports
/// whether the root estimate fits the budget.
pub fn explain_estimates<M: LeafCostModel>(
    estimator: &CostEstimator<M>,
    measure: Measure,
    tree: &PlanTree,
    forced: Option<ExecType>,
) -> Result<String> {
    let mut values: HashMap<*const PlanNode, f64> = HashMap::with_capacity(tree.size());
    let total = estimator.evaluate(measure, &tree.root, forced, |n, _, v| {
        values.insert(n as *const PlanNode, v);
    })?;

    let mut out = tree.header();
    out.push_str(&format!(
        "ESTIMATE {measure} (forced={}): {total:.3}\n",
        forced.map_or_else(|| "none".to_string(), |et| et.to_string())
    ));

    for (depth, node) in tree.root.walk() {
        out.push_str(&"  ".repeat(depth));
        out.push_str("--");
        out.push_str(&node.describe());
        if let Some(v) = values.get(&(node as *const PlanNode)) {
            out.push_str(&format!(" [{v:.3}]"));
        }
        out.push('\n');
    }

    if let (Measure::MemoryUsage, Some(cm)) = (measure, tree.cm) {
        let verdict = if total <= cm as f64 { "yes" } else { "no" };
        out.push_str(&format!("FITS cm: {verdict}\n"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::DefaultLeafModel;
    use std::num::NonZeroU32;

    #[test]
    fn annotates_each_line_and_reports_budget() {
        let root = PlanNode::new(NodeKind::Parfor)
            .with_k(NonZeroU32::new(4).unwrap())
            .with_child(PlanNode::new(NodeKind::Generic));
        let tree = PlanTree::new(root).with_constraints(NonZeroU32::new(8).unwrap(), Some(2048));
        let est = CostEstimator::new(DefaultLeafModel::default());

        let text = explain_estimates(&est, Measure::MemoryUsage, &tree, None).unwrap();
        assert!(text.starts_with(&tree.header()));
        assert!(text.contains("ESTIMATE MEMORY_USAGE (forced=none): 4096.000"));
        assert!(text.contains("--PARFOR (k=4, exec=IN_PROCESS) [4096.000]"));
        assert!(text.contains("  --GENERIC (exec=IN_PROCESS) [1024.000]"));
        assert!(text.ends_with("FITS cm: no\n"));
    }
}
