//! YAML plan documents: a plan tree, its constraints, and profiled leaf costs.
//!
//! Example:
//! ```yaml
//! ck: 16
//! cm: 1073741824
//! config: { default_iterations: 10 }
//! root:
//!   kind: parfor
//!   k: 4
//!   exec_type: in_process
//!   params: { num_iterations: "20" }
//!   children:
//!     - { id: 7, kind: generic }
//!     - { id: 8, kind: generic }
//! leaf_costs:
//!   - { node: 7, measure: exec_time, value: 2.0 }
//!   - { node: 8, measure: exec_time, value: 6.0 }
//!   - { node: 8, measure: memory_usage, exec_type: distributed, value: 4096 }
//! ```
//!
//! Nodes without an `id` are numbered in pre-order after the largest explicit id.

use std::collections::HashSet;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use parcost_core::prelude::*;
use parcost_core::verify::verify_tree;

use crate::leaf::{Fallback, TableLeafModel};

fn default_ck() -> NonZeroU32 {
    NonZeroU32::MIN
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default = "default_ck")]
    pub ck: NonZeroU32,
    #[serde(default)]
    pub cm: Option<u64>,
    #[serde(default)]
    pub config: PlanConfig,
    pub root: PlanNode,
    #[serde(default)]
    pub leaf_costs: Vec<LeafCostEntry>,
}

/// Estimator settings carried by a document. Only the fields present
/// override the base configuration; the rest keep whatever the caller had.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub default_iterations: Option<u64>,
    pub while_iterations: Option<u64>,
    pub default_time_ms: Option<f64>,
    pub default_mem_bytes: Option<f64>,
}

impl PlanConfig {
    pub fn apply_to(&self, cfg: &mut EstimatorConfig) {
        if let Some(n) = self.default_iterations {
            cfg.default_iterations = n;
        }
        if let Some(n) = self.while_iterations {
            cfg.while_iterations = n;
        }
        if let Some(v) = self.default_time_ms {
            cfg.default_time_ms = v;
        }
        if let Some(v) = self.default_mem_bytes {
            cfg.default_mem_bytes = v;
        }
    }

    /// Reject values no base configuration could make valid.
    pub fn validate(&self) -> Result<()> {
        let mut cfg = EstimatorConfig::default();
        self.apply_to(&mut cfg);
        cfg.validate()
    }
}

/// One profiled leaf cost. Without `exec_type` it applies to any execution type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafCostEntry {
    pub node: NodeId,
    pub measure: Measure,
    #[serde(default)]
    pub exec_type: Option<ExecType>,
    pub value: f64,
}

/// A verified plan document, ready to estimate.
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub tree: PlanTree,
    /// Estimator settings embedded in the document.
    pub config: PlanConfig,
    pub leaf_costs: Vec<LeafCostEntry>,
}

impl ParsedPlan {
    /// Build the profile-table leaf model for this document. Leaves without
    /// an entry are handled per `fallback`, using `config` for defaults.
    pub fn leaf_model(
        &self,
        config: &EstimatorConfig,
        fallback: Fallback,
    ) -> Result<TableLeafModel> {
        let mut model = TableLeafModel::new(config.clone()).with_fallback(fallback);
        for entry in &self.leaf_costs {
            model.insert(entry.node, entry.measure, entry.exec_type, entry.value)?;
        }
        Ok(model)
    }
}

/// Parse, number, and verify a YAML plan document.
pub fn parse_plan_document(yaml_src: &str) -> Result<ParsedPlan> {
    let doc: PlanDocument =
        serde_yaml::from_str(yaml_src).map_err(|e| Error::Document(e.to_string()))?;

    doc.config.validate()?;

    let mut tree = PlanTree::new(doc.root).with_constraints(doc.ck, doc.cm);
    tree.assign_missing_ids();
    verify_tree(&tree)?;

    let leaves: HashSet<NodeId> = tree
        .root
        .walk()
        .filter(|(_, n)| n.is_leaf())
        .map(|(_, n)| n.id)
        .collect();
    if let Some(entry) = doc.leaf_costs.iter().find(|e| !leaves.contains(&e.node)) {
        return Err(Error::Document(format!(
            "leaf cost refers to {}, which is not a leaf of the plan",
            entry.node
        )));
    }

    Ok(ParsedPlan {
        tree,
        config: doc.config,
        leaf_costs: doc.leaf_costs,
    })
}
