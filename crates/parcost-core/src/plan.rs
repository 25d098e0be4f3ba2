//! Plan-tree representation of a compiled program's control flow.
//!
//! The plan builder (outside this workspace) produces a `PlanTree`; the
//! estimator only ever reads it. Leaves are atomic units (instructions or
//! opaque program blocks) costed by a leaf model; internal nodes are control
//! constructs whose cost is aggregated from their children.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::NodeId;

/// Which quantity an estimate describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Expected execution time in milliseconds.
    ExecTime,
    /// Peak memory in bytes.
    MemoryUsage,
}

/// Where a node executes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExecType {
    /// Inside the single control process; all workers share one memory space.
    #[default]
    InProcess,
    /// Spread over independent worker processes, each with its own memory.
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Generic,
    #[serde(rename = "funccall")]
    FuncCall,
    If,
    While,
    For,
    Parfor,
}

/// Typed keys for node parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    OpType,
    OpString,
    NumIterations,
    TaskPartitioner,
    DataPartitioner,
    ResultMerge,
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Measure::ExecTime => "EXEC_TIME",
            Measure::MemoryUsage => "MEMORY_USAGE",
        })
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecType::InProcess => "IN_PROCESS",
            ExecType::Distributed => "DISTRIBUTED",
        })
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Generic => "GENERIC",
            NodeKind::FuncCall => "FUNCCALL",
            NodeKind::If => "IF",
            NodeKind::While => "WHILE",
            NodeKind::For => "FOR",
            NodeKind::Parfor => "PARFOR",
        })
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamType::OpType => "op_type",
            ParamType::OpString => "op_string",
            ParamType::NumIterations => "num_iterations",
            ParamType::TaskPartitioner => "task_partitioner",
            ParamType::DataPartitioner => "data_partitioner",
            ParamType::ResultMerge => "result_merge",
        })
    }
}

fn default_k() -> NonZeroU32 {
    NonZeroU32::MIN
}

/// One node of the plan tree. A node is a leaf iff it has no children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(default)]
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<ParamType, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
    #[serde(default)]
    pub exec_type: ExecType,
    /// Degree of parallelism; only meaningful for `Parfor`.
    #[serde(default = "default_k")]
    pub k: NonZeroU32,
}

impl PlanNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            kind,
            params: BTreeMap::new(),
            children: Vec::new(),
            exec_type: ExecType::default(),
            k: default_k(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = NodeId::new(id);
        self
    }

    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = PlanNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_param(mut self, key: ParamType, value: impl Into<String>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn with_exec_type(mut self, exec_type: ExecType) -> Self {
        self.exec_type = exec_type;
        self
    }

    pub fn with_k(mut self, k: NonZeroU32) -> Self {
        self.k = k;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn param(&self, key: ParamType) -> Option<&str> {
        self.params.get(&key).map(String::as_str)
    }

    pub fn k(&self) -> u32 {
        self.k.get()
    }

    /// Parsed `num_iterations` parameter, or `default` when the parameter is absent.
    pub fn iteration_count(&self, default: u64) -> Result<u64> {
        match self.param(ParamType::NumIterations) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| Error::MalformedIterationCount {
                    node: self.id,
                    value: raw.to_string(),
                }),
        }
    }

    /// Pre-order walk yielding `(depth, node)`; the root has depth 0.
    pub fn walk(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![(0, self)],
        }
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        self.walk().count()
    }

    /// Number of levels in this subtree (a lone leaf has depth 1).
    pub fn depth(&self) -> usize {
        self.walk().map(|(d, _)| d + 1).max().unwrap_or(1)
    }

    /// One-line description used by explain output.
    pub fn describe(&self) -> String {
        let mut s = self.kind.to_string();
        let mut attrs = Vec::new();
        if self.id.is_assigned() {
            attrs.push(format!("id={}", self.id.get()));
        }
        if self.kind == NodeKind::Parfor {
            attrs.push(format!("k={}", self.k));
        }
        attrs.push(format!("exec={}", self.exec_type));
        for (key, value) in &self.params {
            attrs.push(format!("{key}={value}"));
        }
        s.push_str(&format!(" ({})", attrs.join(", ")));
        s
    }

    /// Indented listing of the subtree, one node per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        for (depth, node) in self.walk() {
            out.push_str(&"  ".repeat(depth));
            out.push_str("--");
            out.push_str(&node.describe());
            out.push('\n');
        }
        out
    }
}

// Children are torn down from an explicit stack so that very deep plans do not
// recurse through `Drop`.
impl Drop for PlanNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a PlanNode)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a PlanNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        Some((depth, node))
    }
}

/// A plan tree plus the resource constraints the plan search works under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTree {
    /// Max total degree of parallelism available to the program.
    #[serde(default = "default_k")]
    pub ck: NonZeroU32,
    /// Memory budget (bytes) of the control process, if known.
    #[serde(default)]
    pub cm: Option<u64>,
    pub root: PlanNode,
}

impl PlanTree {
    pub fn new(root: PlanNode) -> Self {
        Self {
            ck: default_k(),
            cm: None,
            root,
        }
    }

    pub fn with_constraints(mut self, ck: NonZeroU32, cm: Option<u64>) -> Self {
        self.ck = ck;
        self.cm = cm;
        self
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Number every node whose id is unassigned, in pre-order, starting after
    /// the largest id already present. Returns how many ids were assigned.
    pub fn assign_missing_ids(&mut self) -> usize {
        let mut next = self
            .root
            .walk()
            .map(|(_, n)| n.id.get())
            .max()
            .unwrap_or(0);
        let mut assigned = 0;
        let mut stack = vec![&mut self.root];
        while let Some(node) = stack.pop() {
            if !node.id.is_assigned() {
                next += 1;
                node.id = NodeId::new(next);
                assigned += 1;
            }
            stack.extend(node.children.iter_mut().rev());
        }
        assigned
    }

    /// First line of every plan listing, with its trailing newline.
    pub fn header(&self) -> String {
        let mut out = format!(
            "PLAN TREE (size={}, depth={}, ck={}",
            self.size(),
            self.depth(),
            self.ck
        );
        if let Some(cm) = self.cm {
            out.push_str(&format!(", cm={cm}"));
        }
        out.push_str(")\n");
        out
    }

    pub fn explain(&self) -> String {
        let mut out = self.header();
        out.push_str(&self.root.explain());
        out
    }
}
