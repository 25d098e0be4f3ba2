//! Stable hashing of plan trees.
//!
//! The plan search re-estimates the same candidate many times; a content hash
//! lets callers key a cache of estimates without comparing whole trees.

use blake3::Hasher;

use crate::plan::{ExecType, NodeKind, PlanNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

fn kind_tag(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::Generic => 0,
        NodeKind::FuncCall => 1,
        NodeKind::If => 2,
        NodeKind::While => 3,
        NodeKind::For => 4,
        NodeKind::Parfor => 5,
    }
}

fn exec_tag(et: ExecType) -> u8 {
    match et {
        ExecType::InProcess => 0,
        ExecType::Distributed => 1,
    }
}

/// Fingerprint of a plan subtree.
///
/// Nodes are fed to the hasher in pre-order, each with its depth and child
/// count, so the shape is unambiguous. Parameters come out of a `BTreeMap`,
/// so insertion order does not matter. Runs in constant stack space.
pub fn hash_plan(node: &PlanNode) -> Hash256 {
    let mut h = Hasher::new();
    for (depth, n) in node.walk() {
        h.update(&(depth as u64).to_le_bytes());
        h.update(&n.id.get().to_le_bytes());
        h.update(&[kind_tag(n.kind), exec_tag(n.exec_type)]);
        h.update(&n.k().to_le_bytes());
        h.update(&(n.children.len() as u64).to_le_bytes());
        h.update(&(n.params.len() as u64).to_le_bytes());
        for (key, value) in &n.params {
            h.update(key.to_string().as_bytes());
            h.update(&[0]);
            h.update(&(value.len() as u64).to_le_bytes());
            h.update(value.as_bytes());
        }
    }
    Hash256(h.finalize().into())
}
