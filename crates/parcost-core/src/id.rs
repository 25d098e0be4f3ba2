//! Strongly-typed identifiers for plan nodes.
//!
//! Leaf cost tables and explain output refer to nodes by id, never by raw integers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            Ord,
            PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(NodeId);

impl NodeId {
    /// Id carried by nodes the plan builder did not number.
    pub const UNASSIGNED: NodeId = NodeId::new(0);

    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}
