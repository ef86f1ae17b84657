//! Stable ID newtype for syntax tree nodes.
//!
//! Nodes live in an arena ([`crate::ast::Ast`]) and refer to their children
//! by [`NodeId`], so replacing a node is a slot overwrite that leaves the
//! parent's reference intact.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier. Indexes into the owning [`crate::ast::Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the arena slot this ID addresses.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index as u32)
    }
}
