//! Arena-backed syntax tree.
//!
//! [`Ast`] owns every node of one parsed expression in a flat `Vec`. Parents
//! hold child [`NodeId`]s, so structural rewrites never need pointer surgery:
//! [`Ast::replace`] overwrites a slot in O(1) and every parent that referred
//! to that slot now sees the new node in the same position.
//!
//! Slots are never freed. Rewrites that drop a subtree (compile-time folding,
//! for instance) leave unreachable nodes behind; traversals always start from
//! [`Ast::root`] so those are never visited.

use std::mem;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::node::Node;

/// A syntax tree stored as a node arena plus a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    /// Creates an arena holding a single `nil` root.
    pub fn new() -> Self {
        Ast {
            nodes: vec![Node::Nil],
            root: NodeId(0),
        }
    }

    /// Creates an empty arena whose root must be set with [`Ast::set_root`]
    /// once the tree is built.
    pub fn builder() -> Self {
        Ast {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Appends a node and returns its ID.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Overwrites the node in slot `id`, returning the previous node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this arena.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Node {
        mem::replace(&mut self.nodes[id.index()], node)
    }

    /// Moves the node in slot `id` to a fresh slot and returns the new ID.
    ///
    /// Slot `id` is left holding `nil` until the caller replaces it. Used to
    /// wrap a node in place: relocate it, then write the wrapper into the
    /// original slot with the relocated ID as a child.
    pub fn relocate(&mut self, id: NodeId) -> NodeId {
        let node = self.replace(id, Node::Nil);
        self.push(node)
    }

    /// Number of slots, including unreachable ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node IDs reachable from the root, in pre-order.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push(id);
            let children = node.children();
            stack.extend(children.iter().rev().copied());
        }
        out
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}
