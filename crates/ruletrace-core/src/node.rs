//! Syntax tree node kinds.
//!
//! [`Node`] is a closed sum type with one variant per node kind the
//! expression language produces. Every traversal in the workspace (formatter,
//! atom collector, patcher, interpreter) is an exhaustive match over it.
//! Children are referenced by [`NodeId`] into the owning arena.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::NodeId;
use crate::ops::{BinaryOp, UnaryOp};

/// Words the lexer reserves. A member name that collides with one of these
/// cannot be written as `.name` and must be written as `["name"]`.
pub const KEYWORDS: &[&str] = &[
    "nil",
    "null",
    "true",
    "false",
    "not",
    "and",
    "or",
    "in",
    "matches",
    "contains",
    "startsWith",
    "endsWith",
    "let",
];

/// Returns true if `name` can be written as a bare identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !KEYWORDS.contains(&name)
}

/// A literal set folded at compile time from `x in [lit, ...]`.
///
/// Members are kept in a `BTreeSet` so iteration (and therefore rendering)
/// is sorted regardless of the order the literals were written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstSet {
    Strings(BTreeSet<String>),
    Ints(BTreeSet<i64>),
}

impl ConstSet {
    pub fn len(&self) -> usize {
        match self {
            ConstSet::Strings(s) => s.len(),
            ConstSet::Ints(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One syntax tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Nil,
    Identifier(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Constant(ConstSet),
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        cond: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    /// `a; b; c`, evaluates to the last element.
    Sequence(Vec<NodeId>),
    /// `let name = value; body`
    Let {
        name: String,
        value: NodeId,
        body: NodeId,
    },
    Array(Vec<NodeId>),
    /// Map literal. Every element is a [`Node::Pair`].
    Map(Vec<NodeId>),
    Pair {
        key: NodeId,
        value: NodeId,
    },
    /// Call of a function registered with the engine.
    Call {
        callee: NodeId,
        args: SmallVec<[NodeId; 4]>,
    },
    /// Call of a builtin such as `len` or `all`.
    Builtin {
        name: String,
        args: SmallVec<[NodeId; 4]>,
    },
    /// Predicate argument of a builtin, written `{ body }`.
    Predicate(NodeId),
    /// `#` (empty name) or `#name` inside a predicate.
    Pointer(String),
    Member {
        base: NodeId,
        property: NodeId,
        optional: bool,
    },
    Slice {
        base: NodeId,
        from: Option<NodeId>,
        to: Option<NodeId>,
    },
    /// Wraps a postfix chain containing `?.`. Transparent for formatting.
    Chain(NodeId),
}

impl Node {
    /// Child node IDs in left-to-right source order.
    pub fn children(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        match self {
            Node::Nil
            | Node::Identifier(_)
            | Node::Integer(_)
            | Node::Float(_)
            | Node::Bool(_)
            | Node::String(_)
            | Node::Bytes(_)
            | Node::Constant(_)
            | Node::Pointer(_) => {}
            Node::Unary { operand, .. } => out.push(*operand),
            Node::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            Node::Conditional {
                cond,
                then,
                otherwise,
            } => {
                out.push(*cond);
                out.push(*then);
                out.push(*otherwise);
            }
            Node::Sequence(items) | Node::Array(items) | Node::Map(items) => {
                out.extend(items.iter().copied())
            }
            Node::Let { value, body, .. } => {
                out.push(*value);
                out.push(*body);
            }
            Node::Pair { key, value } => {
                out.push(*key);
                out.push(*value);
            }
            Node::Call { callee, args } => {
                out.push(*callee);
                out.extend(args.iter().copied());
            }
            Node::Builtin { args, .. } => out.extend(args.iter().copied()),
            Node::Predicate(body) | Node::Chain(body) => out.push(*body),
            Node::Member { base, property, .. } => {
                out.push(*base);
                out.push(*property);
            }
            Node::Slice { base, from, to } => {
                out.push(*base);
                out.extend(from.iter().copied());
                out.extend(to.iter().copied());
            }
        }
        out
    }

    /// Human-readable node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Nil => "nil",
            Node::Identifier(_) => "identifier",
            Node::Integer(_) => "integer",
            Node::Float(_) => "float",
            Node::Bool(_) => "bool",
            Node::String(_) => "string",
            Node::Bytes(_) => "bytes",
            Node::Constant(_) => "constant",
            Node::Unary { .. } => "unary",
            Node::Binary { .. } => "binary",
            Node::Conditional { .. } => "conditional",
            Node::Sequence(_) => "sequence",
            Node::Let { .. } => "let",
            Node::Array(_) => "array",
            Node::Map(_) => "map",
            Node::Pair { .. } => "pair",
            Node::Call { .. } => "call",
            Node::Builtin { .. } => "builtin",
            Node::Predicate(_) => "predicate",
            Node::Pointer(_) => "pointer",
            Node::Member { .. } => "member",
            Node::Slice { .. } => "slice",
            Node::Chain(_) => "chain",
        }
    }
}
