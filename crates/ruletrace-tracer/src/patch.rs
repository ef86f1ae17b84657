//! Spec-driven instrumentation of a syntax tree.
//!
//! [`patch`] wraps every predicate whose fingerprint has a spec in
//! `Cond(id, reason_true, reason_false, <predicate>)`. The wrapped predicate
//! is moved to a fresh arena slot and the call takes over its old slot, so
//! the parent (a `||` operand, a conditional branch, a call argument) sees
//! the call in the position the predicate used to occupy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use tracing::debug;

use ruletrace_core::{Ast, Node, NodeId};

use crate::atoms::{is_cond_call, is_predicate};
use crate::fingerprint::fingerprint;
use crate::format::format;
use crate::recorder::COND_FN;

/// Author-supplied metadata for one condition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(default, alias = "ReasonTrue")]
    pub reason_true: String,
    #[serde(default, alias = "ReasonFalse")]
    pub reason_false: String,
}

impl ConditionSpec {
    pub fn new(
        id: impl Into<String>,
        reason_true: impl Into<String>,
        reason_false: impl Into<String>,
    ) -> Self {
        ConditionSpec {
            id: id.into(),
            reason_true: reason_true.into(),
            reason_false: reason_false.into(),
        }
    }
}

/// Specs keyed by fingerprint.
pub type SpecMap = HashMap<String, ConditionSpec>;

/// Returns a patched copy of `ast`. The input is untouched.
pub fn patch(ast: &Ast, specs: &SpecMap) -> Ast {
    let mut patched = ast.clone();
    patch_in_place(&mut patched, specs);
    patched
}

/// Patches `ast` in place and returns the number of wrapped predicates.
pub fn patch_in_place(ast: &mut Ast, specs: &SpecMap) -> usize {
    if specs.is_empty() {
        return 0;
    }
    let root = ast.root();
    let wrapped = walk(ast, root, specs);
    debug!(wrapped, "patched predicates with Cond");
    wrapped
}

/// Post-order: children first, then the node itself.
fn walk(ast: &mut Ast, id: NodeId, specs: &SpecMap) -> usize {
    // Already instrumented; leave its argument alone.
    if is_cond_call(ast, id) {
        return 0;
    }
    let mut wrapped = 0;
    let children = ast[id].children();
    for child in children {
        wrapped += walk(ast, child, specs);
    }
    if !is_predicate(ast, id) {
        return wrapped;
    }

    let Some(spec) = specs.get(&fingerprint(&format(ast, id))) else {
        return wrapped;
    };
    if spec.id.is_empty() {
        return wrapped;
    }

    let predicate = ast.relocate(id);
    let callee = ast.push(Node::Identifier(COND_FN.to_string()));
    let spec_id = ast.push(Node::String(spec.id.clone()));
    let reason_true = ast.push(Node::String(spec.reason_true.clone()));
    let reason_false = ast.push(Node::String(spec.reason_false.clone()));
    ast.replace(
        id,
        Node::Call {
            callee,
            args: smallvec![spec_id, reason_true, reason_false, predicate],
        },
    );
    wrapped + 1
}
