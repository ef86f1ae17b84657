//! Atom classification and collection.
//!
//! An atom is the outermost comparison, membership, pattern or string
//! predicate on a path, or an instrumentation call wrapping one. Collection
//! stops at the first atom on each path, so atoms never contain atoms.
//!
//! Collection does not enter predicate bodies or `let` expressions. Both are
//! evaluated in a scope (`#`, bound names) that a standalone chunk does not
//! have, so the whole builtin call or `let` is traced as one chunk.

use serde::Serialize;

use ruletrace_core::{Ast, Node, NodeId};

use crate::fingerprint::fingerprint;
use crate::format::Formatter;
use crate::recorder::COND_FN;

/// True for a call of the reserved instrumentation function.
pub fn is_cond_call(ast: &Ast, id: NodeId) -> bool {
    match &ast[id] {
        Node::Call { callee, .. } => matches!(&ast[*callee], Node::Identifier(name) if name == COND_FN),
        _ => false,
    }
}

/// The literal ID argument of an instrumentation call.
pub fn cond_id(ast: &Ast, id: NodeId) -> Option<String> {
    if !is_cond_call(ast, id) {
        return None;
    }
    let Node::Call { args, .. } = &ast[id] else {
        return None;
    };
    match args.first().map(|arg| &ast[*arg]) {
        Some(Node::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// True for a predicate operator node (not counting instrumentation calls).
pub fn is_predicate(ast: &Ast, id: NodeId) -> bool {
    matches!(&ast[id], Node::Binary { op, .. } if op.is_predicate())
}

pub fn is_atom(ast: &Ast, id: NodeId) -> bool {
    is_predicate(ast, id) || is_cond_call(ast, id)
}

/// Atoms under `id` in left-to-right order.
pub fn collect_atoms(ast: &Ast, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect(ast, id, &mut out);
    out
}

fn collect(ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
    if is_atom(ast, id) {
        out.push(id);
        return;
    }
    match &ast[id] {
        Node::Predicate(_) | Node::Let { .. } => {}
        node => {
            for child in node.children() {
                collect(ast, child, out);
            }
        }
    }
}

/// An atom as listed for spec authoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Atom {
    pub expr: String,
    pub fingerprint: String,
}

/// Every atom of the tree with its canonical text and fingerprint.
pub fn list_atoms(ast: &Ast) -> Vec<Atom> {
    let formatter = Formatter::new(ast);
    collect_atoms(ast, ast.root())
        .into_iter()
        .map(|id| {
            let expr = formatter.format(id);
            Atom {
                fingerprint: fingerprint(&expr),
                expr,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruletrace_engine::parse;

    fn atom_texts(source: &str) -> Vec<String> {
        list_atoms(&parse(source).unwrap())
            .into_iter()
            .map(|a| a.expr)
            .collect()
    }

    #[test]
    fn splits_logical_operators() {
        assert_eq!(
            atom_texts(r#"user.Group in ["admin", "moderator"] || user.Id == comment.UserId && len(tweets) > 1"#),
            vec![
                r#"user.Group in ["admin", "moderator"]"#,
                "user.Id == comment.UserId",
                "len(tweets) > 1",
            ]
        );
    }

    #[test]
    fn outermost_predicate_wins() {
        assert_eq!(atom_texts("(a == b) == true"), vec!["a == b == true"]);
    }

    #[test]
    fn descends_through_wrappers() {
        assert_eq!(atom_texts("!(a > 1) ? b != 2 : c"), vec!["a > 1", "b != 2"]);
        assert_eq!(atom_texts("user?.Name startsWith 'J'"), vec![r#"user?.Name startsWith "J""#]);
    }

    #[test]
    fn no_atoms() {
        assert!(atom_texts("a && b").is_empty());
        assert!(atom_texts("len(xs) + 1").is_empty());
    }

    #[test]
    fn predicate_bodies_are_opaque() {
        assert!(atom_texts("all(xs, {# > 1})").is_empty());
        assert!(atom_texts("let n = a > 1; n && b").is_empty());
        assert_eq!(atom_texts("(let n = a; n == 1) || b == 2"), vec!["b == 2"]);
    }

    #[test]
    fn cond_calls_are_atoms() {
        let ast = parse(r#"Cond("c_owner", "Y", "N", a == b) || c"#).unwrap();
        let atoms = collect_atoms(&ast, ast.root());
        assert_eq!(atoms.len(), 1);
        assert!(is_cond_call(&ast, atoms[0]));
        assert_eq!(cond_id(&ast, atoms[0]).as_deref(), Some("c_owner"));
    }

    #[test]
    fn fingerprints_match_the_canonical_text() {
        let atoms = list_atoms(&parse("user.Id   ==   comment.UserId").unwrap());
        assert_eq!(atoms[0].fingerprint, fingerprint("user.Id == comment.UserId"));
    }
}
