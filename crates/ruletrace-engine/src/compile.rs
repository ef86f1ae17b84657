//! Compile pass: turns a parsed [`Ast`] into a runnable [`Program`].
//!
//! The pass walks the tree once and
//! - resolves every call to either a builtin or a function registered in
//!   [`CompileOptions`] (unknown names are a [`CompileError`]),
//! - checks builtin arity,
//! - rejects `#` pointers outside a predicate argument,
//! - folds `x in [lit, ...]` over homogeneous string or integer literals into
//!   a [`Node::Constant`] set,
//! - validates literal `matches` patterns and caches the compiled regex.
//!
//! The folded tree is what [`Program::ast`] exposes, so a formatter sees the
//! sorted constant set rather than the literal order the author wrote.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use indexmap::IndexMap;
use regex::Regex;

use ruletrace_core::{Ast, BinaryOp, CompileError, CompileOptions, ConstSet, NativeFn, Node, NodeId};

use crate::builtins;
use crate::parser::parse;

/// A compiled program: the checked syntax tree plus everything needed to run
/// it without consulting the compile options again.
pub struct Program {
    source: String,
    ast: Ast,
    functions: IndexMap<String, NativeFn>,
    patterns: HashMap<NodeId, Regex>,
}

impl Program {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn function(&self, name: &str) -> Option<&NativeFn> {
        self.functions.get(name)
    }

    /// Pre-compiled pattern for the `matches` node `id`, if its pattern was a
    /// literal.
    pub fn pattern(&self, id: NodeId) -> Option<&Regex> {
        self.patterns.get(&id)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("source", &self.source)
            .field("nodes", &self.ast.len())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// Parses and compiles `source`.
pub fn compile(source: &str, options: &CompileOptions) -> Result<Program, CompileError> {
    let mut ast = parse(source)?;
    let mut patterns = HashMap::new();
    let mut pass = Pass {
        options,
        patterns: &mut patterns,
    };
    let root = ast.root();
    pass.visit(&mut ast, root, false)?;

    Ok(Program {
        source: source.to_string(),
        ast,
        functions: options
            .functions()
            .map(|(name, f)| (name.to_string(), f.clone()))
            .collect(),
        patterns,
    })
}

struct Pass<'a> {
    options: &'a CompileOptions,
    patterns: &'a mut HashMap<NodeId, Regex>,
}

impl Pass<'_> {
    fn visit(&mut self, ast: &mut Ast, id: NodeId, in_predicate: bool) -> Result<(), CompileError> {
        match &ast[id] {
            Node::Pointer(name) if !in_predicate => {
                return Err(CompileError::PointerOutsidePredicate { name: name.clone() });
            }
            Node::Call { callee, args } => {
                let name = match &ast[*callee] {
                    Node::Identifier(name) => name.clone(),
                    other => other.kind_name().to_string(),
                };
                if !self.options.has_function(&name) {
                    return Err(CompileError::UnknownFunction { name });
                }
                for arg in args.clone() {
                    self.visit(ast, arg, in_predicate)?;
                }
                return Ok(());
            }
            Node::Builtin { name, args } => {
                let Some(spec) = builtins::lookup(name) else {
                    return Err(CompileError::UnknownFunction { name: name.clone() });
                };
                if !spec.accepts(args.len()) {
                    return Err(CompileError::WrongArgumentCount {
                        name: name.clone(),
                        expected: spec.arity(),
                        got: args.len(),
                    });
                }
                for (i, arg) in args.clone().into_iter().enumerate() {
                    let inside = in_predicate || spec.predicate == Some(i);
                    self.visit(ast, arg, inside)?;
                }
                return Ok(());
            }
            Node::Binary {
                op: BinaryOp::In,
                right,
                ..
            } => {
                let right = *right;
                if let Some(set) = literal_set(ast, right) {
                    ast.replace(right, Node::Constant(set));
                }
            }
            Node::Binary {
                op: BinaryOp::Matches,
                right,
                ..
            } => {
                if let Node::String(pattern) = &ast[*right] {
                    let regex = Regex::new(pattern).map_err(|e| CompileError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
                    self.patterns.insert(id, regex);
                }
            }
            _ => {}
        }

        let children = ast[id].children();
        for child in children {
            self.visit(ast, child, in_predicate)?;
        }
        Ok(())
    }
}

/// The folded set for an array of only string or only integer literals.
fn literal_set(ast: &Ast, id: NodeId) -> Option<ConstSet> {
    let Node::Array(items) = &ast[id] else {
        return None;
    };
    let first = items.first()?;
    match &ast[*first] {
        Node::String(_) => items
            .iter()
            .map(|item| match &ast[*item] {
                Node::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect::<Option<BTreeSet<_>>>()
            .map(ConstSet::Strings),
        Node::Integer(_) => items
            .iter()
            .map(|item| match &ast[*item] {
                Node::Integer(i) => Some(*i),
                _ => None,
            })
            .collect::<Option<BTreeSet<_>>>()
            .map(ConstSet::Ints),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use ruletrace_core::Value;

    fn root_node(program: &Program) -> &Node {
        &program.ast()[program.ast().root()]
    }

    #[test]
    fn folds_string_membership_into_sorted_set() {
        let program = compile(r#"g in ["moderator", "admin", "admin"]"#, &CompileOptions::new()).unwrap();
        let Node::Binary { right, .. } = root_node(&program) else {
            panic!("expected binary");
        };
        match &program.ast()[*right] {
            Node::Constant(ConstSet::Strings(set)) => {
                let members: Vec<_> = set.iter().cloned().collect();
                assert_eq!(members, vec!["admin".to_string(), "moderator".to_string()]);
            }
            other => panic!("expected constant set, got {:?}", other),
        }
    }

    #[test]
    fn mixed_arrays_are_not_folded() {
        let program = compile(r#"g in ["a", 1]"#, &CompileOptions::new()).unwrap();
        let Node::Binary { right, .. } = root_node(&program) else {
            panic!("expected binary");
        };
        assert!(matches!(program.ast()[*right], Node::Array(_)));

        let program = compile("g in []", &CompileOptions::new()).unwrap();
        let Node::Binary { right, .. } = root_node(&program) else {
            panic!("expected binary");
        };
        assert!(matches!(program.ast()[*right], Node::Array(_)));
    }

    #[test]
    fn unknown_function_is_a_compile_error() {
        let err = compile("Cond('a', 'b', 'c', true)", &CompileOptions::new()).unwrap_err();
        assert_eq!(err, CompileError::UnknownFunction { name: "Cond".into() });

        let noop: NativeFn = Arc::new(|args| Ok(args.last().cloned().unwrap_or(Value::Nil)));
        let options = CompileOptions::new().with_function("Cond", noop);
        let program = compile("Cond('a', 'b', 'c', true)", &options).unwrap();
        assert!(program.function("Cond").is_some());
    }

    #[test]
    fn builtin_arity_is_checked() {
        let err = compile("len(a, b)", &CompileOptions::new()).unwrap_err();
        assert_eq!(
            err,
            CompileError::WrongArgumentCount {
                name: "len".into(),
                expected: "1".into(),
                got: 2,
            }
        );
    }

    #[test]
    fn pointer_outside_predicate() {
        let err = compile("# > 1", &CompileOptions::new()).unwrap_err();
        assert!(matches!(err, CompileError::PointerOutsidePredicate { .. }));
        assert!(compile("all(xs, {# > 1})", &CompileOptions::new()).is_ok());
        // The collection argument is not a predicate position.
        assert!(compile("all(#, {# > 1})", &CompileOptions::new()).is_err());
    }

    #[test]
    fn literal_patterns_are_validated_and_cached() {
        let err = compile(r#"name matches "(""#, &CompileOptions::new()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidPattern { .. }));

        let program = compile(r#"name matches "^J""#, &CompileOptions::new()).unwrap();
        assert!(program.pattern(program.ast().root()).is_some());
    }
}
