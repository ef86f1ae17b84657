//! Canonical formatter.
//!
//! Renders any subtree to a deterministic, re-parseable string. The output
//! serves two purposes: identity (it is what gets fingerprinted) and
//! re-execution (a patched tree is formatted and compiled again).
//!
//! Rules:
//! - operators use their symbolic spelling (`&&`, `||`, `!`, `**`)
//! - parentheses appear only where the child binds looser than its slot
//! - strings are double-quoted with `\\ \" \n \t \r` escaped
//! - constant sets and map literals render with sorted members
//! - member access renders as `.name` when the name is identifier-like and
//!   as `["name"]` otherwise; `?.` marks optional access
//! - chain wrappers are transparent

use std::fmt::Write;

use ruletrace_core::node::is_identifier;
use ruletrace_core::ops::{
    CONDITIONAL_PRECEDENCE, PRIMARY_PRECEDENCE, SEQUENCE_PRECEDENCE, UNARY_PRECEDENCE,
};
use ruletrace_core::{Ast, ConstSet, Node, NodeId};

/// Formats `id` within `ast`.
pub fn format(ast: &Ast, id: NodeId) -> String {
    Formatter::new(ast).format(id)
}

/// Formats the whole tree.
pub fn format_root(ast: &Ast) -> String {
    format(ast, ast.root())
}

/// Canonical formatter over one syntax tree.
pub struct Formatter<'a> {
    ast: &'a Ast,
}

impl<'a> Formatter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Formatter { ast }
    }

    pub fn format(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write(&mut out, id, SEQUENCE_PRECEDENCE);
        out
    }

    /// How tightly the rendered form of `id` binds.
    fn precedence(&self, id: NodeId) -> u8 {
        match &self.ast[id] {
            Node::Sequence(_) | Node::Let { .. } => SEQUENCE_PRECEDENCE,
            Node::Conditional { .. } => CONDITIONAL_PRECEDENCE,
            Node::Binary { op, .. } => op.precedence(),
            Node::Unary { .. } => UNARY_PRECEDENCE,
            Node::Chain(inner) => self.precedence(*inner),
            _ => PRIMARY_PRECEDENCE,
        }
    }

    /// Writes `id`, parenthesized if it binds looser than `min_prec`.
    fn write(&self, out: &mut String, id: NodeId, min_prec: u8) {
        if self.precedence(id) < min_prec {
            out.push('(');
            self.write_node(out, id);
            out.push(')');
        } else {
            self.write_node(out, id);
        }
    }

    fn write_list(&self, out: &mut String, items: &[NodeId]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write(out, *item, CONDITIONAL_PRECEDENCE);
        }
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match &self.ast[id] {
            Node::Nil => out.push_str("nil"),
            Node::Identifier(name) => out.push_str(name),
            Node::Integer(i) => {
                let _ = write!(out, "{}", i);
            }
            Node::Float(x) => {
                // Debug keeps a fractional part or exponent, so the literal
                // lexes as a float again.
                let _ = write!(out, "{:?}", x);
            }
            Node::Bool(b) => {
                let _ = write!(out, "{}", b);
            }
            Node::String(s) => push_quoted(out, s),
            Node::Bytes(bytes) => push_bytes(out, bytes),
            Node::Constant(set) => {
                out.push('[');
                match set {
                    ConstSet::Strings(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            push_quoted(out, item);
                        }
                    }
                    ConstSet::Ints(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            let _ = write!(out, "{}", item);
                        }
                    }
                }
                out.push(']');
            }
            Node::Unary { op, operand } => {
                out.push_str(op.symbol());
                self.write(out, *operand, UNARY_PRECEDENCE);
            }
            Node::Binary { op, left, right } => {
                let prec = op.precedence();
                let (left_min, right_min) = if op.is_right_assoc() {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.write(out, *left, left_min);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                self.write(out, *right, right_min);
            }
            Node::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.write(out, *cond, CONDITIONAL_PRECEDENCE + 1);
                out.push_str(" ? ");
                self.write(out, *then, CONDITIONAL_PRECEDENCE);
                out.push_str(" : ");
                self.write(out, *otherwise, CONDITIONAL_PRECEDENCE);
            }
            Node::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    self.write(out, *item, CONDITIONAL_PRECEDENCE);
                }
            }
            Node::Let { name, value, body } => {
                let _ = write!(out, "let {} = ", name);
                self.write(out, *value, CONDITIONAL_PRECEDENCE);
                out.push_str("; ");
                self.write(out, *body, SEQUENCE_PRECEDENCE);
            }
            Node::Array(items) => {
                out.push('[');
                self.write_list(out, items);
                out.push(']');
            }
            Node::Map(pairs) => {
                let mut rendered: Vec<(String, String)> = pairs
                    .iter()
                    .map(|pair| match &self.ast[*pair] {
                        Node::Pair { key, value } => (self.map_key(*key), self.format_in(*value)),
                        _ => (self.format(*pair), String::new()),
                    })
                    .collect();
                rendered.sort();
                out.push('{');
                for (i, (key, value)) in rendered.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    if !value.is_empty() {
                        out.push_str(": ");
                        out.push_str(value);
                    }
                }
                out.push('}');
            }
            Node::Pair { key, value } => {
                out.push_str(&self.map_key(*key));
                out.push_str(": ");
                self.write(out, *value, CONDITIONAL_PRECEDENCE);
            }
            Node::Call { callee, args } => {
                self.write_base(out, *callee);
                out.push('(');
                self.write_list(out, args);
                out.push(')');
            }
            Node::Builtin { name, args } => {
                out.push_str(name);
                out.push('(');
                self.write_list(out, args);
                out.push(')');
            }
            Node::Predicate(body) => {
                out.push('{');
                self.write(out, *body, SEQUENCE_PRECEDENCE);
                out.push('}');
            }
            Node::Pointer(name) => {
                out.push('#');
                out.push_str(name);
            }
            Node::Member {
                base,
                property,
                optional,
            } => {
                self.write_base(out, *base);
                match &self.ast[*property] {
                    Node::String(name) if is_identifier(name) => {
                        out.push_str(if *optional { "?." } else { "." });
                        out.push_str(name);
                    }
                    _ => {
                        out.push_str(if *optional { "?.[" } else { "[" });
                        self.write(out, *property, CONDITIONAL_PRECEDENCE);
                        out.push(']');
                    }
                }
            }
            Node::Slice { base, from, to } => {
                self.write_base(out, *base);
                out.push('[');
                if let Some(from) = from {
                    self.write(out, *from, CONDITIONAL_PRECEDENCE);
                }
                out.push(':');
                if let Some(to) = to {
                    self.write(out, *to, CONDITIONAL_PRECEDENCE);
                }
                out.push(']');
            }
            Node::Chain(inner) => self.write_node(out, *inner),
        }
    }

    /// Base of a member access, slice or call. An optional chain in this
    /// position keeps its parentheses: `(a?.b).c` stops nil propagation at
    /// the parenthesis, `a?.b.c` does not.
    fn write_base(&self, out: &mut String, base: NodeId) {
        if matches!(self.ast[base], Node::Chain(_)) {
            out.push('(');
            self.write_node(out, base);
            out.push(')');
        } else {
            self.write(out, base, PRIMARY_PRECEDENCE);
        }
    }

    fn format_in(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write(&mut out, id, CONDITIONAL_PRECEDENCE);
        out
    }

    /// Map keys: bare when identifier-like, quoted otherwise.
    fn map_key(&self, key: NodeId) -> String {
        match &self.ast[key] {
            Node::String(name) if is_identifier(name) => name.clone(),
            Node::String(name) => {
                let mut out = String::new();
                push_quoted(&mut out, name);
                out
            }
            _ => self.format_in(key),
        }
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn push_bytes(out: &mut String, bytes: &[u8]) {
    out.push_str("b\"");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruletrace_core::CompileOptions;
    use ruletrace_engine::{compile, parse};

    fn canon(source: &str) -> String {
        format_root(&parse(source).unwrap())
    }

    fn compiled(source: &str) -> String {
        format_root(compile(source, &CompileOptions::new()).unwrap().ast())
    }

    #[test]
    fn normalizes_spacing_and_word_operators() {
        assert_eq!(canon("a   and(b or   c)"), "a && (b || c)");
        assert_eq!(canon("not x"), "!x");
        assert_eq!(canon("2 ^ 3"), "2 ** 3");
        assert_eq!(canon("null"), "nil");
    }

    #[test]
    fn minimal_parentheses() {
        assert_eq!(canon("(a || b) && c"), "(a || b) && c");
        assert_eq!(canon("a || (b && c)"), "a || b && c");
        assert_eq!(canon("a - (b - c)"), "a - (b - c)");
        assert_eq!(canon("(a - b) - c"), "a - b - c");
        assert_eq!(canon("(2 ** 3) ** 2"), "(2 ** 3) ** 2");
        assert_eq!(canon("2 ** (3 ** 2)"), "2 ** 3 ** 2");
        assert_eq!(canon("-(a + b)"), "-(a + b)");
        assert_eq!(canon("(a ? b : c) ? d : e"), "(a ? b : c) ? d : e");
        assert_eq!(canon("(a + b).c"), "(a + b).c");
    }

    #[test]
    fn negated_membership_renders_as_prefix() {
        assert_eq!(canon("x not in y"), "!(x in y)");
    }

    #[test]
    fn strings_are_escaped_and_double_quoted() {
        assert_eq!(canon(r#"'a"b'"#), r#""a\"b""#);
        assert_eq!(canon(r#""tab\there\n""#), r#""tab\there\n""#);
        assert_eq!(canon(r#"b"a\x00""#), r#"b"a\x00""#);
    }

    #[test]
    fn floats_keep_a_float_form() {
        assert_eq!(canon("1.0"), "1.0");
        assert_eq!(canon("2.5 * 2"), "2.5 * 2");
    }

    #[test]
    fn members_and_slices() {
        assert_eq!(canon("user.Profile.Name"), "user.Profile.Name");
        assert_eq!(canon("user?.Profile"), "user?.Profile");
        assert_eq!(canon("user['two words']"), r#"user["two words"]"#);
        assert_eq!(canon("user.in"), r#"user["in"]"#);
        assert_eq!(canon("xs?.[0]"), "xs?.[0]");
        assert_eq!(canon("xs[1:]"), "xs[1:]");
        assert_eq!(canon("xs[:2]"), "xs[:2]");
    }

    #[test]
    fn parenthesized_chain_stays_a_base() {
        assert_eq!(canon("(a?.b).c"), "(a?.b).c");
        assert_eq!(canon("(a?.b)[1:]"), "(a?.b)[1:]");
        assert_eq!(canon("(a?.b)?.c"), "(a?.b)?.c");
        assert_eq!(canon("(a?.b.c)"), "a?.b.c");
        assert_eq!(canon("(a?.b) == nil"), "a?.b == nil");

        for source in ["(a?.b).c", "(xs?.[0])[1:]", "a?.b.c"] {
            let ast = parse(source).unwrap();
            assert_eq!(parse(&format_root(&ast)).unwrap(), ast, "{source}");
        }
    }

    #[test]
    fn builtins_predicates_and_pointers() {
        assert_eq!(canon("all(tweets, len(#.Content) > 1)"), "all(tweets, {len(#.Content) > 1})");
        assert_eq!(canon("map(xs, {#index})"), "map(xs, {#index})");
    }

    #[test]
    fn sets_and_maps_are_sorted() {
        assert_eq!(
            compiled(r#"g in ["moderator", "admin"]"#),
            r#"g in ["admin", "moderator"]"#
        );
        assert_eq!(compiled("n in [3, 1, 2]"), "n in [1, 2, 3]");
        assert_eq!(canon(r#"{b: 1, "a b": 2, a: 3}"#), r#"{"a b": 2, a: 3, b: 1}"#);
    }

    #[test]
    fn sequences_and_lets() {
        assert_eq!(canon("let x = 1; x + 1"), "let x = 1; x + 1");
        assert_eq!(canon("1;2"), "1; 2");
        assert_eq!(canon("a ? b : (c; d)"), "a ? b : (c; d)");
    }

    #[test]
    fn calls() {
        assert_eq!(
            canon("Cond('c_owner', 'IS_OWNER', 'NOT_OWNER', user.Id == comment.UserId)"),
            r#"Cond("c_owner", "IS_OWNER", "NOT_OWNER", user.Id == comment.UserId)"#
        );
    }
}
