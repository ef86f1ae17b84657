//! Operator enums for the expression syntax tree.
//!
//! Operators are normalized at parse time: `or`/`||` both become
//! [`BinaryOp::Or`], `and`/`&&` become [`BinaryOp::And`], `^`/`**` become
//! [`BinaryOp::Pow`] and `not`/`!` become [`UnaryOp::Not`]. The canonical
//! spelling returned by [`BinaryOp::symbol`] is the one the formatter emits.
//!
//! # Precedence
//!
//! Higher binds tighter. The same table drives the parser and the
//! formatter's parenthesization, which is what keeps formatted output
//! re-parseable into the same tree.
//!
//! | Level | Operators |
//! |---|---|
//! | 0 | `;` sequence, `let` |
//! | 1 | `? :` |
//! | 2 | `\|\|` |
//! | 3 | `&&` |
//! | 4 | `== != < <= > >= in matches contains startsWith endsWith` |
//! | 5 | `..` |
//! | 6 | `+ -` |
//! | 7 | `* / %` |
//! | 8 | `**` (right associative) |
//! | 9 | `??` |
//! | 10 | prefix `! - +` |
//! | 11 | member, index, slice, call, literals |

use serde::{Deserialize, Serialize};

/// Precedence of `;` sequences and `let` bindings.
pub const SEQUENCE_PRECEDENCE: u8 = 0;
/// Precedence of the `c ? a : b` conditional.
pub const CONDITIONAL_PRECEDENCE: u8 = 1;
/// Precedence of prefix operators.
pub const UNARY_PRECEDENCE: u8 = 10;
/// Precedence of postfix forms and primary expressions.
pub const PRIMARY_PRECEDENCE: u8 = 11;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Matches,
    Contains,
    StartsWith,
    EndsWith,
    Range,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// Null coalescing `??`.
    Coalesce,
}

impl BinaryOp {
    /// Canonical source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::Matches => "matches",
            BinaryOp::Contains => "contains",
            BinaryOp::StartsWith => "startsWith",
            BinaryOp::EndsWith => "endsWith",
            BinaryOp::Range => "..",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Coalesce => "??",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::In
            | BinaryOp::Matches
            | BinaryOp::Contains
            | BinaryOp::StartsWith
            | BinaryOp::EndsWith => 4,
            BinaryOp::Range => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
            BinaryOp::Pow => 8,
            BinaryOp::Coalesce => 9,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        matches!(self, BinaryOp::Pow)
    }

    /// Operators whose right operand may not be evaluated.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And | BinaryOp::Coalesce)
    }

    /// Comparison, membership, pattern and string predicates.
    pub fn is_predicate(self) -> bool {
        self.precedence() == 4
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }
}
