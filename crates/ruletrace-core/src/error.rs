//! Error types shared by every expression engine.
//!
//! Uses `thiserror` for structured, matchable variants. [`CompileError`]
//! covers malformed source and unresolved names; [`EvalError`] covers
//! run-time failures of a compiled program. Both render to plain strings when
//! embedded in trace output.

use thiserror::Error;

/// Errors produced while turning source text into a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The lexer found text that is not a token.
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedCharacter { found: String, offset: usize },

    /// A numeric literal that does not fit its type: an integer beyond
    /// `i64` or a float that overflows to infinity.
    #[error("number {literal} out of range at offset {offset}")]
    NumberOutOfRange { literal: String, offset: usize },

    /// The parser found a token it cannot use here.
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },

    /// Input ended in the middle of an expression.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },

    /// A call names a function that is neither builtin nor registered.
    #[error("unknown function {name}")]
    UnknownFunction { name: String },

    /// A builtin was called with the wrong number of arguments.
    #[error("{name} expects {expected} argument(s), got {got}")]
    WrongArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },

    /// A literal `matches` pattern is not a valid regular expression.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// `#` used outside a predicate argument.
    #[error("pointer #{name} used outside of a predicate")]
    PointerOutsidePredicate { name: String },
}

/// Errors produced while running a compiled program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Identifier not bound by `let` and absent from the environment.
    #[error("unknown name {name}")]
    UnknownName { name: String },

    /// A binary operator received operands it does not accept.
    #[error("invalid operation: {left} {op} {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    /// A unary operator, logical operator or condition received a value of
    /// the wrong type.
    #[error("invalid operand for {op}: expected {expected}, got {got}")]
    InvalidOperand {
        op: String,
        expected: String,
        got: String,
    },

    #[error("integer divide by zero")]
    DivideByZero,

    #[error("integer overflow in {op}")]
    IntegerOverflow { op: String },

    #[error("index out of range: {index} (length {len})")]
    IndexOutOfRange { index: i64, len: usize },

    /// Member or index access on a value that has no members.
    #[error("cannot fetch {property} from {type_name}")]
    CannotFetch { property: String, type_name: String },

    /// A registered function returned an error.
    #[error("{name}: {message}")]
    Function { name: String, message: String },

    /// A builtin rejected its arguments.
    #[error("{name}: {message}")]
    Builtin { name: String, message: String },

    #[error("unknown pointer #{name}")]
    UnknownPointer { name: String },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A node kind that only has meaning inside its parent was evaluated on
    /// its own.
    #[error("{kind} cannot be evaluated outside its parent")]
    Detached { kind: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_messages() {
        let err = CompileError::UnknownFunction { name: "Cond".into() };
        assert_eq!(err.to_string(), "unknown function Cond");

        let err = CompileError::UnexpectedEnd {
            expected: "expression".into(),
        };
        assert_eq!(err.to_string(), "unexpected end of input, expected expression");
    }

    #[test]
    fn eval_error_messages() {
        let err = EvalError::TypeMismatch {
            op: "+".into(),
            left: "int".into(),
            right: "bool".into(),
        };
        assert_eq!(err.to_string(), "invalid operation: int + bool");

        let err = EvalError::Function {
            name: "Cond".into(),
            message: "Cond expects 4 arguments, got 3".into(),
        };
        assert_eq!(err.to_string(), "Cond: Cond expects 4 arguments, got 3");
    }
}
