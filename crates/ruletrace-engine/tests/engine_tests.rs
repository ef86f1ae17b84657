//! End-to-end tests for the expression engine through the
//! [`ExpressionEngine`] contract.
//!
//! Tests cover:
//! - The rule expressions the tracer is exercised with
//! - Registered host functions and their error surface
//! - Compile errors versus run-time errors
//! - Syntax tree access after compile-time folding

use std::sync::Arc;

use ruletrace_core::{CompileError, CompileOptions, Env, EvalError, ExpressionEngine, NativeFn, Node, Value};
use ruletrace_engine::{eval, Engine, EngineError};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn env(json: serde_json::Value) -> Env {
    Value::env_from_json(json).expect("object environment")
}

fn playground_env() -> Env {
    env(json!({
        "user": {"Id": 1, "Group": "admin", "Name": "John Doe"},
        "comment": {"UserId": 1},
        "tweets": [{"Len": 10}, {"Len": 20}],
    }))
}

// ---------------------------------------------------------------------------
// Rule expressions
// ---------------------------------------------------------------------------

#[test]
fn playground_rule_evaluates() {
    let source = r#"user.Group in ["admin", "moderator"] || user.Id == comment.UserId"#;
    assert_eq!(eval(source, &playground_env()).unwrap(), Value::Bool(true));

    let source = r#"len(tweets) > 1 and user.Name == "John Doe""#;
    assert_eq!(eval(source, &playground_env()).unwrap(), Value::Bool(true));
}

#[test]
fn word_and_symbol_operators_agree() {
    let env = playground_env();
    let words = eval("not (user.Id == 2) and (false or true)", &env).unwrap();
    let symbols = eval("!(user.Id == 2) && (false || true)", &env).unwrap();
    assert_eq!(words, symbols);
}

#[test]
fn arithmetic_and_strings() {
    let env = Env::new();
    assert_eq!(eval("1 + 2 * 3", &env).unwrap(), Value::Int(7));
    assert_eq!(eval("(1 + 2) * 3", &env).unwrap(), Value::Int(9));
    assert_eq!(eval("2 ^ 3", &env).unwrap(), Value::Float(8.0));
    assert_eq!(eval("7 % 4", &env).unwrap(), Value::Int(3));
    assert_eq!(eval("'ab' + \"cd\"", &env).unwrap(), Value::from("abcd"));
    assert_eq!(eval("upper('x') startsWith 'X'", &env).unwrap(), Value::Bool(true));
    assert_eq!(eval("-(2) + +3", &env).unwrap(), Value::Int(1));
}

#[test]
fn run_time_errors_are_eval_errors() {
    let env = Env::new();
    assert!(matches!(
        eval("1 / 0", &env),
        Err(EngineError::Eval(EvalError::DivideByZero))
    ));
    assert!(matches!(
        eval("missing > 1", &env),
        Err(EngineError::Eval(EvalError::UnknownName { .. }))
    ));
    assert!(matches!(
        eval("1 + true", &env),
        Err(EngineError::Eval(EvalError::TypeMismatch { .. }))
    ));
}

#[test]
fn malformed_source_is_a_compile_error() {
    assert!(matches!(
        eval("a ==", &Env::new()),
        Err(EngineError::Compile(CompileError::UnexpectedEnd { .. }))
    ));
    assert!(matches!(
        eval("a @ b", &Env::new()),
        Err(EngineError::Compile(CompileError::UnexpectedCharacter { offset: 2, .. }))
    ));
}

// ---------------------------------------------------------------------------
// Host functions
// ---------------------------------------------------------------------------

#[test]
fn registered_function_receives_evaluated_arguments() {
    let echo: NativeFn = Arc::new(|args| Ok(Value::Int(args.len() as i64)));
    let options = CompileOptions::new().with_function("Arity", echo);
    let program = Engine.compile("Arity(1, user.Id, 'x')", &options).unwrap();
    assert_eq!(Engine.run(&program, &playground_env()).unwrap(), Value::Int(3));
}

#[test]
fn host_function_error_surfaces_with_name() {
    let failing: NativeFn = Arc::new(|_| Err("boom".to_string()));
    let options = CompileOptions::new().with_function("Fail", failing);
    let program = Engine.compile("Fail()", &options).unwrap();
    let err = Engine.run(&program, &Env::new()).unwrap_err();
    assert_eq!(err.to_string(), "Fail: boom");
}

// ---------------------------------------------------------------------------
// Syntax tree access
// ---------------------------------------------------------------------------

#[test]
fn syntax_tree_exposes_folded_sets() {
    let program = Engine
        .compile(r#"x in [3, 1, 2]"#, &CompileOptions::new())
        .unwrap();
    let ast = Engine.syntax_tree(&program);
    let Node::Binary { right, .. } = &ast[ast.root()] else {
        panic!("expected binary root");
    };
    assert!(matches!(ast[*right], Node::Constant(_)));
}

#[test]
fn one_program_runs_against_many_environments() {
    let program = Engine
        .compile("user.Id == comment.UserId", &CompileOptions::new())
        .unwrap();
    let owner = env(json!({"user": {"Id": 1}, "comment": {"UserId": 1}}));
    let other = env(json!({"user": {"Id": 2}, "comment": {"UserId": 1}}));
    assert_eq!(Engine.run(&program, &owner).unwrap(), Value::Bool(true));
    assert_eq!(Engine.run(&program, &other).unwrap(), Value::Bool(false));
}
