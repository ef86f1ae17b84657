//! The expression engine: lexer, parser, compile pass and interpreter for an
//! expr-lang style language, exposed through [`Engine`] as an
//! [`ExpressionEngine`].

pub mod builtins;
pub mod compile;
pub mod interpreter;
pub mod lexer;
pub mod ops;
pub mod parser;

pub use compile::{compile, Program};
pub use parser::parse;

use ruletrace_core::{Ast, CompileError, CompileOptions, Env, EvalError, ExpressionEngine, Value};
use thiserror::Error;

/// The built-in expression engine. Stateless; one instance can serve any
/// number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl ExpressionEngine for Engine {
    type Program = Program;

    fn compile(&self, source: &str, options: &CompileOptions) -> Result<Program, CompileError> {
        compile::compile(source, options)
    }

    fn syntax_tree<'p>(&self, program: &'p Program) -> &'p Ast {
        program.ast()
    }

    fn run(&self, program: &Program, env: &Env) -> Result<Value, EvalError> {
        interpreter::run(program, env)
    }
}

/// Either half of a one-shot evaluation failing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Compiles and runs `source` in one step, with no registered functions.
pub fn eval(source: &str, env: &Env) -> Result<Value, EngineError> {
    let program = compile::compile(source, &CompileOptions::new())?;
    Ok(interpreter::run(&program, env)?)
}
