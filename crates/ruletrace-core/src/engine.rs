//! The [`ExpressionEngine`] trait: the contract between the tracer and the
//! engine that parses, compiles and runs expressions.
//!
//! The tracer never evaluates anything itself. It asks an engine to compile
//! source into a program, reads the program's syntax tree, and runs programs
//! against an environment. Functions registered through [`CompileOptions`]
//! are callable from expression source by name; this is how the tracer
//! injects its instrumentation hook for a single trace call.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::Ast;
use crate::error::{CompileError, EvalError};
use crate::value::{Env, Value};

/// A host function callable from expression source.
///
/// Receives the evaluated arguments. An `Err` message surfaces as an
/// [`EvalError::Function`] at the call site.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Options applied when compiling a program.
#[derive(Clone, Default)]
pub struct CompileOptions {
    functions: IndexMap<String, NativeFn>,
}

impl CompileOptions {
    pub fn new() -> Self {
        CompileOptions::default()
    }

    /// Registers `function` under `name`, replacing any previous registration.
    pub fn with_function(mut self, name: impl Into<String>, function: NativeFn) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn function(&self, name: &str) -> Option<&NativeFn> {
        self.functions.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered functions in registration order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &NativeFn)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The storage-independent contract every expression engine implements.
///
/// Engines must be shareable across threads: one engine instance may serve
/// concurrent trace calls.
pub trait ExpressionEngine: Send + Sync {
    /// A compiled, runnable program.
    type Program: Send + Sync;

    /// Parses and compiles `source`.
    fn compile(&self, source: &str, options: &CompileOptions) -> Result<Self::Program, CompileError>;

    /// The syntax tree the program was compiled from, after any compile-time
    /// rewrites. Callers clone it to patch it.
    fn syntax_tree<'p>(&self, program: &'p Self::Program) -> &'p Ast;

    /// Runs a compiled program against `env`.
    fn run(&self, program: &Self::Program, env: &Env) -> Result<Value, EvalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_replaces_functions() {
        let first: NativeFn = Arc::new(|_| Ok(Value::Int(1)));
        let second: NativeFn = Arc::new(|_| Ok(Value::Int(2)));
        let options = CompileOptions::new()
            .with_function("f", first)
            .with_function("f", second);

        assert!(options.has_function("f"));
        assert!(!options.has_function("g"));
        let f = options.function("f").unwrap();
        assert_eq!(f(&[]).unwrap(), Value::Int(2));
        assert_eq!(options.functions().count(), 1);
    }

    #[test]
    fn debug_lists_names_only() {
        let noop: NativeFn = Arc::new(|_| Ok(Value::Nil));
        let options = CompileOptions::new().with_function("Cond", noop);
        assert_eq!(format!("{:?}", options), r#"CompileOptions { functions: ["Cond"] }"#);
    }
}
