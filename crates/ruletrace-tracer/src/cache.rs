//! Per-trace compiled-program cache.
//!
//! Keyed by exact source text. Canonical strings are already normalized, so
//! equal sub-expressions hit the same entry. A cache is bound to one set of
//! compile options (and so to one recorder) and must not outlive the trace
//! call that created it.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use ruletrace_core::{CompileError, CompileOptions, Env, ExpressionEngine, Value};

pub struct ProgramCache<'e, E: ExpressionEngine> {
    engine: &'e E,
    options: CompileOptions,
    programs: DashMap<String, Arc<E::Program>>,
}

impl<'e, E: ExpressionEngine> ProgramCache<'e, E> {
    pub fn new(engine: &'e E, options: CompileOptions) -> Self {
        ProgramCache {
            engine,
            options,
            programs: DashMap::new(),
        }
    }

    /// Returns the cached program for `source`, compiling it on a miss.
    /// Compile failures are not cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<E::Program>, CompileError> {
        if let Some(program) = self.programs.get(source) {
            trace!(source, "program cache hit");
            return Ok(Arc::clone(program.value()));
        }
        trace!(source, "program cache miss");
        let program = Arc::new(self.engine.compile(source, &self.options)?);
        let entry = self
            .programs
            .entry(source.to_string())
            .or_insert(program);
        Ok(Arc::clone(entry.value()))
    }

    /// Compiles (through the cache) and runs `source`. Either failure is
    /// rendered to its message.
    pub fn eval(&self, source: &str, env: &Env) -> Result<Value, String> {
        let program = self.get_or_compile(source).map_err(|e| e.to_string())?;
        self.engine.run(&program, env).map_err(|e| e.to_string())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.programs.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
