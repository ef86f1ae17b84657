//! The tracer: explainable evaluation of one expression.
//!
//! A trace call runs these steps in order:
//!
//! 1. Compile the source, with the `Cond` recorder registered when enabled.
//! 2. Patch spec'd predicates into `Cond(...)` calls.
//! 3. Produce chunks from the (patched) tree.
//! 4. Format the (patched) tree and evaluate that text once for the final
//!    value. Chunks and final value therefore come from the same tree.
//! 5. Copy ID and reason from the recorder onto `Cond` chunks.
//!
//! Chunk production walks the short-circuit operators (`||`, `&&`, `??`)
//! structurally. Each step returns a [`Trail`]: the chunks plus the
//! [`Outcome`] that decides whether the enclosing operator short-circuits.
//! Below the short-circuit operators a subtree becomes one chunk (coarse) or
//! one chunk per atom (atomic). Either way its outcome is the value of the
//! whole subtree.

use std::sync::Arc;

use tracing::debug;

use ruletrace_core::{Ast, BinaryOp, CompileError, CompileOptions, Env, ExpressionEngine, Node, NodeId, Value};
use ruletrace_engine::Engine;

use crate::atoms::{collect_atoms, cond_id, list_atoms, Atom};
use crate::cache::ProgramCache;
use crate::config::{TraceMode, TracerConfig};
use crate::error::TraceError;
use crate::fingerprint::fingerprint;
use crate::format::Formatter;
use crate::patch::{patch_in_place, SpecMap};
use crate::recorder::{Recorder, COND_FN};
use crate::result::{EvalResult, TraceResult};

/// Value that decides short-circuiting for the operator above a subtree.
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    /// The subtree evaluated to this value.
    Definite(Value),
    /// The subtree failed.
    Errored,
    /// Nothing was evaluated.
    Empty,
}

/// A produced chunk with the `Cond` ID it can be attributed to.
struct Chunk {
    result: EvalResult,
    cond_id: Option<String>,
}

struct Trail {
    chunks: Vec<Chunk>,
    outcome: Outcome,
}

impl Trail {
    fn empty() -> Self {
        Trail {
            chunks: Vec::new(),
            outcome: Outcome::Empty,
        }
    }
}

/// Traces expressions against a fixed environment.
///
/// Cheap to share: trace calls take `&self` and keep all per-call state
/// (program cache, recorder) local to the call.
#[derive(Debug, Clone)]
pub struct Tracer<E: ExpressionEngine = Engine> {
    engine: E,
    env: Env,
    config: TracerConfig,
}

impl Tracer<Engine> {
    /// A tracer over the built-in engine with the default configuration.
    pub fn new(env: Env) -> Self {
        Tracer::with_engine(Engine, env)
    }
}

impl<E: ExpressionEngine> Tracer<E> {
    pub fn with_engine(engine: E, env: Env) -> Self {
        Tracer {
            engine,
            env,
            config: TracerConfig::default(),
        }
    }

    pub fn with_mode(mut self, mode: TraceMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_short_circuit(mut self, enabled: bool) -> Self {
        self.config.short_circuit = enabled;
        self
    }

    pub fn with_cond(mut self, enabled: bool) -> Self {
        self.config.enable_cond = enabled;
        self
    }

    pub fn with_config(mut self, config: TracerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Traces `source`. Never fails: compile and evaluation errors are
    /// embedded in the chunks.
    pub fn trace(&self, source: &str, specs: &SpecMap) -> TraceResult {
        match self.run(source, specs) {
            Ok(result) => result,
            Err(TraceError::Compile { partial, .. }) => *partial,
        }
    }

    /// Like [`Tracer::trace`], but a compile failure is returned as an error
    /// carrying the partial result.
    pub fn trace_strict(&self, source: &str, specs: &SpecMap) -> Result<TraceResult, TraceError> {
        self.run(source, specs)
    }

    /// The atoms of `source` with canonical text and fingerprint, for
    /// authoring specs.
    pub fn atoms(&self, source: &str) -> Result<Vec<Atom>, CompileError> {
        let recorder = Arc::new(Recorder::new());
        let options = CompileOptions::new().with_function(COND_FN, recorder.native_fn());
        let program = self.engine.compile(source, &options)?;
        Ok(list_atoms(self.engine.syntax_tree(&program)))
    }

    fn run(&self, source: &str, specs: &SpecMap) -> Result<TraceResult, TraceError> {
        let recorder = Arc::new(Recorder::new());
        let mut options = CompileOptions::new();
        if self.config.enable_cond {
            options = options.with_function(COND_FN, recorder.native_fn());
        }
        let cache = ProgramCache::new(&self.engine, options);

        // 1) compile
        let program = match cache.get_or_compile(source) {
            Ok(program) => program,
            Err(error) => {
                debug!(source, %error, "trace source failed to compile");
                let partial = TraceResult {
                    source: source.to_string(),
                    chunks: vec![EvalResult {
                        error: Some(error.to_string()),
                        ..EvalResult::for_expr(source)
                    }],
                    final_value: None,
                    mode: self.config.mode,
                };
                return Err(TraceError::Compile {
                    error,
                    partial: Box::new(partial),
                });
            }
        };

        // 2) patch
        let mut ast = self.engine.syntax_tree(&program).clone();
        if self.config.enable_cond {
            patch_in_place(&mut ast, specs);
        }

        // 3) chunks
        let walk = ChunkWalk {
            ast: &ast,
            formatter: Formatter::new(&ast),
            cache: &cache,
            env: &self.env,
            config: &self.config,
        };
        let trail = walk.chunks(ast.root());

        // 4) authoritative evaluation of the same tree
        let patched_source = walk.formatter.format(ast.root());
        // Chunk evaluation may have executed Cond calls; only the final run
        // counts for attribution.
        recorder.clear();
        let final_value = match cache.eval(&patched_source, &self.env) {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(source = %patched_source, %error, "final evaluation failed");
                None
            }
        };

        // 5) attribution
        let chunks = trail
            .chunks
            .into_iter()
            .map(|chunk| {
                let mut result = chunk.result;
                if let Some(seen) = chunk.cond_id.and_then(|id| recorder.get(&id)) {
                    result.id = Some(seen.id);
                    result.reason = Some(seen.reason);
                }
                result
            })
            .collect();

        Ok(TraceResult {
            source: patched_source,
            chunks,
            final_value,
            mode: self.config.mode,
        })
    }
}

/// Chunk production over one (patched) tree.
struct ChunkWalk<'a, E: ExpressionEngine> {
    ast: &'a Ast,
    formatter: Formatter<'a>,
    cache: &'a ProgramCache<'a, E>,
    env: &'a Env,
    config: &'a TracerConfig,
}

impl<E: ExpressionEngine> ChunkWalk<'_, E> {
    fn chunks(&self, id: NodeId) -> Trail {
        if self.config.mode == TraceMode::None {
            return Trail::empty();
        }
        match &self.ast[id] {
            Node::Chain(inner) => self.chunks(*inner),
            Node::Binary { op, left, right } if op.is_short_circuit() => {
                self.short_circuit(*op, *left, *right)
            }
            _ if self.config.mode == TraceMode::Coarse => self.single(id),
            _ => {
                let atoms = collect_atoms(self.ast, id);
                if atoms.is_empty() {
                    return self.single(id);
                }
                let mut trail = Trail::empty();
                for &atom in &atoms {
                    let chunk = self.evaluate(atom);
                    trail.outcome = outcome_of(&chunk.result);
                    self.keep(&mut trail, chunk);
                }
                // A compound subtree is decided by its own value, not by its
                // last atom.
                if atoms.len() != 1 || atoms[0] != id {
                    trail.outcome = self.outcome(id);
                }
                trail
            }
        }
    }

    fn short_circuit(&self, op: BinaryOp, left: NodeId, right: NodeId) -> Trail {
        let mut trail = self.chunks(left);
        let decided = match (&trail.outcome, op) {
            (Outcome::Definite(Value::Bool(true)), BinaryOp::Or) => true,
            (Outcome::Definite(Value::Bool(false)), BinaryOp::And) => true,
            (Outcome::Definite(v), BinaryOp::Coalesce) => !v.is_nil(),
            _ => false,
        };

        if self.config.short_circuit && decided {
            // Never attributed: a `Cond` with the same ID elsewhere may have
            // run, this one did not.
            let skipped = EvalResult::skipped(self.formatter.format(right));
            trail.chunks.push(Chunk {
                result: skipped,
                cond_id: None,
            });
            return trail;
        }

        let rest = self.chunks(right);
        trail.chunks.extend(rest.chunks);
        if rest.outcome != Outcome::Empty {
            trail.outcome = rest.outcome;
        }
        trail
    }

    /// The whole subtree as one chunk.
    fn single(&self, id: NodeId) -> Trail {
        let chunk = self.evaluate(id);
        let mut trail = Trail {
            chunks: Vec::new(),
            outcome: outcome_of(&chunk.result),
        };
        self.keep(&mut trail, chunk);
        trail
    }

    /// Appends `chunk` unless failures-only filtering drops it.
    fn keep(&self, trail: &mut Trail, chunk: Chunk) {
        if self.config.mode == TraceMode::AtomicFailuresOnly && !chunk.result.is_failure() {
            return;
        }
        trail.chunks.push(chunk);
    }

    /// Value of `id` for short-circuit decisions, without a chunk.
    fn outcome(&self, id: NodeId) -> Outcome {
        match self.cache.eval(&self.formatter.format(id), self.env) {
            Ok(value) => Outcome::Definite(value),
            Err(_) => Outcome::Errored,
        }
    }

    fn evaluate(&self, id: NodeId) -> Chunk {
        let expr = self.formatter.format(id);
        let (value, error) = match self.cache.eval(&expr, self.env) {
            Ok(value) => (Some(value), None),
            Err(error) => (None, Some(error)),
        };
        Chunk {
            result: EvalResult {
                fingerprint: fingerprint(&expr),
                expr,
                value,
                error,
                ..EvalResult::default()
            },
            cond_id: cond_id(self.ast, id),
        }
    }
}

fn outcome_of(result: &EvalResult) -> Outcome {
    match (&result.error, &result.value) {
        (Some(_), _) => Outcome::Errored,
        (None, Some(value)) => Outcome::Definite(value.clone()),
        (None, None) => Outcome::Empty,
    }
}
