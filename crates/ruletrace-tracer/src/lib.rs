//! Explainable evaluation of expr-lang style rules.
//!
//! A [`Tracer`] evaluates an expression against an environment and, next to
//! the final value, returns a trail of chunks: each chunk is a sub-expression
//! with its canonical text, fingerprint, value or error, and (when a
//! [`ConditionSpec`] matched its fingerprint) a semantic ID and reason.

pub mod atoms;
pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod format;
pub mod patch;
pub mod recorder;
pub mod result;
pub mod spec;
pub mod tracer;

// Re-export commonly used types
pub use atoms::Atom;
pub use config::{TraceMode, TracerConfig, UnknownMode};
pub use error::TraceError;
pub use fingerprint::fingerprint;
pub use format::{format, format_root, Formatter};
pub use patch::{patch, ConditionSpec, SpecMap};
pub use recorder::{Recorded, Recorder, COND_FN};
pub use result::{EvalResult, TraceResult};
pub use spec::{validate_specs, validate_specs_strict, SpecError};
pub use tracer::Tracer;

pub use ruletrace_core::{Env, Value};
pub use ruletrace_engine::Engine;
