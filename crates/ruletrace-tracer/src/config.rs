//! Tracer configuration.
//!
//! [`TracerConfig`] holds the three recognized options. It deserializes from
//! JSON with every field optional, so a config file only needs to name the
//! options it changes:
//!
//! ```json
//! { "mode": "atomic_failures_only", "short_circuit": false }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trace granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    /// No chunks; only the final value.
    None,
    /// One chunk per subtree below the short-circuit operators.
    Coarse,
    /// One chunk per atom.
    #[default]
    Atomic,
    /// Like `Atomic`, keeping only skipped, errored, false or nil chunks.
    AtomicFailuresOnly,
}

impl TraceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceMode::None => "none",
            TraceMode::Coarse => "coarse",
            TraceMode::Atomic => "atomic",
            TraceMode::AtomicFailuresOnly => "atomic_failures_only",
        }
    }

    pub fn is_atomic(self) -> bool {
        matches!(self, TraceMode::Atomic | TraceMode::AtomicFailuresOnly)
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trace mode {0:?} (expected none, coarse, atomic or atomic-failures-only)")]
pub struct UnknownMode(pub String);

impl FromStr for TraceMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TraceMode::None),
            "coarse" => Ok(TraceMode::Coarse),
            "atomic" => Ok(TraceMode::Atomic),
            "atomic-failures-only" | "atomic_failures_only" => Ok(TraceMode::AtomicFailuresOnly),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Options recognized by [`crate::Tracer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracerConfig {
    pub mode: TraceMode,
    /// Mark the right operand of a decided `||`, `&&` or `??` as skipped
    /// instead of evaluating it.
    pub short_circuit: bool,
    /// Register the `Cond` instrumentation function and patch spec'd atoms.
    pub enable_cond: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            mode: TraceMode::Atomic,
            short_circuit: true,
            enable_cond: true,
        }
    }
}
