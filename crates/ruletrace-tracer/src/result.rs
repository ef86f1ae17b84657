//! Trace output types.
//!
//! Both serialize to JSON with empty fields omitted: a chunk that was never
//! attributed to a spec has no `id` or `reason`, a skipped chunk has no
//! `value`, and so on.

use serde::{Deserialize, Serialize};

use ruletrace_core::Value;

use crate::config::TraceMode;
use crate::fingerprint::fingerprint;

fn is_false(b: &bool) -> bool {
    !*b
}

/// One trace unit ("chunk").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvalResult {
    /// Semantic ID of the spec the chunk was attributed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub fingerprint: String,
    /// Canonical text of the unit.
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EvalResult {
    /// A chunk for `expr` with fingerprint filled in and nothing else.
    pub fn for_expr(expr: impl Into<String>) -> Self {
        let expr = expr.into();
        EvalResult {
            fingerprint: fingerprint(&expr),
            expr,
            ..EvalResult::default()
        }
    }

    pub fn skipped(expr: impl Into<String>) -> Self {
        EvalResult {
            skipped: true,
            ..EvalResult::for_expr(expr)
        }
    }

    /// Skipped, errored, `false` or nil.
    pub fn is_failure(&self) -> bool {
        self.skipped
            || self.error.is_some()
            || matches!(self.value, None | Some(Value::Nil) | Some(Value::Bool(false)))
    }
}

/// Result of one trace call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    /// The canonical source that was executed, including any injected
    /// `Cond(...)` calls.
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<EvalResult>,
    /// Authoritative value; absent when the final evaluation failed.
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_value: Option<Value>,
    pub mode: TraceMode,
}

impl TraceResult {
    pub fn chunk_by_id(&self, id: &str) -> Option<&EvalResult> {
        self.chunks.iter().find(|c| c.id.as_deref() == Some(id))
    }

    pub fn has_errors(&self) -> bool {
        self.chunks.iter().any(|c| c.error.is_some())
    }
}
