//! The `Cond` instrumentation function and its per-call record.
//!
//! A [`Recorder`] is created for exactly one trace call and registered with
//! the engine under [`COND_FN`]. Every executed `Cond(id, reason_true,
//! reason_false, predicate)` records the predicate outcome under `id` and
//! returns the predicate unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use ruletrace_core::{NativeFn, Value};

/// Reserved function name for instrumentation calls.
pub const COND_FN: &str = "Cond";

/// One observed `Cond` execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recorded {
    pub id: String,
    pub value: bool,
    pub reason: String,
}

/// Contract violations of the `Cond` function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstrumentationError {
    #[error("Cond expects 4 args, got {0}")]
    Arity(usize),
    #[error("Cond 4th arg must be bool, got {0}")]
    NotBool(&'static str),
}

/// Observations of one trace call, keyed by spec ID. A later execution
/// with the same ID replaces the earlier record.
#[derive(Debug, Default)]
pub struct Recorder {
    seen: DashMap<String, Recorded>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    /// The `Cond` function body.
    pub fn record(&self, args: &[Value]) -> Result<Value, InstrumentationError> {
        let [id, reason_true, reason_false, predicate] = args else {
            return Err(InstrumentationError::Arity(args.len()));
        };
        let Value::Bool(value) = predicate else {
            return Err(InstrumentationError::NotBool(predicate.type_name()));
        };
        // Non-string metadata records as empty rather than failing the atom.
        let text = |v: &Value| v.as_str().unwrap_or_default().to_string();
        let reason = if *value {
            text(reason_true)
        } else {
            text(reason_false)
        };
        let record = Recorded {
            id: text(id),
            value: *value,
            reason,
        };

        if let Some(previous) = self.seen.insert(record.id.clone(), record.clone()) {
            if previous.value != record.value {
                warn!(
                    id = %record.id,
                    previous = previous.value,
                    current = record.value,
                    "Cond id recorded twice with different outcomes; keeping the latest"
                );
            }
        }
        Ok(Value::Bool(*value))
    }

    /// Wraps the recorder as an engine function.
    pub fn native_fn(self: &Arc<Self>) -> NativeFn {
        let recorder = Arc::clone(self);
        Arc::new(move |args: &[Value]| recorder.record(args).map_err(|e| e.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Recorded> {
        self.seen.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every observation.
    pub fn seen(&self) -> HashMap<String, Recorded> {
        self.seen
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.seen.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
