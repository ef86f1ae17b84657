use thiserror::Error;

use ruletrace_core::CompileError;

use crate::result::TraceResult;

/// Failure of a strict trace call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    /// The source did not compile. `partial` is the result the lenient
    /// `trace` would have returned: one chunk carrying the error, no final
    /// value.
    #[error("compile failed: {error}")]
    Compile {
        error: CompileError,
        partial: Box<TraceResult>,
    },
}

impl TraceError {
    pub fn partial(&self) -> &TraceResult {
        match self {
            TraceError::Compile { partial, .. } => partial,
        }
    }
}
