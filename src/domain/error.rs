// ============================================================
// Layer 3 - Pipeline Errors
// ============================================================
// Every failure the alignment/batching/training pipeline can
// raise. The variants decide how callers react:
//
//   Config       → fatal at startup, before any preprocessing
//   Alignment    → recovered per pair (skip + warn) by the
//                  dataset builder
//   Shape        → fatal wherever it is detected
//   EmptyDataset → fatal, every pair was skipped
//   Divergence   → fatal, training stops at the epoch boundary
//                  and the partial loss history is kept
//
// The application layer wraps these in anyhow with a context
// naming the stage ("preprocessing" or "training").
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Error Handling)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("alignment failed for pair {index}: {message}")]
    Alignment { index: usize, message: String },

    #[error("shape mismatch: {message}")]
    Shape { message: String },

    #[error("no usable example pairs ({skipped} of {attempted} skipped)")]
    EmptyDataset { attempted: usize, skipped: usize },

    #[error("loss diverged at epoch {epoch} (average loss {loss})")]
    Divergence {
        epoch:   usize,
        loss:    f64,
        /// Average losses of the epochs that finished before the failure.
        history: Vec<f64>,
    },
}

impl PipelineError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::Shape { message: message.into() }
    }

    pub(crate) fn alignment(index: usize, message: impl Into<String>) -> Self {
        Self::Alignment { index, message: message.into() }
    }

    /// Only alignment failures may be skipped; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Alignment { .. })
    }
}
