use thiserror::Error;

/// Errors surfaced by the question-answering pipeline.
///
/// Only `Validation` becomes a hard HTTP failure; the ask flow converts
/// `Provider` and `StoreUnavailable` into degraded conversational responses.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or oversized input, rejected before any external call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The vector backend is unreachable or returned a malformed response.
    /// Read paths degrade to "absent"; write and search paths propagate.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// An embedding or generation provider failed or returned empty output.
    #[error("provider failure: {0}")]
    Provider(String),

    /// Vector length inconsistency on a write. Aborts the write.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from a [`crate::store::backend::VectorBackend`].
///
/// `NotFound` is the only variant callers branch on (lazy collection
/// creation); everything else collapses into `StoreUnavailable` at the
/// client layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::StoreUnavailable(e.to_string())
    }
}
