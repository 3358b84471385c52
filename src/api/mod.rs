//! Axum HTTP handlers. Thin glue only: validate, call the pipeline, map
//! errors to status codes.

pub mod ask;
pub mod documents;

use axum::http::StatusCode;

use crate::error::PipelineError;

/// Map a pipeline error to the status code handlers return. The ask
/// handlers only ever see `Validation` here; everything else was already
/// degraded inside the pipeline.
pub(crate) fn error_status(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Provider(_) => StatusCode::BAD_GATEWAY,
        PipelineError::DimensionMismatch { .. } => StatusCode::CONFLICT,
    }
}
