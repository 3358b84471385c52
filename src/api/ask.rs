use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error_status;
use crate::models::{AskRequest, AskResponse};
use crate::state::AppState;

/// POST /api/ask — retrieval-augmented question answering.
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, String)> {
    let _permit = acquire(&state).await?;

    state
        .pipeline
        .ask(&req.question, req.collection.as_deref())
        .await
        .map(Json)
        .map_err(|e| (error_status(&e), e.to_string()))
}

/// POST /api/ask/unified — retrieval plus intent routing, merged.
pub async fn ask_unified(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, String)> {
    let _permit = acquire(&state).await?;

    state
        .pipeline
        .ask_unified(&req.question)
        .await
        .map(Json)
        .map_err(|e| (error_status(&e), e.to_string()))
}

async fn acquire(
    state: &AppState,
) -> Result<tokio::sync::OwnedSemaphorePermit, (StatusCode, String)> {
    state
        .ask_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Ask service at capacity".to_string(),
            )
        })
}
