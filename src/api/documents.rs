use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error_status;
use crate::models::{CollectionInfo, Document, IngestRequest, IngestResponse};
use crate::state::AppState;

/// POST /api/documents — chunk, embed, and index one document.
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), (StatusCode, String)> {
    let document = Document {
        source: req.source,
        text: req.text,
    };

    state
        .pipeline
        .ingest(&document, &req.collection)
        .await
        .map(|resp| (StatusCode::CREATED, Json(resp)))
        .map_err(|e| (error_status(&e), e.to_string()))
}

/// GET /api/collections — list collections.
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<CollectionInfo>>, (StatusCode, String)> {
    state
        .pipeline
        .store()
        .list_collections()
        .await
        .map(|names| Json(names.into_iter().map(|name| CollectionInfo { name }).collect()))
        .map_err(|e| (error_status(&e), e.to_string()))
}

/// DELETE /api/collections/{name} — drop a collection and its points.
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let store = state.pipeline.store();
    if !store.collection_exists(&name).await {
        return Err((StatusCode::NOT_FOUND, format!("No collection '{name}'")));
    }

    store
        .delete_collection(&name)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| (error_status(&e), e.to_string()))
}
