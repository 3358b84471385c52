use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw document submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Where the text came from (filename, URL, user-supplied label).
    pub source: String,
    pub text: String,
}

/// A bounded text span cut from a document. Transient: produced, embedded,
/// and persisted as a store point — never stored separately.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub source: String,
}

/// One retrieved piece of evidence.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub score: f32,
    pub rank: Option<usize>,
}

/// Ask request body.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Restrict retrieval to one collection; `None` fans out across all.
    pub collection: Option<String>,
}

/// Ask response. Provider-level problems never turn into HTTP errors:
/// `success` is false and `message` explains what happened instead.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub answer: String,
    pub confidence: f64,
    pub confidence_band: String,
    pub has_sources: bool,
    pub source_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Ingest request body.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub source: String,
    pub text: String,
    pub collection: String,
}

/// Ingest response.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub collection: String,
    pub chunks_indexed: usize,
    pub chunks_skipped: usize,
    pub ingested_at: DateTime<Utc>,
}

/// GET /api/collections response item.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
}
