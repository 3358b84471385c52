//! Capability interface for the vector database.
//!
//! Four load-bearing operations: collection lifecycle, point upsert, top-K
//! similarity search, and full payload scroll. Implementations must be
//! independently mockable; [`crate::store::memory::MemoryBackend`] doubles
//! as both the default backend and the test stand-in.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;

/// A point to persist: id, vector, arbitrary JSON payload.
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A search hit as the backend returns it. The payload is untyped; the
/// client layer decides whether a hit is well-formed.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub score: f32,
    pub payload: Value,
}

#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Create a collection with a fixed vector dimensionality.
    async fn create_collection(&self, name: &str, dim: usize) -> Result<(), StoreError>;

    /// Dimensionality of an existing collection, or `NotFound`.
    async fn collection_dim(&self, name: &str) -> Result<usize, StoreError>;

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Upsert points into an existing collection. The backend rejects
    /// vectors whose length differs from the collection dimensionality.
    async fn upsert_points(&self, name: &str, points: Vec<PointRecord>) -> Result<(), StoreError>;

    /// Top-`limit` nearest neighbors by cosine similarity, descending.
    async fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Full export of all payloads in a collection.
    async fn scroll_payloads(&self, name: &str) -> Result<Vec<Value>, StoreError>;
}
