//! Vector store orchestration: collection lifecycle, chunk upsert, and
//! single- or multi-collection similarity search over a pluggable backend.

pub mod backend;
pub mod http;
pub mod memory;

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;
use uuid::Uuid;

use crate::error::{PipelineError, StoreError};
use crate::models::{Chunk, SearchResult};

use backend::{PointRecord, ScoredPoint, VectorBackend};

/// Client over a [`VectorBackend`]. Holds the fan-out filtering knobs; the
/// single-collection similarity threshold belongs to the caller and is
/// deliberately separate.
pub struct VectorStoreClient {
    backend: Arc<dyn VectorBackend>,
    /// Minimum score applied after multi-collection fan-out
    fanout_score_floor: f32,
    /// Global result cap after fan-out merge
    fanout_result_cap: usize,
}

impl VectorStoreClient {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        fanout_score_floor: f32,
        fanout_result_cap: usize,
    ) -> Self {
        Self {
            backend,
            fanout_score_floor,
            fanout_result_cap,
        }
    }

    /// Idempotent create: no-op when the collection already exists with the
    /// same dimensionality.
    pub async fn ensure_collection(&self, name: &str, dim: usize) -> Result<(), PipelineError> {
        match self.backend.collection_dim(name).await {
            Ok(existing) if existing == dim => Ok(()),
            Ok(existing) => Err(PipelineError::DimensionMismatch {
                expected: existing,
                actual: dim,
            }),
            Err(StoreError::NotFound(_)) => {
                tracing::info!("Creating collection '{name}' (dim {dim})");
                self.backend.create_collection(name, dim).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True when the collection exists; any read failure degrades to false.
    pub async fn collection_exists(&self, name: &str) -> bool {
        self.backend.collection_dim(name).await.is_ok()
    }

    /// Upsert chunks with their embeddings. `vectors` must be parallel with
    /// `chunks` and internally consistent in dimensionality; each point gets
    /// a fresh id and carries the chunk text in its payload.
    pub async fn upsert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), PipelineError> {
        if chunks.len() != vectors.len() {
            return Err(PipelineError::Validation(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let dim = vectors[0].len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(PipelineError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }

        let points: Vec<PointRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| PointRecord {
                id: Uuid::new_v4(),
                vector,
                payload: json!({
                    "text": chunk.text,
                    "source": chunk.source,
                    "chunk_index": chunk.index,
                }),
            })
            .collect();

        self.backend.upsert_points(collection, points).await?;
        Ok(())
    }

    /// Top-`top_k` results, sorted by descending score. Malformed hits
    /// (payload without text) are skipped and logged, never fatal.
    pub async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        let hits = self.backend.search_points(collection, query_vector, top_k).await?;
        let mut results = hits_to_results(collection, hits);
        sort_and_rank(&mut results);
        Ok(results)
    }

    /// Search one collection if named, otherwise fan out across all
    /// collections concurrently, flatten, apply the fan-out score floor,
    /// and keep the global top results.
    pub async fn search_all(
        &self,
        collection: Option<&str>,
        query_vector: &[f32],
        top_k_per_collection: usize,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        if let Some(name) = collection {
            return self.search(name, query_vector, top_k_per_collection).await;
        }

        let names = self.backend.list_collections().await?;

        let searches = names.iter().map(|name| {
            let backend = self.backend.clone();
            async move {
                let hits = backend
                    .search_points(name, query_vector, top_k_per_collection)
                    .await;
                (name.clone(), hits)
            }
        });

        let mut results = Vec::new();
        for (name, outcome) in join_all(searches).await {
            match outcome {
                Ok(hits) => results.extend(hits_to_results(&name, hits)),
                // One unreachable collection does not sink the fan-out
                Err(e) => tracing::warn!("Search failed for collection '{name}': {e}"),
            }
        }

        results.retain(|r| r.score >= self.fanout_score_floor);
        sort_and_rank(&mut results);
        results.truncate(self.fanout_result_cap);
        Ok(results)
    }

    /// Full export of the chunk texts stored in a collection.
    pub async fn list_payload_texts(&self, collection: &str) -> Result<Vec<String>, PipelineError> {
        let payloads = self.backend.scroll_payloads(collection).await?;
        Ok(payloads
            .into_iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()).map(str::to_string))
            .collect())
    }

    pub async fn delete_collection(&self, name: &str) -> Result<(), PipelineError> {
        self.backend.delete_collection(name).await?;
        Ok(())
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.backend.list_collections().await?)
    }
}

fn hits_to_results(collection: &str, hits: Vec<ScoredPoint>) -> Vec<SearchResult> {
    hits.into_iter()
        .filter_map(|hit| match hit.payload.get("text").and_then(|t| t.as_str()) {
            Some(text) => Some(SearchResult {
                text: text.to_string(),
                score: hit.score,
                rank: None,
            }),
            None => {
                tracing::warn!(
                    "Skipping malformed hit in '{collection}': payload has no text field"
                );
                None
            }
        })
        .collect()
}

fn sort_and_rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = Some(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::MemoryBackend;

    fn client(backend: Arc<MemoryBackend>) -> VectorStoreClient {
        VectorStoreClient::new(backend, 0.4, 10)
    }

    fn chunk(text: &str, index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            index,
            source: "test.txt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_idempotent() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 3).await.unwrap();
        store.ensure_collection("docs", 3).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap(), vec!["docs"]);
    }

    #[tokio::test]
    async fn test_ensure_collection_dim_conflict() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 3).await.unwrap();
        let err = store.ensure_collection("docs", 4).await.unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_upsert_count_mismatch() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 2).await.unwrap();
        let err = store
            .upsert("docs", &[chunk("a", 0), chunk("b", 1)], vec![vec![1.0, 0.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upsert_inconsistent_dimensions() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 2).await.unwrap();
        let err = store
            .upsert(
                "docs",
                &[chunk("a", 0), chunk("b", 1)],
                vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.5]],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_search_sorted_with_ranks() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[chunk("east", 0), chunk("north", 1), chunk("northeast", 2)],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
            )
            .await
            .unwrap();

        let results = store.search("docs", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "east");
        assert_eq!(results[0].rank, Some(0));
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[2].rank, Some(2));
    }

    #[tokio::test]
    async fn test_search_skips_malformed_hits() {
        let backend = Arc::new(MemoryBackend::new());
        backend.create_collection("docs", 2).await.unwrap();
        backend
            .upsert_points(
                "docs",
                vec![
                    PointRecord {
                        id: Uuid::new_v4(),
                        vector: vec![1.0, 0.0],
                        payload: json!({ "text": "good" }),
                    },
                    PointRecord {
                        id: Uuid::new_v4(),
                        vector: vec![0.9, 0.1],
                        payload: json!({ "other": "no text field" }),
                    },
                ],
            )
            .await
            .unwrap();

        let store = client(backend);
        let results = store.search("docs", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "good");
    }

    #[tokio::test]
    async fn test_search_all_named_delegates() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 2).await.unwrap();
        store
            .upsert("docs", &[chunk("weak match", 0)], vec![vec![0.1, 1.0]])
            .await
            .unwrap();

        // Named search applies no score floor; the caller thresholds
        let results = store
            .search_all(Some("docs"), &[1.0, 0.0], 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_all_fanout_floor_and_cap() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);

        for name in ["a", "b", "c"] {
            store.ensure_collection(name, 2).await.unwrap();
            let chunks: Vec<Chunk> = (0..6).map(|i| chunk(&format!("{name}-{i}"), i)).collect();
            // Half strong matches, half orthogonal (score 0 < floor)
            let vectors: Vec<Vec<f32>> = (0..6)
                .map(|i| if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
                .collect();
            store.upsert(name, &chunks, vectors).await.unwrap();
        }

        let results = store.search_all(None, &[1.0, 0.0], 6).await.unwrap();
        assert!(results.len() <= 10);
        assert!(results.iter().all(|r| r.score >= 0.4));
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // 9 strong matches across 3 collections survive the floor
        assert_eq!(results.len(), 9);
    }

    #[tokio::test]
    async fn test_search_all_empty_store() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        let results = store.search_all(None, &[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_list_payload_texts() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        store.ensure_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[chunk("first", 0), chunk("second", 1)],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .await
            .unwrap();

        let mut texts = store.list_payload_texts("docs").await.unwrap();
        texts.sort();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_collection_exists_degrades_to_false() {
        let backend = Arc::new(MemoryBackend::new());
        let store = client(backend);
        assert!(!store.collection_exists("missing").await);
        store.ensure_collection("docs", 2).await.unwrap();
        assert!(store.collection_exists("docs").await);
    }
}
