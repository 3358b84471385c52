//! In-memory vector backend: cosine scan over a `RwLock`ed point list per
//! collection. The default for local runs and the test double for the
//! pipeline suites.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::intent::cosine_similarity;

use super::backend::{PointRecord, ScoredPoint, VectorBackend};

struct MemoryCollection {
    dim: usize,
    points: Vec<PointRecord>,
}

#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    async fn create_collection(&self, name: &str, dim: usize) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        collections
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection {
                dim,
                points: Vec::new(),
            });
        Ok(())
    }

    async fn collection_dim(&self, name: &str) -> Result<usize, StoreError> {
        self.collections
            .read()
            .get(name)
            .map(|c| c.dim)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.collections
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn upsert_points(&self, name: &str, points: Vec<PointRecord>) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        for p in &points {
            if p.vector.len() != collection.dim {
                return Err(StoreError::Backend(format!(
                    "vector of length {} in collection of dimension {}",
                    p.vector.len(),
                    collection.dim
                )));
            }
        }

        collection.points.extend(points);
        Ok(())
    }

    async fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let collections = self.collections.read();
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let mut scored: Vec<ScoredPoint> = collection
            .points
            .iter()
            .map(|p| ScoredPoint {
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scroll_payloads(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read();
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(collection.points.iter().map(|p| p.payload.clone()).collect())
    }
}
