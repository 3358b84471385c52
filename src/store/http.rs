//! HTTP vector backend speaking the qdrant REST wire shape.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

use super::backend::{PointRecord, ScoredPoint, VectorBackend};

const SCROLL_PAGE_SIZE: usize = 256;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{name}", self.base_url)
    }
}

fn request_failed(e: reqwest::Error) -> StoreError {
    StoreError::Backend(format!("request failed: {e}"))
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(resp.url().path().to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(StoreError::Backend(format!("store returned {status}: {body}")));
    }
    Ok(resp)
}

// ─── Wire types ──────────────────────────────────────────

#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Deserialize)]
struct CollectionInfoResponse {
    result: CollectionInfoResult,
}

#[derive(Deserialize)]
struct CollectionInfoResult {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorSize,
}

#[derive(Deserialize)]
struct VectorSize {
    size: usize,
}

#[derive(Deserialize)]
struct ListCollectionsResponse {
    result: ListCollectionsResult,
}

#[derive(Deserialize)]
struct ListCollectionsResult {
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Serialize)]
struct UpsertRequest {
    points: Vec<WirePoint>,
}

#[derive(Serialize)]
struct WirePoint {
    id: String,
    vector: Vec<f32>,
    payload: Value,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<WireScoredPoint>,
}

#[derive(Deserialize)]
struct WireScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Value,
}

#[derive(Serialize)]
struct ScrollRequest {
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    #[serde(default)]
    payload: Value,
}

// ─── Backend impl ────────────────────────────────────────

#[async_trait]
impl VectorBackend for HttpBackend {
    async fn create_collection(&self, name: &str, dim: usize) -> Result<(), StoreError> {
        let req = CreateCollectionRequest {
            vectors: VectorParams {
                size: dim,
                distance: "Cosine",
            },
        };
        let resp = self
            .client
            .put(self.collection_url(name))
            .json(&req)
            .send()
            .await
            .map_err(request_failed)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn collection_dim(&self, name: &str) -> Result<usize, StoreError> {
        let resp = self
            .client
            .get(self.collection_url(name))
            .send()
            .await
            .map_err(request_failed)?;
        let resp = check_status(resp).await?;
        let body: CollectionInfoResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("malformed collection info: {e}")))?;
        Ok(body.result.config.params.vectors.size)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.collection_url(name))
            .send()
            .await
            .map_err(request_failed)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let resp = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(request_failed)?;
        let resp = check_status(resp).await?;
        let body: ListCollectionsResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("malformed collection list: {e}")))?;
        Ok(body.result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn upsert_points(&self, name: &str, points: Vec<PointRecord>) -> Result<(), StoreError> {
        let req = UpsertRequest {
            points: points
                .into_iter()
                .map(|p| WirePoint {
                    id: p.id.to_string(),
                    vector: p.vector,
                    payload: p.payload,
                })
                .collect(),
        };
        let resp = self
            .client
            .put(format!("{}/points", self.collection_url(name)))
            .query(&[("wait", "true")])
            .json(&req)
            .send()
            .await
            .map_err(request_failed)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let req = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let resp = self
            .client
            .post(format!("{}/points/search", self.collection_url(name)))
            .json(&req)
            .send()
            .await
            .map_err(request_failed)?;
        let resp = check_status(resp).await?;
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("malformed search response: {e}")))?;
        Ok(body
            .result
            .into_iter()
            .map(|p| ScoredPoint {
                score: p.score,
                payload: p.payload,
            })
            .collect())
    }

    async fn scroll_payloads(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/points/scroll", self.collection_url(name));
        let mut payloads = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let req = ScrollRequest {
                limit: SCROLL_PAGE_SIZE,
                with_payload: true,
                offset: offset.take(),
            };
            let resp = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(request_failed)?;
            let resp = check_status(resp).await?;
            let body: ScrollResponse = resp
                .json()
                .await
                .map_err(|e| StoreError::Backend(format!("malformed scroll response: {e}")))?;

            payloads.extend(body.result.points.into_iter().map(|p| p.payload));

            match body.result.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(payloads)
    }
}
