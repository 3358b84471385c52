use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::PipelineError;
use crate::intent::{ActionCatalog, ActionDefinition, ActionHandler};
use crate::llm::{EmbeddingProvider, HttpEmbeddingProvider, HttpGenerationProvider};
use crate::pipeline::Pipeline;
use crate::store::backend::VectorBackend;
use crate::store::http::HttpBackend;
use crate::store::memory::MemoryBackend;
use crate::store::VectorStoreClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
    pub ask_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    /// Wire the store backend, providers, action catalog, and pipeline.
    /// Building the catalog embeds each action description, so this talks
    /// to the embedding provider once per registered action.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let backend: Arc<dyn VectorBackend> = match config.store.backend.as_str() {
            "memory" => Arc::new(MemoryBackend::new()),
            "qdrant" => Arc::new(HttpBackend::new(
                http_client.clone(),
                config.store.base_url.clone(),
            )),
            other => anyhow::bail!("Unknown vector store backend: {other}"),
        };

        let store = Arc::new(VectorStoreClient::new(
            backend,
            config.pipeline.fanout_score_floor,
            config.pipeline.fanout_result_cap,
        ));

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbeddingProvider::new(
            http_client.clone(),
            config.llm.clone(),
        ));
        let generator = Arc::new(HttpGenerationProvider::new(
            http_client,
            config.llm.clone(),
        ));

        let catalog = ActionCatalog::build(builtin_actions(store.clone()), embedder.as_ref())
            .await
            .map_err(|e| anyhow::anyhow!("failed to build action catalog: {e}"))?;
        tracing::info!("Action catalog ready ({} actions)", catalog.len());

        let pipeline = Arc::new(Pipeline::new(
            store,
            embedder,
            generator,
            Some(catalog),
            config.pipeline.clone(),
        ));

        let max_asks = config.pipeline.max_concurrent_asks.max(1);
        Ok(Self {
            config,
            pipeline,
            ask_semaphore: Arc::new(tokio::sync::Semaphore::new(max_asks)),
        })
    }
}

/// Actions registered at startup. Zero-parameter by design: anything
/// needing real arguments belongs behind a richer resolver.
fn builtin_actions(store: Arc<VectorStoreClient>) -> Vec<ActionDefinition> {
    vec![ActionDefinition {
        id: "list_collections".to_string(),
        description: "list the document collections currently available for question answering"
            .to_string(),
        parameters: vec![],
        handler: Arc::new(ListCollectionsAction { store }),
    }]
}

struct ListCollectionsAction {
    store: Arc<VectorStoreClient>,
}

#[async_trait]
impl ActionHandler for ListCollectionsAction {
    async fn invoke(&self, _args: Map<String, Value>) -> Result<String, PipelineError> {
        let names = self.store.list_collections().await?;
        if names.is_empty() {
            Ok("There are no document collections yet.".to_string())
        } else {
            Ok(format!("Available collections: {}", names.join(", ")))
        }
    }
}
