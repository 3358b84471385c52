use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration (embeddings + generation)
    pub llm: LlmConfig,
    /// Vector store configuration
    pub store: StoreConfig,
    /// Retrieval and chunking tunables
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for answer generation
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "qdrant"
    pub backend: String,
    /// Base URL for the qdrant REST API (unused by the memory backend)
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum chunk length in characters
    pub max_chunk_size: usize,
    /// Overlap between consecutive chunks, as a fraction of max_chunk_size.
    /// Capped at 0.25 regardless of what is configured.
    pub overlap_ratio: f32,
    /// Results fetched per collection during retrieval
    pub top_k: usize,
    /// Minimum similarity for single-collection retrieval
    pub score_threshold: f32,
    /// Minimum similarity applied after multi-collection fan-out.
    /// Deliberately separate from `score_threshold`.
    pub fanout_score_floor: f32,
    /// Global result cap after fan-out merge
    pub fanout_result_cap: usize,
    /// Minimum routing similarity for intent dispatch
    pub intent_threshold: f32,
    /// Maximum question length in characters
    pub max_question_len: usize,
    /// Concurrent embedding calls during ingestion
    pub embed_concurrency: usize,
    /// Per-stage timeout for embed/retrieve/generate calls
    pub stage_timeout_secs: u64,
    /// Maximum concurrent ask requests
    pub max_concurrent_asks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9100".to_string(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            base_url: "http://localhost:6333".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap_ratio: 0.15,
            top_k: 5,
            score_threshold: 0.5,
            fanout_score_floor: 0.4,
            fanout_result_cap: 10,
            intent_threshold: 0.6,
            max_question_len: 2000,
            embed_concurrency: 4,
            stage_timeout_secs: 60,
            max_concurrent_asks: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ASKDOCS_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(backend) = std::env::var("VECTOR_STORE_BACKEND") {
            config.store.backend = backend;
        }
        if let Ok(url) = std::env::var("VECTOR_STORE_URL") {
            config.store.base_url = url;
        }
        if let Ok(val) = std::env::var("ASKDOCS_MAX_CHUNK_SIZE") {
            if let Ok(v) = val.parse() {
                config.pipeline.max_chunk_size = v;
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_OVERLAP_RATIO") {
            if let Ok(v) = val.parse() {
                config.pipeline.overlap_ratio = v;
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_TOP_K") {
            if let Ok(v) = val.parse() {
                config.pipeline.top_k = v;
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_SCORE_THRESHOLD") {
            if let Ok(v) = val.parse() {
                config.pipeline.score_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_FANOUT_SCORE_FLOOR") {
            if let Ok(v) = val.parse() {
                config.pipeline.fanout_score_floor = v;
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_INTENT_THRESHOLD") {
            if let Ok(v) = val.parse() {
                config.pipeline.intent_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_EMBED_CONCURRENCY") {
            if let Ok(v) = val.parse::<usize>() {
                config.pipeline.embed_concurrency = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("ASKDOCS_STAGE_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.pipeline.stage_timeout_secs = v;
            }
        }

        config
    }
}
