//! External language-model capabilities: embeddings and text generation.
//!
//! Both are trait seams so the pipeline can run against HTTP providers
//! (Ollama or any OpenAI-compatible API) in production and in-process fakes
//! in tests.

pub mod embeddings;
pub mod generate;

pub use embeddings::{EmbeddingProvider, HttpEmbeddingProvider};
pub use generate::{GenerationProvider, HttpGenerationProvider};
