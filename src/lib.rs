//! # askdocs
//!
//! A retrieval-augmented question-answering service: documents are chunked
//! and embedded into a vector store; questions are answered by retrieving
//! the closest chunks, generating an answer over them with an LLM, and
//! scoring how much the evidence supports that answer. A semantic intent
//! router can short-circuit questions into registered structured actions.
//!
//! ## Pipeline
//!
//! ```text
//!   Ingestion                         Query
//!   ─────────                         ─────
//!   Document                          Question
//!      │                                 │
//!      ▼                                 ▼
//!   Chunker (paragraph→sentence→     Embed question
//!   word cascade, overlap)              │
//!      │                      ┌─────────┴──────────┐
//!      ▼                      ▼                    ▼
//!   Embed chunks          Retrieve            IntentRouter
//!   (bounded pool)        (fan-out +          (cosine vs action
//!      │                  score floor)        descriptions)
//!      ▼                      │                    │
//!   VectorStore               └────────┬───────────┘
//!   (lazy collections)                 ▼
//!                              Generate answer
//!                                      │
//!                                      ▼
//!                              ConfidenceScorer
//!                              (multi-factor, banded)
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, providers, and pipeline tunables
//! - [`models`] - Shared data types: `Document`, `Chunk`, `SearchResult`, request/response types
//! - [`chunking`] - Hierarchical paragraph/sentence/word chunker with word-aligned overlap
//! - [`store`] - Vector store client over pluggable backends (in-memory, qdrant REST)
//! - [`confidence`] - Multi-factor confidence scoring with band caps
//! - [`intent`] - Startup-registered action catalog and cosine-similarity routing
//! - [`llm`] - Embedding and generation provider traits with Ollama/OpenAI impls
//! - [`pipeline`] - The ask / unified-ask / ingest orchestrator
//! - [`api`] - Axum HTTP handlers for ask, ingest, and collection management
//! - [`state`] - Shared application state wiring backends, providers, and catalog
//! - [`error`] - Error taxonomy shared across the pipeline

pub mod api;
pub mod chunking;
pub mod config;
pub mod confidence;
pub mod error;
pub mod intent;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod store;
