//! The request/response orchestrator.
//!
//! Ask flow: Validate → CheckCorpusNonEmpty → Embed → Retrieve →
//! FilterByThreshold → BuildPromptContext → Generate → ComputeConfidence →
//! Respond. Every "no data" stage short-circuits into an explanatory
//! conversational response; provider failures degrade into a low-confidence
//! apology. Only validation raises a hard error.
//!
//! The unified flow additionally runs intent routing concurrently with
//! retrieval and merges whatever the two branches produced.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tokio::time::timeout;

use crate::chunking;
use crate::config::PipelineConfig;
use crate::confidence::{self, ConfidenceBand};
use crate::error::PipelineError;
use crate::intent::{self, ActionCatalog, DefaultValueResolver, RouteOutcome};
use crate::llm::{EmbeddingProvider, GenerationProvider};
use crate::models::{AskResponse, Chunk, Document, IngestResponse, SearchResult};
use crate::store::VectorStoreClient;

const NO_DOCUMENTS_MESSAGE: &str =
    "No documents have been ingested yet, so there is nothing to answer from. \
     Add some documents and ask again.";
const NO_RESULTS_MESSAGE: &str =
    "I couldn't find anything relevant to that question in the ingested documents.";
const APOLOGY_MESSAGE: &str =
    "Sorry, I couldn't process that question right now. Please try again.";
const NOTHING_AT_ALL_MESSAGE: &str =
    "Neither document retrieval nor any registered action produced a result for that question.";

pub struct Pipeline {
    store: Arc<VectorStoreClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    /// Built once at startup; `None` disables intent routing entirely.
    catalog: Option<ActionCatalog>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<VectorStoreClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        catalog: Option<ActionCatalog>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            catalog,
            config,
        }
    }

    pub fn store(&self) -> &VectorStoreClient {
        &self.store
    }

    fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.config.stage_timeout_secs)
    }

    // ─── Ask ─────────────────────────────────────────────

    /// Plain retrieval-augmented ask. `collection` restricts retrieval to
    /// one collection; `None` fans out across all of them.
    pub async fn ask(
        &self,
        question: &str,
        collection: Option<&str>,
    ) -> Result<AskResponse, PipelineError> {
        let question = self.validate_question(question)?;

        if !self.corpus_has_data(collection).await {
            return Ok(explanatory_response(NO_DOCUMENTS_MESSAGE));
        }

        let query_vector = match self.embed_question(&question).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Question embedding failed: {e}");
                return Ok(apology_response());
            }
        };

        let results = match self.retrieve(collection, &query_vector).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Retrieval failed: {e}");
                return Ok(apology_response());
            }
        };
        if results.is_empty() {
            return Ok(explanatory_response(NO_RESULTS_MESSAGE));
        }

        let prompt = build_prompt(&question, &results, None);
        let answer = match self.generate_answer(&prompt).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!("Generation failed: {e}");
                return Ok(apology_response());
            }
        };

        Ok(answered_response(answer, &results, &question, None))
    }

    /// Unified ask: intent routing runs concurrently with retrieval.
    /// The answer merges both branches when both produced something, falls
    /// back to whichever is non-empty, and reports failure only when both
    /// came up empty.
    pub async fn ask_unified(&self, question: &str) -> Result<AskResponse, PipelineError> {
        let question = self.validate_question(question)?;

        let query_vector = match self.embed_question(&question).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Question embedding failed: {e}");
                return Ok(apology_response());
            }
        };

        let retrieval = async {
            if !self.corpus_has_data(None).await {
                return Vec::new();
            }
            match self.retrieve(None, &query_vector).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!("Retrieval failed in unified ask: {e}");
                    Vec::new()
                }
            }
        };

        let routing = async {
            match &self.catalog {
                Some(catalog) => {
                    intent::dispatch(
                        catalog,
                        &query_vector,
                        self.config.intent_threshold,
                        &DefaultValueResolver,
                    )
                    .await
                }
                None => RouteOutcome::NoMatch,
            }
        };

        let (results, outcome) = tokio::join!(retrieval, routing);

        match (results.is_empty(), outcome) {
            (false, RouteOutcome::Handled { action_id, output, .. }) => {
                let prompt = build_prompt(&question, &results, Some(&output));
                match self.generate_answer(&prompt).await {
                    Ok(answer) => {
                        Ok(answered_response(answer, &results, &question, Some(action_id)))
                    }
                    Err(e) => {
                        tracing::warn!("Generation failed in unified ask: {e}");
                        Ok(apology_response())
                    }
                }
            }
            (false, RouteOutcome::NoMatch) => {
                let prompt = build_prompt(&question, &results, None);
                match self.generate_answer(&prompt).await {
                    Ok(answer) => Ok(answered_response(answer, &results, &question, None)),
                    Err(e) => {
                        tracing::warn!("Generation failed in unified ask: {e}");
                        Ok(apology_response())
                    }
                }
            }
            (true, RouteOutcome::Handled { action_id, output, score }) => {
                Ok(action_only_response(action_id, output, score))
            }
            (true, RouteOutcome::NoMatch) => Ok(AskResponse {
                success: false,
                answer: String::new(),
                confidence: 0.0,
                confidence_band: ConfidenceBand::VeryLow.label().to_string(),
                has_sources: false,
                source_count: 0,
                action: None,
                message: Some(NOTHING_AT_ALL_MESSAGE.to_string()),
            }),
        }
    }

    // ─── Ingestion ───────────────────────────────────────

    /// Chunk, embed, deduplicate, and persist one document. Embedding runs
    /// through a bounded worker pool; individually failed chunks are
    /// skipped and logged.
    pub async fn ingest(
        &self,
        document: &Document,
        collection: &str,
    ) -> Result<IngestResponse, PipelineError> {
        if collection.trim().is_empty() {
            return Err(PipelineError::Validation("collection name is required".into()));
        }
        let chunks = chunking::chunk(
            &document.text,
            self.config.max_chunk_size,
            self.config.overlap_ratio,
        );
        if chunks.is_empty() {
            return Err(PipelineError::Validation(
                "document contains no indexable text".into(),
            ));
        }

        // Exact normalized-text deduplication against what is already stored
        let mut seen: std::collections::HashSet<String> =
            if self.store.collection_exists(collection).await {
                self.store
                    .list_payload_texts(collection)
                    .await?
                    .iter()
                    .map(|t| normalize_text(t))
                    .collect()
            } else {
                Default::default()
            };

        let mut fresh: Vec<Chunk> = Vec::new();
        let mut skipped = 0usize;
        for (index, text) in chunks.into_iter().enumerate() {
            if seen.insert(normalize_text(&text)) {
                fresh.push(Chunk {
                    text,
                    index,
                    source: document.source.clone(),
                });
            } else {
                skipped += 1;
            }
        }

        if fresh.is_empty() {
            return Ok(IngestResponse {
                collection: collection.to_string(),
                chunks_indexed: 0,
                chunks_skipped: skipped,
                ingested_at: Utc::now(),
            });
        }

        let stage_timeout = self.stage_timeout();
        let embedder = self.embedder.clone();
        let embedded: Vec<(Chunk, Result<Vec<f32>, PipelineError>)> = stream::iter(fresh)
            .map(|chunk| {
                let embedder = embedder.clone();
                async move {
                    let outcome = match timeout(stage_timeout, embedder.embed(&chunk.text)).await {
                        Ok(result) => result,
                        Err(_) => Err(PipelineError::Provider("embedding timed out".into())),
                    };
                    (chunk, outcome)
                }
            })
            .buffered(self.config.embed_concurrency.max(1))
            .collect()
            .await;

        let mut kept_chunks = Vec::new();
        let mut vectors = Vec::new();
        for (chunk, outcome) in embedded {
            match outcome {
                Ok(vector) => {
                    kept_chunks.push(chunk);
                    vectors.push(vector);
                }
                Err(e) => {
                    tracing::warn!("Skipping chunk {} of '{}': {e}", chunk.index, chunk.source);
                    skipped += 1;
                }
            }
        }

        if vectors.is_empty() {
            return Err(PipelineError::Provider(
                "embedding failed for every chunk".into(),
            ));
        }

        // Collections are created lazily at the first write
        self.store.ensure_collection(collection, vectors[0].len()).await?;
        self.store.upsert(collection, &kept_chunks, vectors).await?;

        tracing::info!(
            "Ingested {} chunks into '{collection}' ({skipped} skipped) from '{}'",
            kept_chunks.len(),
            document.source
        );

        Ok(IngestResponse {
            collection: collection.to_string(),
            chunks_indexed: kept_chunks.len(),
            chunks_skipped: skipped,
            ingested_at: Utc::now(),
        })
    }

    // ─── Stages ──────────────────────────────────────────

    fn validate_question(&self, question: &str) -> Result<String, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::Validation("question is required".into()));
        }
        if question.chars().count() > self.config.max_question_len {
            return Err(PipelineError::Validation(format!(
                "question exceeds {} characters",
                self.config.max_question_len
            )));
        }
        Ok(question.to_string())
    }

    async fn corpus_has_data(&self, collection: Option<&str>) -> bool {
        match collection {
            Some(name) => self.store.collection_exists(name).await,
            None => self
                .store
                .list_collections()
                .await
                .map(|names| !names.is_empty())
                .unwrap_or(false),
        }
    }

    async fn embed_question(&self, question: &str) -> Result<Vec<f32>, PipelineError> {
        let vector = match timeout(self.stage_timeout(), self.embedder.embed(question)).await {
            Ok(result) => result?,
            Err(_) => return Err(PipelineError::Provider("embedding timed out".into())),
        };
        if vector.is_empty() {
            return Err(PipelineError::Provider("empty query embedding".into()));
        }
        Ok(vector)
    }

    async fn retrieve(
        &self,
        collection: Option<&str>,
        query_vector: &[f32],
    ) -> Result<Vec<SearchResult>, PipelineError> {
        let search = self
            .store
            .search_all(collection, query_vector, self.config.top_k);
        let mut results = match timeout(self.stage_timeout(), search).await {
            Ok(result) => result?,
            Err(_) => return Err(PipelineError::StoreUnavailable("search timed out".into())),
        };

        // The fan-out path applies its own floor; a named collection gets
        // the caller-facing similarity threshold instead.
        if collection.is_some() {
            results.retain(|r| r.score >= self.config.score_threshold);
        }
        Ok(results)
    }

    async fn generate_answer(&self, prompt: &str) -> Result<String, PipelineError> {
        let answer = match timeout(self.stage_timeout(), self.generator.generate(prompt)).await {
            Ok(result) => result?,
            Err(_) => return Err(PipelineError::Provider("generation timed out".into())),
        };
        if answer.trim().is_empty() {
            return Err(PipelineError::Provider("generation returned empty text".into()));
        }
        Ok(answer)
    }
}

// ─── Response shaping ────────────────────────────────────

fn explanatory_response(message: &str) -> AskResponse {
    AskResponse {
        success: true,
        answer: message.to_string(),
        confidence: 0.0,
        confidence_band: ConfidenceBand::VeryLow.label().to_string(),
        has_sources: false,
        source_count: 0,
        action: None,
        message: Some(message.to_string()),
    }
}

fn apology_response() -> AskResponse {
    AskResponse {
        success: false,
        answer: APOLOGY_MESSAGE.to_string(),
        confidence: 0.0,
        confidence_band: ConfidenceBand::VeryLow.label().to_string(),
        has_sources: false,
        source_count: 0,
        action: None,
        message: Some(APOLOGY_MESSAGE.to_string()),
    }
}

fn answered_response(
    answer: String,
    results: &[SearchResult],
    question: &str,
    action: Option<String>,
) -> AskResponse {
    let confidence = confidence::score(results, question);
    AskResponse {
        success: true,
        answer,
        confidence: confidence.value,
        confidence_band: confidence.band.label().to_string(),
        has_sources: true,
        source_count: results.len(),
        action,
        message: None,
    }
}

/// An action handled the question with no supporting retrieval. Confidence
/// derives from the routing similarity since there is no evidence to score.
fn action_only_response(action_id: String, output: String, score: f32) -> AskResponse {
    let value = ((score as f64 * 100.0).clamp(0.0, 100.0) * 10.0).round() / 10.0;
    AskResponse {
        success: true,
        answer: output,
        confidence: value,
        confidence_band: ConfidenceBand::from_value(value).label().to_string(),
        has_sources: false,
        source_count: 0,
        action: Some(action_id),
        message: None,
    }
}

fn build_prompt(question: &str, results: &[SearchResult], action_output: Option<&str>) -> String {
    use std::fmt::Write;

    let mut prompt = String::from(
        "You are a question-answering assistant. Answer ONLY from the context \
         below. If the context does not contain the answer, say so plainly.\n\n\
         Context:\n",
    );
    for (i, r) in results.iter().enumerate() {
        write!(prompt, "[{}] {}\n\n", i + 1, r.text).unwrap();
    }
    if let Some(output) = action_output {
        write!(prompt, "Action result:\n{output}\n\n").unwrap();
    }
    write!(prompt, "Question: {question}\nAnswer:").unwrap();
    prompt
}

/// Collapse whitespace and casefold for exact-match chunk deduplication.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str, score: f32) -> SearchResult {
        SearchResult {
            text: text.to_string(),
            score,
            rank: None,
        }
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Hello\n\tWorld  "), "hello world");
        assert_eq!(normalize_text("hello world"), normalize_text("Hello   World"));
    }

    #[test]
    fn test_build_prompt_numbers_sources() {
        let prompt = build_prompt(
            "what is alpha",
            &[result("alpha is first", 0.9), result("beta is second", 0.8)],
            None,
        );
        assert!(prompt.contains("[1] alpha is first"));
        assert!(prompt.contains("[2] beta is second"));
        assert!(prompt.ends_with("Question: what is alpha\nAnswer:"));
        assert!(!prompt.contains("Action result"));
    }

    #[test]
    fn test_build_prompt_includes_action_output() {
        let prompt = build_prompt("status?", &[result("ctx", 0.9)], Some("3 jobs running"));
        assert!(prompt.contains("Action result:\n3 jobs running"));
    }

    #[test]
    fn test_action_only_response_confidence_from_routing_score() {
        let resp = action_only_response("status".into(), "ok".into(), 0.82);
        assert!(resp.success);
        assert_eq!(resp.confidence, 82.0);
        assert_eq!(resp.action.as_deref(), Some("status"));
        assert!(!resp.has_sources);
    }

    #[test]
    fn test_explanatory_response_is_successful() {
        let resp = explanatory_response(NO_DOCUMENTS_MESSAGE);
        assert!(resp.success);
        assert!(!resp.has_sources);
        assert!(resp.message.as_deref().unwrap().contains("No documents"));
    }

    #[test]
    fn test_apology_response_reports_failure() {
        let resp = apology_response();
        assert!(!resp.success);
        assert_eq!(resp.confidence, 0.0);
    }
}
