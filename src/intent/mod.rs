//! Semantic intent routing.
//!
//! Actions are registered once at startup into an [`ActionCatalog`]; each
//! registration embeds the action's natural-language description through the
//! configured embedding provider. At query time the router compares the
//! query embedding against every description embedding by cosine similarity
//! and dispatches the best match above the threshold, or signals
//! [`RouteOutcome::NoMatch`] so the caller falls back to retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::llm::EmbeddingProvider;

/// Parameter value types an action can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Number,
    Bool,
}

/// One declared action parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    /// Used by [`DefaultValueResolver`]; a parameter without a default
    /// cannot be resolved and blocks dispatch.
    pub default: Option<Value>,
}

/// A structured callable capability paired with an intent description.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn invoke(&self, args: Map<String, Value>) -> Result<String, PipelineError>;
}

pub struct ActionDefinition {
    pub id: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub handler: Arc<dyn ActionHandler>,
}

/// Resolves a declared parameter to a concrete value, or fails explicitly.
/// Replaces silent type-default filling: "cannot resolve" is a real error.
pub trait ParameterResolver: Send + Sync {
    fn resolve(&self, action_id: &str, spec: &ParameterSpec) -> Result<Value, PipelineError>;
}

/// Resolver that only honors declared defaults.
pub struct DefaultValueResolver;

impl ParameterResolver for DefaultValueResolver {
    fn resolve(&self, action_id: &str, spec: &ParameterSpec) -> Result<Value, PipelineError> {
        spec.default.clone().ok_or_else(|| {
            PipelineError::Validation(format!(
                "cannot resolve parameter '{}' of action '{action_id}'",
                spec.name
            ))
        })
    }
}

struct CatalogEntry {
    definition: ActionDefinition,
    embedding: Vec<f32>,
}

/// Startup-built catalog of routable actions. Never rescanned per request.
pub struct ActionCatalog {
    entries: Vec<CatalogEntry>,
}

impl ActionCatalog {
    /// Embed every action description once. A failure here is a startup
    /// configuration problem and is fatal.
    pub async fn build(
        definitions: Vec<ActionDefinition>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, PipelineError> {
        let mut entries = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let embedding = embedder.embed(&definition.description).await?;
            tracing::debug!("Registered action '{}'", definition.id);
            entries.push(CatalogEntry {
                definition,
                embedding,
            });
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of routing one query through the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Handled {
        action_id: String,
        output: String,
        /// Routing similarity of the winning action.
        score: f32,
    },
    NoMatch,
}

/// Pick the catalog action whose description embedding is most similar to
/// the query embedding, if it clears `threshold`.
fn best_match<'a>(
    catalog: &'a ActionCatalog,
    query_embedding: &[f32],
    threshold: f32,
) -> Option<(&'a CatalogEntry, f32)> {
    let best = catalog
        .entries
        .iter()
        .map(|e| (e, cosine_similarity(query_embedding, &e.embedding)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    (best.1 >= threshold).then_some(best)
}

/// Route and dispatch. Stateless per call: any dispatch-level failure
/// (unresolvable parameter, handler error) is logged and degrades to
/// `NoMatch` so the caller falls back to retrieval.
pub async fn dispatch(
    catalog: &ActionCatalog,
    query_embedding: &[f32],
    threshold: f32,
    resolver: &dyn ParameterResolver,
) -> RouteOutcome {
    let Some((entry, score)) = best_match(catalog, query_embedding, threshold) else {
        return RouteOutcome::NoMatch;
    };
    let id = &entry.definition.id;
    tracing::info!("Intent matched action '{id}' (score {score:.3})");

    let mut args = Map::new();
    for spec in &entry.definition.parameters {
        match resolver.resolve(id, spec) {
            Ok(value) => {
                args.insert(spec.name.clone(), value);
            }
            Err(e) => {
                tracing::warn!("Dispatch of '{id}' skipped: {e}");
                return RouteOutcome::NoMatch;
            }
        }
    }

    match entry.definition.handler.invoke(args).await {
        Ok(output) => RouteOutcome::Handled {
            action_id: id.clone(),
            output,
            score,
        },
        Err(e) => {
            tracing::warn!("Action '{id}' failed: {e}");
            RouteOutcome::NoMatch
        }
    }
}

/// Cosine similarity in [-1, 1]. Mismatched dimensionality or zero-length
/// input returns -1.0 so such candidates can never win a routing decision.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return -1.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        -1.0
    } else {
        dot / denom
    }
}
