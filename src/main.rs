use axum::routing::{delete, get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use askdocs::api;
use askdocs::config::Config;
use askdocs::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!("Vector store backend: {}", config.store.backend);

    let state = AppState::new(config.clone()).await?;

    let app = Router::new()
        .route("/api/ask", post(api::ask::ask))
        .route("/api/ask/unified", post(api::ask::ask_unified))
        .route("/api/documents", post(api::documents::ingest))
        .route("/api/collections", get(api::documents::list_collections))
        .route("/api/collections/{name}", delete(api::documents::delete_collection))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
