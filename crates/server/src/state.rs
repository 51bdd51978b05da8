//! # Application State
//!
//! The shared state for all request handlers: the configuration handle,
//! the metadata store, the retrieval engine, the assembled pipeline, the
//! schema sync service, and the executor. Built once at startup.

use crate::config::ServerConfig;
use askdb::{
    config::ConfigHandle,
    execute::{QueryExecutor, SqlxExecutor},
    pipeline::ChatPipeline,
    providers::{
        ai::embedding::EmbeddingClient,
        db::{sqlite::SqliteStore, vector::VectorStore},
    },
    retrieval::RetrievalEngine,
    sync::SchemaSyncService,
};
use std::sync::Arc;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigHandle,
    pub store: Arc<SqliteStore>,
    pub retrieval: Arc<RetrievalEngine>,
    pub pipeline: Arc<ChatPipeline>,
    pub sync: Arc<SchemaSyncService>,
    pub executor: Arc<SqlxExecutor>,
}

/// Builds the shared application state from the configuration.
///
/// Embedding settings are bound here: the vector index's column width is
/// fixed to the configured dimensionality, so embedding config is
/// startup-only while the other sections stay runtime-updatable through
/// the config handle.
pub async fn build_app_state(config: ServerConfig) -> anyhow::Result<AppState> {
    let store = Arc::new(SqliteStore::new(&config.db_url).await?);
    store.initialize_schema().await?;
    tracing::info!(db_path = %config.db_url, "Initialized local metadata store.");

    let vector_store = Arc::new(
        VectorStore::new(store.db.clone(), config.app.embedding.dimensions).await?,
    );
    let embeddings = Arc::new(EmbeddingClient::new(&config.app.embedding)?);
    let retrieval = Arc::new(RetrievalEngine::new(embeddings.clone(), vector_store.clone()));

    let executor = Arc::new(SqlxExecutor::new(store.clone()));
    let config_handle = ConfigHandle::new(config.app);

    let query_executor: Arc<dyn QueryExecutor> = executor.clone();
    let pipeline = Arc::new(ChatPipeline::new(
        config_handle.clone(),
        retrieval.clone(),
        store.clone(),
        store.clone(),
        query_executor,
    ));

    let sync = Arc::new(SchemaSyncService::new(
        embeddings,
        vector_store,
        store.clone(),
    ));

    Ok(AppState {
        config: config_handle,
        store,
        retrieval,
        pipeline,
        sync,
        executor,
    })
}
