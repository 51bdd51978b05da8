//! # Retrieval Engine
//!
//! Fetches the grounding context for a question: relevant table-schema
//! fragments and similar Q→SQL examples. The question is embedded once per
//! retrieval call; filtering by owner, kind, and similarity threshold
//! happens inside the vector index. An empty result is not an error — the
//! context builders substitute a neutral placeholder instead.

use crate::{
    config::RagConfig,
    errors::PipelineError,
    providers::{ai::embedding::EmbeddingClient, db::vector::VectorStore},
    types::{DocKind, RetrievedDoc, SqlExampleRecord},
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NO_SCHEMA_PLACEHOLDER: &str = "(no relevant table schema found)";
pub const NO_EXAMPLES_PLACEHOLDER: &str = "(no reference examples)";
/// Used when retrieval is disabled by configuration — a documented degraded
/// mode, not a failure.
pub const RAG_DISABLED_PLACEHOLDER: &str = "(retrieval disabled; no context available)";

pub struct RetrievalEngine {
    embeddings: Arc<EmbeddingClient>,
    index: Arc<VectorStore>,
}

impl RetrievalEngine {
    pub fn new(embeddings: Arc<EmbeddingClient>, index: Arc<VectorStore>) -> Self {
        Self { embeddings, index }
    }

    pub fn index(&self) -> &Arc<VectorStore> {
        &self.index
    }

    /// Schema fragments relevant to the question, best first.
    pub async fn retrieve_schema(
        &self,
        question: &str,
        data_source_id: i64,
        rag: &RagConfig,
    ) -> Result<Vec<RetrievedDoc>, PipelineError> {
        let results = self
            .retrieve(question, data_source_id, DocKind::Schema, rag)
            .await?;
        if results.is_empty() {
            warn!(
                data_source_id,
                threshold = rag.similarity_threshold,
                "no schema fragments cleared the similarity threshold; \
                 the index may be empty (schema not synced) or the question unrelated"
            );
        } else {
            debug!(
                hits = results.len(),
                best = results[0].similarity,
                "schema retrieval complete"
            );
        }
        Ok(results)
    }

    /// Similar saved Q→SQL examples (few-shot grounding), best first.
    pub async fn retrieve_examples(
        &self,
        question: &str,
        data_source_id: i64,
        rag: &RagConfig,
    ) -> Result<Vec<RetrievedDoc>, PipelineError> {
        let results = self
            .retrieve(question, data_source_id, DocKind::Example, rag)
            .await?;
        debug!(hits = results.len(), "example retrieval complete");
        Ok(results)
    }

    async fn retrieve(
        &self,
        question: &str,
        data_source_id: i64,
        kind: DocKind,
        rag: &RagConfig,
    ) -> Result<Vec<RetrievedDoc>, PipelineError> {
        let query_vector = self.embeddings.embed(question).await?;
        self.index
            .search(
                &query_vector,
                data_source_id,
                kind,
                rag.top_k,
                rag.similarity_threshold,
            )
            .await
    }

    /// Indexes a saved example so future questions can retrieve it. The
    /// question text carries the embedding; the SQL rides in the metadata.
    pub async fn index_example(&self, example: &SqlExampleRecord) -> Result<(), PipelineError> {
        let vector = self.embeddings.embed(&example.question).await?;
        let mut metadata = Map::new();
        metadata.insert(
            "example_id".to_string(),
            Value::String(example.id.to_string()),
        );
        metadata.insert("sql".to_string(), Value::String(example.sql.clone()));
        self.index
            .insert(
                &example.question,
                example.data_source_id,
                DocKind::Example,
                &metadata,
                &vector,
            )
            .await?;
        Ok(())
    }
}

/// Renders retrieved schema fragments into prompt context.
pub fn build_schema_context(docs: &[RetrievedDoc]) -> String {
    if docs.is_empty() {
        return NO_SCHEMA_PLACEHOLDER.to_string();
    }
    docs.iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Renders retrieved examples as `Q: …\nSQL: …` pairs.
pub fn build_examples_context(docs: &[RetrievedDoc]) -> String {
    if docs.is_empty() {
        return NO_EXAMPLES_PLACEHOLDER.to_string();
    }
    docs.iter()
        .map(|d| {
            let sql = d
                .metadata
                .get("sql")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("Q: {}\nSQL: {}", d.content, sql)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
