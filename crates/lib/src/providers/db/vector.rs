//! # Vector Index
//!
//! A turso-backed store of `(content, owner, kind, metadata, vector)` rows
//! answering top-K cosine-similarity queries. Similarity is computed in SQL
//! as `1.0 - vector_distance_cos(...)`, so the threshold filter and the
//! ordering happen at the index instead of transferring irrelevant rows to
//! the caller. Ties are broken by ascending insertion id to keep results
//! deterministic.

use crate::errors::PipelineError;
use crate::types::{DocKind, RetrievedDoc};
use serde_json::{Map, Value};
use std::fmt::{self, Debug};
use tracing::{debug, info};
use turso::{params, Database, Value as TursoValue};

/// A document ready for insertion into the index.
#[derive(Debug, Clone)]
pub struct NewVectorDocument {
    pub content: String,
    pub owner_id: i64,
    pub kind: DocKind,
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

/// The vector index over a turso database.
///
/// Dimensionality is fixed at construction; mixing dimensionalities in one
/// index is invalid and rejected on insert and search.
#[derive(Clone)]
pub struct VectorStore {
    db: Database,
    dimensions: usize,
}

impl Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Opens the index over an existing database, creating the table and
    /// the `(owner, kind)` lookup index if needed. Idempotent.
    pub async fn new(db: Database, dimensions: usize) -> Result<Self, PipelineError> {
        let conn = db.connect()?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS vector_store (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    content TEXT NOT NULL,
                    data_source_id INTEGER NOT NULL,
                    doc_type TEXT NOT NULL,
                    metadata TEXT NOT NULL DEFAULT '{{}}',
                    embedding F32_BLOB({dimensions}) NOT NULL,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )"
            ),
            (),
        )
        .await?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_vector_store_owner_kind
             ON vector_store (data_source_id, doc_type)",
            (),
        )
        .await?;
        Ok(Self { db, dimensions })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), PipelineError> {
        if vector.len() != self.dimensions {
            return Err(PipelineError::EmbeddingDimension {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Inserts one document and returns its id.
    pub async fn insert(
        &self,
        content: &str,
        owner_id: i64,
        kind: DocKind,
        metadata: &Map<String, Value>,
        embedding: &[f32],
    ) -> Result<i64, PipelineError> {
        self.check_dimensions(embedding)?;
        let conn = self.db.connect()?;
        let metadata_json = serde_json::to_string(metadata)?;
        conn.execute(
            "INSERT INTO vector_store (content, data_source_id, doc_type, metadata, embedding)
             VALUES (?, ?, ?, ?, ?)",
            params![
                content,
                owner_id,
                kind.as_str(),
                metadata_json,
                embedding_to_blob(embedding)
            ],
        )
        .await?;

        let mut rows = conn.query("SELECT last_insert_rowid()", ()).await?;
        let id = match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                TursoValue::Integer(id) => id,
                _ => 0,
            },
            None => 0,
        };
        debug!(id, kind = kind.as_str(), "vector document inserted");
        Ok(id)
    }

    /// Inserts many documents. Dimensions are checked up front so a bad
    /// batch leaves the index untouched.
    pub async fn insert_batch(&self, docs: &[NewVectorDocument]) -> Result<(), PipelineError> {
        for doc in docs {
            self.check_dimensions(&doc.embedding)?;
        }
        let conn = self.db.connect()?;
        for doc in docs {
            let metadata_json = serde_json::to_string(&doc.metadata)?;
            conn.execute(
                "INSERT INTO vector_store (content, data_source_id, doc_type, metadata, embedding)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    doc.content.as_str(),
                    doc.owner_id,
                    doc.kind.as_str(),
                    metadata_json,
                    embedding_to_blob(&doc.embedding)
                ],
            )
            .await?;
        }
        info!(count = docs.len(), "vector documents inserted");
        Ok(())
    }

    /// Deletes every document of one kind for one owner. Returns the
    /// number of rows removed.
    pub async fn delete_by_owner_and_kind(
        &self,
        owner_id: i64,
        kind: DocKind,
    ) -> Result<u64, PipelineError> {
        let conn = self.db.connect()?;
        let deleted = conn
            .execute(
                "DELETE FROM vector_store WHERE data_source_id = ? AND doc_type = ?",
                params![owner_id, kind.as_str()],
            )
            .await?;
        info!(owner_id, kind = kind.as_str(), deleted, "vector documents deleted");
        Ok(deleted)
    }

    /// Top-K cosine-similarity search, filtered by owner, kind, and a
    /// similarity threshold, ordered by descending similarity.
    pub async fn search(
        &self,
        query_vector: &[f32],
        owner_id: i64,
        kind: DocKind,
        top_k: u32,
        threshold: f64,
    ) -> Result<Vec<RetrievedDoc>, PipelineError> {
        self.check_dimensions(query_vector)?;
        let conn = self.db.connect()?;

        let vector_literal = query_vector
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT id, content, metadata,
                    1.0 - vector_distance_cos(embedding, vector('[{vector_literal}]')) AS similarity
             FROM vector_store
             WHERE data_source_id = ? AND doc_type = ?
               AND 1.0 - vector_distance_cos(embedding, vector('[{vector_literal}]')) >= ?
             ORDER BY similarity DESC, id ASC
             LIMIT {top_k}"
        );

        let mut rows = conn
            .query(&sql, params![owner_id, kind.as_str(), threshold])
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let id = match row.get_value(0)? {
                TursoValue::Integer(id) => id,
                _ => 0,
            };
            let content = match row.get_value(1)? {
                TursoValue::Text(s) => s,
                _ => String::new(),
            };
            let metadata = match row.get_value(2)? {
                TursoValue::Text(s) => {
                    serde_json::from_str::<Map<String, Value>>(&s).unwrap_or_default()
                }
                _ => Map::new(),
            };
            let similarity = match row.get_value(3)? {
                TursoValue::Real(f) => f,
                TursoValue::Integer(i) => i as f64,
                _ => 0.0,
            };
            results.push(RetrievedDoc {
                id,
                content,
                similarity,
                kind,
                metadata,
            });
        }

        debug!(
            owner_id,
            kind = kind.as_str(),
            hits = results.len(),
            "vector search complete"
        );
        Ok(results)
    }
}

/// Serializes a vector to the little-endian f32 blob layout the `vector`
/// SQL functions operate on.
fn embedding_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}
