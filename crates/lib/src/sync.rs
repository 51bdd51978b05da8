//! # Schema Synchronization
//!
//! Extracts a data source's table/column metadata, embeds it, and stores it
//! in the vector index. Extraction and embedding are long-running, so the
//! sync runs as a background task tracked by a per-data-source progress
//! record: a single writer (the job) updates it, any number of pollers read
//! it. Values move in and out of the registry whole, so a poller can see a
//! slightly stale snapshot but never a torn one.

use crate::{
    errors::PipelineError,
    providers::{
        ai::embedding::{EmbeddingClient, PROVIDER_BATCH_LIMIT},
        db::{
            storage::DataSourceStore,
            vector::{NewVectorDocument, VectorStore},
        },
    },
    types::{DataSource, DocKind, SqlDialect},
};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const EXTRACTION_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The lifecycle of one sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Extracting,
    Embedding,
    Done,
    Error,
}

/// A snapshot of one sync job's progress.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    pub status: SyncStatus,
    pub processed: usize,
    pub total: usize,
    pub current_table: String,
    pub error: Option<String>,
}

impl SyncProgress {
    fn starting() -> Self {
        Self {
            status: SyncStatus::Extracting,
            processed: 0,
            total: 0,
            current_table: String::new(),
            error: None,
        }
    }
}

/// Concurrent progress registry keyed by data source id.
#[derive(Debug, Clone, Default)]
pub struct SyncProgressRegistry {
    inner: Arc<DashMap<i64, SyncProgress>>,
}

impl SyncProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, data_source_id: i64, progress: SyncProgress) {
        self.inner.insert(data_source_id, progress);
    }

    /// A whole-value snapshot of the job's progress, if one exists.
    pub fn get(&self, data_source_id: i64) -> Option<SyncProgress> {
        self.inner.get(&data_source_id).map(|entry| entry.clone())
    }
}

/// One extracted table, rendered as an embeddable document.
#[derive(Debug, Clone)]
pub struct TableDoc {
    pub table: String,
    pub content: String,
}

/// Runs schema syncs and tracks their progress.
pub struct SchemaSyncService {
    embeddings: Arc<EmbeddingClient>,
    index: Arc<VectorStore>,
    data_sources: Arc<dyn DataSourceStore>,
    progress: SyncProgressRegistry,
}

impl SchemaSyncService {
    pub fn new(
        embeddings: Arc<EmbeddingClient>,
        index: Arc<VectorStore>,
        data_sources: Arc<dyn DataSourceStore>,
    ) -> Self {
        Self {
            embeddings,
            index,
            data_sources,
            progress: SyncProgressRegistry::new(),
        }
    }

    pub fn progress(&self) -> &SyncProgressRegistry {
        &self.progress
    }

    /// Spawns the sync as a background task and returns immediately. The
    /// caller polls the progress registry for completion.
    pub fn spawn_sync(service: Arc<Self>, source: DataSource) {
        tokio::spawn(async move {
            let id = source.id;
            if let Err(e) = service.run_sync(&source).await {
                error!(data_source = %source.name, error = %e, "schema sync failed");
                let mut progress = service
                    .progress
                    .get(id)
                    .unwrap_or_else(SyncProgress::starting);
                progress.status = SyncStatus::Error;
                progress.error = Some(e.to_string());
                service.progress.put(id, progress);
            }
        });
    }

    /// The sync body: extract, clear old vectors, embed in batches, insert.
    pub async fn run_sync(&self, source: &DataSource) -> Result<usize, PipelineError> {
        info!(data_source = %source.name, "starting schema sync");
        self.progress.put(source.id, SyncProgress::starting());

        let docs = extract_schema_docs(source, &self.progress).await?;
        if docs.is_empty() {
            warn!(
                data_source = %source.name,
                "no tables extracted; check database permissions and connection settings"
            );
        }

        // Resync replaces the old schema vectors wholesale.
        self.index
            .delete_by_owner_and_kind(source.id, DocKind::Schema)
            .await?;

        self.progress.put(
            source.id,
            SyncProgress {
                status: SyncStatus::Embedding,
                processed: 0,
                total: docs.len(),
                current_table: String::new(),
                error: None,
            },
        );

        let mut processed = 0usize;
        for chunk in docs.chunks(PROVIDER_BATCH_LIMIT) {
            let contents: Vec<String> = chunk.iter().map(|d| d.content.clone()).collect();
            let vectors = self.embeddings.embed_batch(&contents).await?;

            let batch: Vec<NewVectorDocument> = chunk
                .iter()
                .zip(vectors)
                .map(|(doc, embedding)| {
                    let mut metadata = Map::new();
                    metadata.insert(
                        "table_name".to_string(),
                        Value::String(doc.table.clone()),
                    );
                    NewVectorDocument {
                        content: doc.content.clone(),
                        owner_id: source.id,
                        kind: DocKind::Schema,
                        metadata,
                        embedding,
                    }
                })
                .collect();
            self.index.insert_batch(&batch).await?;

            processed += chunk.len();
            self.progress.put(
                source.id,
                SyncProgress {
                    status: SyncStatus::Embedding,
                    processed,
                    total: docs.len(),
                    current_table: chunk.last().map(|d| d.table.clone()).unwrap_or_default(),
                    error: None,
                },
            );
        }

        self.data_sources.mark_synced(source.id).await?;
        self.progress.put(
            source.id,
            SyncProgress {
                status: SyncStatus::Done,
                processed: docs.len(),
                total: docs.len(),
                current_table: String::new(),
                error: None,
            },
        );
        info!(data_source = %source.name, tables = docs.len(), "schema sync complete");
        Ok(docs.len())
    }
}

/// A column as extracted from `information_schema`.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub comment: Option<String>,
}

/// Renders one table as the document text that gets embedded.
pub fn format_table_doc(
    table: &str,
    comment: Option<&str>,
    columns: &[ColumnInfo],
    primary_keys: &[String],
) -> String {
    let mut doc = format!("Table: {table}\n");
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        doc.push_str(&format!("Comment: {comment}\n"));
    }
    doc.push_str("Columns:\n");
    for column in columns {
        let nullability = if column.nullable { "nullable" } else { "not null" };
        doc.push_str(&format!(
            "  - {} ({}, {})",
            column.name, column.data_type, nullability
        ));
        if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
            doc.push_str(&format!(": {comment}"));
        }
        doc.push('\n');
    }
    if !primary_keys.is_empty() {
        doc.push_str(&format!("Primary key: {}\n", primary_keys.join(", ")));
    }
    doc
}

/// Extracts every base table of the data source as an embeddable document,
/// updating the progress record per table.
pub async fn extract_schema_docs(
    source: &DataSource,
    progress: &SyncProgressRegistry,
) -> Result<Vec<TableDoc>, PipelineError> {
    match source.dialect {
        SqlDialect::MySql => extract_mysql(source, progress).await,
        SqlDialect::Postgres => extract_postgres(source, progress).await,
    }
}

fn extraction_error(e: sqlx::Error) -> PipelineError {
    PipelineError::SchemaExtraction(e.to_string())
}

async fn extract_mysql(
    source: &DataSource,
    progress: &SyncProgressRegistry,
) -> Result<Vec<TableDoc>, PipelineError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(EXTRACTION_CONNECT_TIMEOUT)
        .connect(&source.connection_url())
        .await
        .map_err(extraction_error)?;

    let tables = sqlx::query(
        "SELECT TABLE_NAME, TABLE_COMMENT FROM information_schema.TABLES
         WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME",
    )
    .bind(&source.db_name)
    .fetch_all(&pool)
    .await
    .map_err(extraction_error)?;

    let total = tables.len();
    let mut docs = Vec::with_capacity(total);

    for (index, table_row) in tables.iter().enumerate() {
        let table: String = table_row.try_get(0).map_err(extraction_error)?;
        let comment: Option<String> = table_row.try_get(1).ok().flatten();
        let full_name = format!("{}.{}", source.db_name, table);

        progress.put(
            source.id,
            SyncProgress {
                status: SyncStatus::Extracting,
                processed: index,
                total,
                current_table: full_name.clone(),
                error: None,
            },
        );

        let column_rows = sqlx::query(
            "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_COMMENT, COLUMN_KEY
             FROM information_schema.COLUMNS
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(&source.db_name)
        .bind(&table)
        .fetch_all(&pool)
        .await
        .map_err(extraction_error)?;

        let mut columns = Vec::with_capacity(column_rows.len());
        let mut primary_keys = Vec::new();
        for row in &column_rows {
            let name: String = row.try_get(0).map_err(extraction_error)?;
            let data_type: String = row.try_get(1).map_err(extraction_error)?;
            let is_nullable: String = row.try_get(2).map_err(extraction_error)?;
            let column_comment: Option<String> = row.try_get(3).ok().flatten();
            let column_key: Option<String> = row.try_get(4).ok().flatten();
            if column_key.as_deref() == Some("PRI") {
                primary_keys.push(name.clone());
            }
            columns.push(ColumnInfo {
                name,
                data_type,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                comment: column_comment,
            });
        }

        docs.push(TableDoc {
            table: full_name.clone(),
            content: format_table_doc(
                &full_name,
                comment.as_deref(),
                &columns,
                &primary_keys,
            ),
        });
    }

    pool.close().await;
    Ok(docs)
}

async fn extract_postgres(
    source: &DataSource,
    progress: &SyncProgressRegistry,
) -> Result<Vec<TableDoc>, PipelineError> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(EXTRACTION_CONNECT_TIMEOUT)
        .connect(&source.connection_url())
        .await
        .map_err(extraction_error)?;

    let tables = sqlx::query(
        "SELECT table_schema, table_name FROM information_schema.tables
         WHERE table_catalog = current_database()
           AND table_schema NOT IN ('pg_catalog', 'information_schema')
           AND table_type = 'BASE TABLE'
         ORDER BY table_schema, table_name",
    )
    .fetch_all(&pool)
    .await
    .map_err(extraction_error)?;

    let total = tables.len();
    let mut docs = Vec::with_capacity(total);

    for (index, table_row) in tables.iter().enumerate() {
        let schema: String = table_row.try_get(0).map_err(extraction_error)?;
        let table: String = table_row.try_get(1).map_err(extraction_error)?;
        let full_name = format!("{schema}.{table}");

        progress.put(
            source.id,
            SyncProgress {
                status: SyncStatus::Extracting,
                processed: index,
                total,
                current_table: full_name.clone(),
                error: None,
            },
        );

        let column_rows = sqlx::query(
            "SELECT column_name, data_type, is_nullable
             FROM information_schema.columns
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
        )
        .bind(&schema)
        .bind(&table)
        .fetch_all(&pool)
        .await
        .map_err(extraction_error)?;

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let name: String = row.try_get(0).map_err(extraction_error)?;
            let data_type: String = row.try_get(1).map_err(extraction_error)?;
            let is_nullable: String = row.try_get(2).map_err(extraction_error)?;
            columns.push(ColumnInfo {
                name,
                data_type,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                comment: None,
            });
        }

        let pk_rows = sqlx::query(
            "SELECT kcu.column_name
             FROM information_schema.table_constraints tc
             JOIN information_schema.key_column_usage kcu
               ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
             WHERE tc.constraint_type = 'PRIMARY KEY'
               AND tc.table_schema = $1 AND tc.table_name = $2
             ORDER BY kcu.ordinal_position",
        )
        .bind(&schema)
        .bind(&table)
        .fetch_all(&pool)
        .await
        .map_err(extraction_error)?;

        let primary_keys: Vec<String> = pk_rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>(0).ok())
            .collect();

        docs.push(TableDoc {
            table: full_name.clone(),
            content: format_table_doc(&full_name, None, &columns, &primary_keys),
        });
    }

    pool.close().await;
    Ok(docs)
}
