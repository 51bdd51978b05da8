//! # Collaborator Store Contracts
//!
//! The pipeline consumes simple persistence (data sources, glossary terms,
//! saved examples, sessions/messages) through these narrow traits. The
//! turso-backed implementation lives in [`super::sqlite`]; tests substitute
//! stubs.

use crate::errors::PipelineError;
use crate::types::{
    ChatMessage, ChatSession, DataSource, NewChatMessage, NewDataSource, SqlExampleRecord,
    TermEntry,
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Lookup and management of target data-source connection records.
#[async_trait]
pub trait DataSourceStore: Send + Sync + Debug {
    async fn get(&self, id: i64) -> Result<Option<DataSource>, PipelineError>;
    async fn list(&self) -> Result<Vec<DataSource>, PipelineError>;
    async fn create(&self, source: NewDataSource) -> Result<DataSource, PipelineError>;
    async fn update(&self, id: i64, source: NewDataSource) -> Result<(), PipelineError>;
    async fn delete(&self, id: i64) -> Result<(), PipelineError>;
    /// Records a completed schema sync.
    async fn mark_synced(&self, id: i64) -> Result<(), PipelineError>;
}

/// Glossary lookup: terms bound to a data source plus global terms.
#[async_trait]
pub trait GlossaryStore: Send + Sync + Debug {
    /// Terms for the given data source, global terms included.
    async fn terms_for(&self, data_source_id: i64) -> Result<Vec<TermEntry>, PipelineError>;
    async fn list(&self, data_source_id: Option<i64>) -> Result<Vec<TermEntry>, PipelineError>;
    async fn create(
        &self,
        term: &str,
        definition: &str,
        data_source_id: Option<i64>,
    ) -> Result<TermEntry, PipelineError>;
    async fn delete(&self, id: i64) -> Result<(), PipelineError>;
}

/// Curated question-to-SQL examples. Saving one is expected to trigger
/// re-indexing into the vector store at the call site.
#[async_trait]
pub trait ExampleStore: Send + Sync + Debug {
    async fn list(
        &self,
        data_source_id: Option<i64>,
    ) -> Result<Vec<SqlExampleRecord>, PipelineError>;
    async fn save(
        &self,
        question: &str,
        sql: &str,
        data_source_id: i64,
    ) -> Result<SqlExampleRecord, PipelineError>;
    async fn delete(&self, id: i64) -> Result<(), PipelineError>;
}

/// Append-only session and message store keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    async fn create_session(
        &self,
        data_source_id: i64,
        title: &str,
    ) -> Result<ChatSession, PipelineError>;
    async fn get_session(&self, id: i64) -> Result<Option<ChatSession>, PipelineError>;
    async fn list_sessions(&self) -> Result<Vec<ChatSession>, PipelineError>;
    async fn rename_session(&self, id: i64, title: &str) -> Result<(), PipelineError>;
    /// Deletes a session and its messages.
    async fn delete_session(&self, id: i64) -> Result<(), PipelineError>;
    async fn append_message(&self, message: NewChatMessage)
        -> Result<ChatMessage, PipelineError>;
    /// All messages of a session, oldest first.
    async fn messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, PipelineError>;
}
