#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared mocks for the pipeline tests: a scripted AI provider with a
//! recorded call history, a scripted query executor, and in-memory store
//! stubs, so tests are isolated and repeatable.

use askdb::config::SqlConfig;
use askdb::errors::PipelineError;
use askdb::execute::QueryExecutor;
use askdb::providers::ai::AiProvider;
use askdb::providers::db::storage::{DataSourceStore, GlossaryStore};
use askdb::types::{
    DataSource, ExecutionError, ExecutionOutcome, NewDataSource, SqlDialect, TermEntry,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, Once, RwLock};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt::init();
    });
}

// --- Mock AI Provider ---

/// Replays a scripted list of replies and records every call it receives.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    /// `(system_prompt, user_prompt)` per call, in order.
    pub call_history: Arc<RwLock<Vec<(String, String)>>>,
    pub responses: Arc<RwLock<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(responses.into_iter().rev().collect())),
            fail_with: None,
        }
    }

    /// A provider whose every call fails with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(Vec::new())),
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        _temperature: f32,
    ) -> Result<String, PipelineError> {
        self.call_history.write().unwrap().push((
            system_prompt.unwrap_or_default().to_string(),
            user_prompt.to_string(),
        ));
        if let Some(message) = &self.fail_with {
            return Err(PipelineError::LlmApi(message.clone()));
        }
        if let Some(response) = self.responses.write().unwrap().pop() {
            Ok(response)
        } else {
            Ok("Default mock response".to_string())
        }
    }
}

// --- Stub Query Executor ---

/// Fails the first `fail_times` executions with a scripted SQL error, then
/// succeeds with the configured columns and rows. Records executed SQL.
#[derive(Debug)]
pub struct StubExecutor {
    pub fail_times: RwLock<usize>,
    pub error_message: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub executed: Arc<RwLock<Vec<String>>>,
}

impl StubExecutor {
    pub fn succeeding(columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        Self {
            fail_times: RwLock::new(0),
            error_message: String::new(),
            columns,
            rows,
            executed: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn failing_times(fail_times: usize, error_message: &str) -> Self {
        Self {
            fail_times: RwLock::new(fail_times),
            error_message: error_message.to_string(),
            columns: vec!["value".to_string()],
            rows: vec![row(&[("value", Value::from(1))])],
            executed: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(
        &self,
        sql: &str,
        _data_source_id: i64,
        _limits: &SqlConfig,
    ) -> Result<ExecutionOutcome, PipelineError> {
        self.executed.write().unwrap().push(sql.to_string());
        let mut remaining = self.fail_times.write().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(ExecutionOutcome::failed(
                ExecutionError::Sql(self.error_message.clone()),
                sql,
            ));
        }
        Ok(ExecutionOutcome::ok(
            self.columns.clone(),
            self.rows.clone(),
            sql,
        ))
    }
}

/// Builds one result row from column/value pairs.
pub fn row(values: &[(&str, Value)]) -> Map<String, Value> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// --- Store stubs ---

/// Serves one fixed data source for any id.
#[derive(Debug, Clone)]
pub struct StubDataSourceStore {
    pub source: DataSource,
}

impl StubDataSourceStore {
    pub fn mysql() -> Self {
        Self {
            source: test_data_source(1),
        }
    }
}

pub fn test_data_source(id: i64) -> DataSource {
    DataSource {
        id,
        name: "orders-db".to_string(),
        description: None,
        dialect: SqlDialect::MySql,
        host: "127.0.0.1".to_string(),
        port: 3306,
        db_name: "orders".to_string(),
        username: "reader".to_string(),
        password: "secret".to_string(),
        schema_synced_at: None,
    }
}

#[async_trait]
impl DataSourceStore for StubDataSourceStore {
    async fn get(&self, id: i64) -> Result<Option<DataSource>, PipelineError> {
        let mut source = self.source.clone();
        source.id = id;
        Ok(Some(source))
    }
    async fn list(&self) -> Result<Vec<DataSource>, PipelineError> {
        Ok(vec![self.source.clone()])
    }
    async fn create(&self, _source: NewDataSource) -> Result<DataSource, PipelineError> {
        Ok(self.source.clone())
    }
    async fn update(&self, _id: i64, _source: NewDataSource) -> Result<(), PipelineError> {
        Ok(())
    }
    async fn delete(&self, _id: i64) -> Result<(), PipelineError> {
        Ok(())
    }
    async fn mark_synced(&self, _id: i64) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// A glossary with a fixed term list.
#[derive(Debug, Clone, Default)]
pub struct StubGlossaryStore {
    pub terms: Vec<TermEntry>,
}

#[async_trait]
impl GlossaryStore for StubGlossaryStore {
    async fn terms_for(&self, _data_source_id: i64) -> Result<Vec<TermEntry>, PipelineError> {
        Ok(self.terms.clone())
    }
    async fn list(
        &self,
        _data_source_id: Option<i64>,
    ) -> Result<Vec<TermEntry>, PipelineError> {
        Ok(self.terms.clone())
    }
    async fn create(
        &self,
        term: &str,
        definition: &str,
        data_source_id: Option<i64>,
    ) -> Result<TermEntry, PipelineError> {
        Ok(TermEntry {
            id: 1,
            term: term.to_string(),
            definition: definition.to_string(),
            data_source_id,
        })
    }
    async fn delete(&self, _id: i64) -> Result<(), PipelineError> {
        Ok(())
    }
}
