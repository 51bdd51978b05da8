//! Core data model shared across the pipeline components.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The SQL dialect of a target data source.
///
/// The dialect determines connection URL construction only; it never changes
/// query semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[serde(alias = "mysql")]
    MySql,
    #[serde(alias = "postgres", alias = "postgresql")]
    Postgres,
}

impl SqlDialect {
    /// The engine name as shown to the LLM in rewrite prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }

    /// Parses the stored dialect string, accepting common spellings.
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(PipelineError::UnsupportedDialect(other.to_string())),
        }
    }

    /// The canonical form persisted in the metadata store.
    pub fn storage_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgresql",
        }
    }
}

/// A registered target database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub dialect: SqlDialect,
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub username: String,
    pub password: String,
    pub schema_synced_at: Option<String>,
}

impl DataSource {
    /// Builds the connection URL for the target engine.
    pub fn connection_url(&self) -> String {
        let scheme = match self.dialect {
            SqlDialect::MySql => "mysql",
            SqlDialect::Postgres => "postgres",
        };
        format!(
            "{scheme}://{user}:{pass}@{host}:{port}/{db}",
            user = self.username,
            pass = self.password,
            host = self.host,
            port = self.port,
            db = self.db_name,
        )
    }
}

/// Fields for registering a new data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDataSource {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub dialect: SqlDialect,
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub username: String,
    pub password: String,
}

/// The kind of grounding document held in the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Schema,
    Example,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Example => "example",
        }
    }
}

/// A grounding snippet returned by a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDoc {
    pub id: i64,
    pub content: String,
    pub similarity: f64,
    pub kind: DocKind,
    pub metadata: Map<String, Value>,
}

/// One generation attempt's output.
///
/// `success` means a non-empty SQL string was recovered from the model's
/// reply. It says nothing about safety: validation is a separate, mandatory
/// gate before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCandidate {
    pub sql: Option<String>,
    pub explanation: String,
    pub success: bool,
}

/// The distinct failure kinds of a query execution.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExecutionError {
    #[error("query timed out after {0} seconds; add filters or narrow the result set")]
    Timeout(u64),
    #[error("SQL execution failed: {0}")]
    Sql(String),
    #[error("failed to connect to the data source: {0}")]
    Connection(String),
}

/// The result of running one SQL candidate against a target database.
///
/// `columns` preserves the declared column order and every row map carries
/// exactly those keys; `row_count` always equals `rows.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub error: Option<ExecutionError>,
    pub sql: String,
}

impl ExecutionOutcome {
    pub fn ok(columns: Vec<String>, rows: Vec<Map<String, Value>>, sql: &str) -> Self {
        let row_count = rows.len();
        Self {
            success: true,
            columns,
            rows,
            row_count,
            error: None,
            sql: sql.to_string(),
        }
    }

    pub fn failed(error: ExecutionError, sql: &str) -> Self {
        Self {
            success: false,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            error: Some(error),
            sql: sql.to_string(),
        }
    }
}

/// The speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// The prefix used when rendering conversation history into a prompt.
    pub fn history_prefix(&self) -> &'static str {
        match self {
            Self::User => "User:",
            Self::Assistant => "Assistant:",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("assistant") {
            Self::Assistant
        } else {
            Self::User
        }
    }
}

/// One prior conversation turn, as fed into the context assembler.
#[derive(Debug, Clone)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
}

/// A chat session grouping one conversation against one data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub title: String,
    pub data_source_id: i64,
    pub created_at: String,
}

/// A persisted conversation message, including the audit fields for
/// assistant turns (generated SQL, serialized result, analysis, suggested
/// questions, terminal error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: ChatRole,
    pub content: String,
    pub sql_query: Option<String>,
    pub sql_result: Option<String>,
    pub analysis: Option<String>,
    pub chart_type: Option<String>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub suggestions: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
}

/// Fields for appending a new message to a session.
#[derive(Debug, Clone, Default)]
pub struct NewChatMessage {
    pub session_id: i64,
    pub role: Option<ChatRole>,
    pub content: String,
    pub sql_query: Option<String>,
    pub sql_result: Option<String>,
    pub analysis: Option<String>,
    pub chart_type: Option<String>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub suggestions: Option<String>,
    pub error: Option<String>,
}

impl NewChatMessage {
    pub fn user(session_id: i64, content: &str) -> Self {
        Self {
            session_id,
            role: Some(ChatRole::User),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn assistant(session_id: i64, content: &str) -> Self {
        Self {
            session_id,
            role: Some(ChatRole::Assistant),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn role(&self) -> ChatRole {
        self.role.unwrap_or(ChatRole::User)
    }
}

/// A business glossary entry. A `None` data source id marks a global term
/// that applies to every data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermEntry {
    pub id: i64,
    pub term: String,
    pub definition: String,
    pub data_source_id: Option<i64>,
}

/// A curated question-to-SQL example used as few-shot grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlExampleRecord {
    pub id: i64,
    pub question: String,
    pub sql: String,
    pub data_source_id: i64,
}
