//! # Application Metadata Store
//!
//! A turso-backed implementation of the collaborator store contracts:
//! data sources, chat sessions and messages, glossary terms, and saved
//! Q→SQL examples. The store holds a `Database` instance (which manages
//! its own connection pool); cloning shares the underlying database.

use crate::errors::PipelineError;
use crate::providers::db::storage::{DataSourceStore, ExampleStore, GlossaryStore, SessionStore};
use crate::types::{
    ChatMessage, ChatRole, ChatSession, DataSource, NewChatMessage, NewDataSource,
    SqlExampleRecord, SqlDialect, TermEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt::{self, Debug};
use tracing::info;
use turso::{params, Connection, Database, Row, Value as TursoValue};

mod sql;

/// The turso-backed metadata store.
#[derive(Clone)]
pub struct SqliteStore {
    pub db: Database,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Creates a new store from a file path, or in-memory with ":memory:".
    /// To share an in-memory database across instances (e.g. in tests),
    /// create one store and `.clone()` it.
    pub async fn new(db_path: &str) -> Result<Self, PipelineError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?;

        // WAL mode for better concurrency on file-backed databases; a no-op
        // for in-memory ones. PRAGMAs that return a value go through
        // `query` to avoid "unexpected row" errors.
        let conn = db.connect()?;
        conn.query("PRAGMA journal_mode=WAL;", ()).await?;

        Ok(Self { db })
    }

    /// Ensures all application tables and indexes exist. Idempotent and
    /// safe to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), PipelineError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// A helper for tests to pre-populate data from multiple statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), PipelineError> {
        let conn = self.db.connect()?;
        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection, PipelineError> {
        Ok(self.db.connect()?)
    }
}

async fn last_insert_id(conn: &Connection) -> Result<i64, PipelineError> {
    let mut rows = conn.query("SELECT last_insert_rowid()", ()).await?;
    match rows.next().await? {
        Some(row) => Ok(int_at(&row, 0)?),
        None => Ok(0),
    }
}

// --- Row extraction helpers ---

fn text_at(row: &Row, index: usize) -> Result<String, PipelineError> {
    Ok(match row.get_value(index)? {
        TursoValue::Text(s) => s,
        TursoValue::Integer(i) => i.to_string(),
        _ => String::new(),
    })
}

fn opt_text_at(row: &Row, index: usize) -> Result<Option<String>, PipelineError> {
    Ok(match row.get_value(index)? {
        TursoValue::Text(s) => Some(s),
        _ => None,
    })
}

fn int_at(row: &Row, index: usize) -> Result<i64, PipelineError> {
    Ok(match row.get_value(index)? {
        TursoValue::Integer(i) => i,
        _ => 0,
    })
}

fn opt_int_at(row: &Row, index: usize) -> Result<Option<i64>, PipelineError> {
    Ok(match row.get_value(index)? {
        TursoValue::Integer(i) => Some(i),
        _ => None,
    })
}

fn opt_value(value: Option<String>) -> TursoValue {
    match value {
        Some(s) => TursoValue::Text(s),
        None => TursoValue::Null,
    }
}

const DATA_SOURCE_COLUMNS: &str =
    "id, name, description, dialect, host, port, db_name, username, password, schema_synced_at";

fn data_source_from_row(row: &Row) -> Result<DataSource, PipelineError> {
    Ok(DataSource {
        id: int_at(row, 0)?,
        name: text_at(row, 1)?,
        description: opt_text_at(row, 2)?,
        dialect: SqlDialect::parse(&text_at(row, 3)?)?,
        host: text_at(row, 4)?,
        port: int_at(row, 5)? as u16,
        db_name: text_at(row, 6)?,
        username: text_at(row, 7)?,
        password: text_at(row, 8)?,
        schema_synced_at: opt_text_at(row, 9)?,
    })
}

const CHAT_MESSAGE_COLUMNS: &str = "id, session_id, role, content, sql_query, sql_result, \
     analysis, chart_type, x_axis, y_axis, suggestions, error, created_at";

fn chat_message_from_row(row: &Row) -> Result<ChatMessage, PipelineError> {
    Ok(ChatMessage {
        id: int_at(row, 0)?,
        session_id: int_at(row, 1)?,
        role: ChatRole::parse(&text_at(row, 2)?),
        content: text_at(row, 3)?,
        sql_query: opt_text_at(row, 4)?,
        sql_result: opt_text_at(row, 5)?,
        analysis: opt_text_at(row, 6)?,
        chart_type: opt_text_at(row, 7)?,
        x_axis: opt_text_at(row, 8)?,
        y_axis: opt_text_at(row, 9)?,
        suggestions: opt_text_at(row, 10)?,
        error: opt_text_at(row, 11)?,
        created_at: text_at(row, 12)?,
    })
}

#[async_trait]
impl DataSourceStore for SqliteStore {
    async fn get(&self, id: i64) -> Result<Option<DataSource>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {DATA_SOURCE_COLUMNS} FROM data_source WHERE id = ?"),
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(data_source_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<DataSource>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {DATA_SOURCE_COLUMNS} FROM data_source ORDER BY id"),
                (),
            )
            .await?;
        let mut sources = Vec::new();
        while let Some(row) = rows.next().await? {
            sources.push(data_source_from_row(&row)?);
        }
        Ok(sources)
    }

    async fn create(&self, source: NewDataSource) -> Result<DataSource, PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO data_source (name, description, dialect, host, port, db_name, username, password)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                TursoValue::Text(source.name.clone()),
                opt_value(source.description.clone()),
                TursoValue::Text(source.dialect.storage_str().to_string()),
                TursoValue::Text(source.host.clone()),
                TursoValue::Integer(source.port as i64),
                TursoValue::Text(source.db_name.clone()),
                TursoValue::Text(source.username.clone()),
                TursoValue::Text(source.password.clone()),
            ],
        )
        .await?;
        let id = last_insert_id(&conn).await?;
        info!(id, name = %source.name, "data source registered");
        Ok(DataSource {
            id,
            name: source.name,
            description: source.description,
            dialect: source.dialect,
            host: source.host,
            port: source.port,
            db_name: source.db_name,
            username: source.username,
            password: source.password,
            schema_synced_at: None,
        })
    }

    async fn update(&self, id: i64, source: NewDataSource) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE data_source SET name = ?, description = ?, dialect = ?, host = ?, port = ?,
                    db_name = ?, username = ?, password = ? WHERE id = ?",
            vec![
                TursoValue::Text(source.name),
                opt_value(source.description),
                TursoValue::Text(source.dialect.storage_str().to_string()),
                TursoValue::Text(source.host),
                TursoValue::Integer(source.port as i64),
                TursoValue::Text(source.db_name),
                TursoValue::Text(source.username),
                TursoValue::Text(source.password),
                TursoValue::Integer(id),
            ],
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM data_source WHERE id = ?", params![id])
            .await?;
        Ok(())
    }

    async fn mark_synced(&self, id: i64) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE data_source SET schema_synced_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl GlossaryStore for SqliteStore {
    async fn terms_for(&self, data_source_id: i64) -> Result<Vec<TermEntry>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, term, definition, data_source_id FROM term_glossary
                 WHERE data_source_id = ? OR data_source_id IS NULL ORDER BY id",
                params![data_source_id],
            )
            .await?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next().await? {
            terms.push(TermEntry {
                id: int_at(&row, 0)?,
                term: text_at(&row, 1)?,
                definition: text_at(&row, 2)?,
                data_source_id: opt_int_at(&row, 3)?,
            });
        }
        Ok(terms)
    }

    async fn list(&self, data_source_id: Option<i64>) -> Result<Vec<TermEntry>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = match data_source_id {
            Some(id) => {
                conn.query(
                    "SELECT id, term, definition, data_source_id FROM term_glossary
                     WHERE data_source_id = ? ORDER BY id",
                    params![id],
                )
                .await?
            }
            None => {
                conn.query(
                    "SELECT id, term, definition, data_source_id FROM term_glossary ORDER BY id",
                    (),
                )
                .await?
            }
        };
        let mut terms = Vec::new();
        while let Some(row) = rows.next().await? {
            terms.push(TermEntry {
                id: int_at(&row, 0)?,
                term: text_at(&row, 1)?,
                definition: text_at(&row, 2)?,
                data_source_id: opt_int_at(&row, 3)?,
            });
        }
        Ok(terms)
    }

    async fn create(
        &self,
        term: &str,
        definition: &str,
        data_source_id: Option<i64>,
    ) -> Result<TermEntry, PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO term_glossary (term, definition, data_source_id) VALUES (?, ?, ?)",
            vec![
                TursoValue::Text(term.to_string()),
                TursoValue::Text(definition.to_string()),
                match data_source_id {
                    Some(id) => TursoValue::Integer(id),
                    None => TursoValue::Null,
                },
            ],
        )
        .await?;
        let id = last_insert_id(&conn).await?;
        Ok(TermEntry {
            id,
            term: term.to_string(),
            definition: definition.to_string(),
            data_source_id,
        })
    }

    async fn delete(&self, id: i64) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM term_glossary WHERE id = ?", params![id])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ExampleStore for SqliteStore {
    async fn list(
        &self,
        data_source_id: Option<i64>,
    ) -> Result<Vec<SqlExampleRecord>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = match data_source_id {
            Some(id) => {
                conn.query(
                    "SELECT id, question, sql_query, data_source_id FROM sql_example
                     WHERE data_source_id = ? ORDER BY id",
                    params![id],
                )
                .await?
            }
            None => {
                conn.query(
                    "SELECT id, question, sql_query, data_source_id FROM sql_example ORDER BY id",
                    (),
                )
                .await?
            }
        };
        let mut examples = Vec::new();
        while let Some(row) = rows.next().await? {
            examples.push(SqlExampleRecord {
                id: int_at(&row, 0)?,
                question: text_at(&row, 1)?,
                sql: text_at(&row, 2)?,
                data_source_id: int_at(&row, 3)?,
            });
        }
        Ok(examples)
    }

    async fn save(
        &self,
        question: &str,
        sql: &str,
        data_source_id: i64,
    ) -> Result<SqlExampleRecord, PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO sql_example (question, sql_query, data_source_id) VALUES (?, ?, ?)",
            params![question, sql, data_source_id],
        )
        .await?;
        let id = last_insert_id(&conn).await?;
        info!(id, data_source_id, "SQL example saved");
        Ok(SqlExampleRecord {
            id,
            question: question.to_string(),
            sql: sql.to_string(),
            data_source_id,
        })
    }

    async fn delete(&self, id: i64) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM sql_example WHERE id = ?", params![id])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(
        &self,
        data_source_id: i64,
        title: &str,
    ) -> Result<ChatSession, PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO chat_session (title, data_source_id) VALUES (?, ?)",
            params![title, data_source_id],
        )
        .await?;
        let id = last_insert_id(&conn).await?;
        let mut rows = conn
            .query(
                "SELECT created_at FROM chat_session WHERE id = ?",
                params![id],
            )
            .await?;
        let created_at = match rows.next().await? {
            Some(row) => text_at(&row, 0)?,
            None => String::new(),
        };
        Ok(ChatSession {
            id,
            title: title.to_string(),
            data_source_id,
            created_at,
        })
    }

    async fn get_session(&self, id: i64) -> Result<Option<ChatSession>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, title, data_source_id, created_at FROM chat_session WHERE id = ?",
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(ChatSession {
                id: int_at(&row, 0)?,
                title: text_at(&row, 1)?,
                data_source_id: int_at(&row, 2)?,
                created_at: text_at(&row, 3)?,
            })),
            None => Ok(None),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, title, data_source_id, created_at FROM chat_session
                 ORDER BY created_at DESC, id DESC",
                (),
            )
            .await?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            sessions.push(ChatSession {
                id: int_at(&row, 0)?,
                title: text_at(&row, 1)?,
                data_source_id: int_at(&row, 2)?,
                created_at: text_at(&row, 3)?,
            });
        }
        Ok(sessions)
    }

    async fn rename_session(&self, id: i64, title: &str) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE chat_session SET title = ? WHERE id = ?",
            params![title, id],
        )
        .await?;
        Ok(())
    }

    async fn delete_session(&self, id: i64) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM chat_message WHERE session_id = ?", params![id])
            .await?;
        conn.execute("DELETE FROM chat_session WHERE id = ?", params![id])
            .await?;
        Ok(())
    }

    async fn append_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, PipelineError> {
        let conn = self.connect()?;
        let role = message.role();
        conn.execute(
            "INSERT INTO chat_message (session_id, role, content, sql_query, sql_result,
                analysis, chart_type, x_axis, y_axis, suggestions, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                TursoValue::Integer(message.session_id),
                TursoValue::Text(role.as_str().to_string()),
                TursoValue::Text(message.content),
                opt_value(message.sql_query),
                opt_value(message.sql_result),
                opt_value(message.analysis),
                opt_value(message.chart_type),
                opt_value(message.x_axis),
                opt_value(message.y_axis),
                opt_value(message.suggestions),
                opt_value(message.error),
            ],
        )
        .await?;
        let id = last_insert_id(&conn).await?;

        let mut rows = conn
            .query(
                &format!("SELECT {CHAT_MESSAGE_COLUMNS} FROM chat_message WHERE id = ?"),
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => chat_message_from_row(&row),
            None => Err(PipelineError::Store(format!(
                "message {id} vanished after insert"
            ))),
        }
    }

    async fn messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {CHAT_MESSAGE_COLUMNS} FROM chat_message
                     WHERE session_id = ? ORDER BY id"
                ),
                params![session_id],
            )
            .await?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(chat_message_from_row(&row)?);
        }
        Ok(messages)
    }
}
