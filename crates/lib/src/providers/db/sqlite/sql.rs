//! # SQLite Specific SQL Statements
//!
//! Centralizes the DDL for the application metadata tables so the store
//! logic stays clean and database-specific syntax lives in one place. The
//! vector index creates its own table because its column width depends on
//! the configured embedding dimensionality.

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS data_source (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        dialect TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        db_name TEXT NOT NULL,
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        schema_synced_at TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS chat_session (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        data_source_id INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS chat_message (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        sql_query TEXT,
        sql_result TEXT,
        analysis TEXT,
        chart_type TEXT,
        x_axis TEXT,
        y_axis TEXT,
        suggestions TEXT,
        error TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_chat_message_session
        ON chat_message (session_id)",
    "CREATE TABLE IF NOT EXISTS term_glossary (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        term TEXT NOT NULL,
        definition TEXT NOT NULL,
        data_source_id INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS sql_example (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question TEXT NOT NULL,
        sql_query TEXT NOT NULL,
        data_source_id INTEGER NOT NULL
    )",
];
