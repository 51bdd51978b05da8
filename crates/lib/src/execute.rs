//! # SQL Execution
//!
//! Runs validated SQL against a live target database under a row cap and a
//! query timeout. The executor re-validates before running (defense in
//! depth — it never trusts a caller to have run the gate) and materializes
//! an ordered column list plus ordered `column → value` row maps. The three
//! failure kinds (timeout, SQL error, connection error) surface distinct
//! messages but one `ExecutionOutcome { success: false }` shape, so the
//! retry loop treats them uniformly.

use crate::{
    config::SqlConfig,
    errors::PipelineError,
    providers::db::storage::DataSourceStore,
    types::{DataSource, ExecutionError, ExecutionOutcome, SqlDialect},
    validate::validate_sql,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::BigDecimal;
use sqlx::{Column, Row, TypeInfo};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

const POOL_MAX_CONNECTIONS: u32 = 5;
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The pipeline's seam for query execution. The production implementation
/// is [`SqlxExecutor`]; tests substitute stubs.
#[async_trait]
pub trait QueryExecutor: Send + Sync + Debug {
    /// Executes SQL against the given data source under the limits of the
    /// caller's configuration snapshot.
    async fn execute(
        &self,
        sql: &str,
        data_source_id: i64,
        limits: &SqlConfig,
    ) -> Result<ExecutionOutcome, PipelineError>;
}

#[derive(Clone, Debug)]
enum TargetPool {
    MySql(MySqlPool),
    Postgres(PgPool),
}

/// Executes queries through sqlx, caching one bounded connection pool per
/// data source. Cloned pools share the underlying connections.
#[derive(Debug)]
pub struct SqlxExecutor {
    data_sources: Arc<dyn DataSourceStore>,
    pools: RwLock<HashMap<i64, TargetPool>>,
}

impl SqlxExecutor {
    pub fn new(data_sources: Arc<dyn DataSourceStore>) -> Self {
        Self {
            data_sources,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Drops the cached pool for a data source, e.g. after its connection
    /// settings changed.
    pub async fn invalidate_pool(&self, data_source_id: i64) {
        self.pools.write().await.remove(&data_source_id);
    }

    async fn pool_for(&self, source: &DataSource) -> Result<TargetPool, ExecutionError> {
        if let Some(pool) = self.pools.read().await.get(&source.id) {
            return Ok(pool.clone());
        }

        let url = source.connection_url();
        let pool = match source.dialect {
            SqlDialect::MySql => MySqlPoolOptions::new()
                .max_connections(POOL_MAX_CONNECTIONS)
                .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
                .connect(&url)
                .await
                .map(TargetPool::MySql)
                .map_err(|e| ExecutionError::Connection(e.to_string()))?,
            SqlDialect::Postgres => PgPoolOptions::new()
                .max_connections(POOL_MAX_CONNECTIONS)
                .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
                .connect(&url)
                .await
                .map(TargetPool::Postgres)
                .map_err(|e| ExecutionError::Connection(e.to_string()))?,
        };

        self.pools.write().await.insert(source.id, pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl QueryExecutor for SqlxExecutor {
    async fn execute(
        &self,
        sql: &str,
        data_source_id: i64,
        limits: &SqlConfig,
    ) -> Result<ExecutionOutcome, PipelineError> {
        // Defense in depth: never trust a caller to have run the gate.
        validate_sql(sql, limits.read_only)?;

        let source = self
            .data_sources
            .get(data_source_id)
            .await?
            .ok_or(PipelineError::UnknownDataSource(data_source_id))?;

        info!(data_source = %source.name, sql = %sql, "executing SQL");

        let pool = match self.pool_for(&source).await {
            Ok(pool) => pool,
            Err(connection_error) => {
                error!(data_source = %source.name, error = %connection_error,
                    "could not reach the data source");
                return Ok(ExecutionOutcome::failed(connection_error, sql));
            }
        };

        let timeout = Duration::from_secs(limits.timeout_seconds);
        let fetched = match &pool {
            TargetPool::MySql(pool) => {
                tokio::time::timeout(timeout, fetch_mysql(pool, sql, limits.max_rows)).await
            }
            TargetPool::Postgres(pool) => {
                tokio::time::timeout(timeout, fetch_postgres(pool, sql, limits.max_rows)).await
            }
        };

        match fetched {
            Err(_elapsed) => {
                error!(sql = %sql, timeout_seconds = limits.timeout_seconds,
                    "SQL execution timed out");
                Ok(ExecutionOutcome::failed(
                    ExecutionError::Timeout(limits.timeout_seconds),
                    sql,
                ))
            }
            Ok(Err(sqlx_error)) => {
                error!(sql = %sql, error = %sqlx_error, "SQL execution failed");
                Ok(ExecutionOutcome::failed(classify_error(sqlx_error), sql))
            }
            Ok(Ok((columns, rows))) => {
                info!(rows = rows.len(), "SQL executed successfully");
                Ok(ExecutionOutcome::ok(columns, rows, sql))
            }
        }
    }
}

/// Checks that a data source is reachable and answers a trivial query.
pub async fn test_connection(source: &DataSource) -> Result<(), ExecutionError> {
    let url = source.connection_url();
    match source.dialect {
        SqlDialect::MySql => {
            let pool = MySqlPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(CONNECTION_TEST_TIMEOUT)
                .connect(&url)
                .await
                .map_err(|e| ExecutionError::Connection(e.to_string()))?;
            sqlx::query("SELECT 1")
                .fetch_one(&pool)
                .await
                .map_err(|e| ExecutionError::Connection(e.to_string()))?;
            pool.close().await;
        }
        SqlDialect::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(CONNECTION_TEST_TIMEOUT)
                .connect(&url)
                .await
                .map_err(|e| ExecutionError::Connection(e.to_string()))?;
            sqlx::query("SELECT 1")
                .fetch_one(&pool)
                .await
                .map_err(|e| ExecutionError::Connection(e.to_string()))?;
            pool.close().await;
        }
    }
    Ok(())
}

fn classify_error(error: sqlx::Error) -> ExecutionError {
    match &error {
        sqlx::Error::Database(db_error) => ExecutionError::Sql(db_error.message().to_string()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => ExecutionError::Connection(error.to_string()),
        _ => ExecutionError::Sql(error.to_string()),
    }
}

async fn fetch_mysql(
    pool: &MySqlPool,
    sql: &str,
    max_rows: usize,
) -> Result<(Vec<String>, Vec<Map<String, Value>>), sqlx::Error> {
    let mut stream = sqlx::query(sql).fetch(pool);
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Map<String, Value>> = Vec::new();

    while let Some(row) = stream.try_next().await? {
        if columns.is_empty() {
            columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        let mut map = Map::new();
        for (index, column) in row.columns().iter().enumerate() {
            map.insert(
                column.name().to_string(),
                mysql_value_to_json(&row, index, column.type_info().name()),
            );
        }
        rows.push(map);
        if rows.len() >= max_rows {
            break;
        }
    }
    Ok((columns, rows))
}

async fn fetch_postgres(
    pool: &PgPool,
    sql: &str,
    max_rows: usize,
) -> Result<(Vec<String>, Vec<Map<String, Value>>), sqlx::Error> {
    let mut stream = sqlx::query(sql).fetch(pool);
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Map<String, Value>> = Vec::new();

    while let Some(row) = stream.try_next().await? {
        if columns.is_empty() {
            columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        let mut map = Map::new();
        for (index, column) in row.columns().iter().enumerate() {
            map.insert(
                column.name().to_string(),
                pg_value_to_json(&row, index, column.type_info().name()),
            );
        }
        rows.push(map);
        if rows.len() >= max_rows {
            break;
        }
    }
    Ok((columns, rows))
}

/// Converts one MySQL column value to JSON, keyed on the driver's declared
/// type name. Unknown types fall back to text, then to null.
fn mysql_value_to_json(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => opt(row.try_get::<Option<bool>, _>(index)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            opt(row.try_get::<Option<i64>, _>(index))
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => opt(row.try_get::<Option<u64>, _>(index)),
        "FLOAT" => opt(row.try_get::<Option<f32>, _>(index).map(|o| o.map(f64::from))),
        "DOUBLE" => opt(row.try_get::<Option<f64>, _>(index)),
        "DECIMAL" => decimal_to_json(row.try_get::<Option<BigDecimal>, _>(index)),
        "DATE" => stringify(row.try_get::<Option<chrono::NaiveDate>, _>(index)),
        "TIME" => stringify(row.try_get::<Option<chrono::NaiveTime>, _>(index)),
        "DATETIME" => stringify(row.try_get::<Option<chrono::NaiveDateTime>, _>(index)),
        "TIMESTAMP" => stringify(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)),
        "JSON" => opt(row.try_get::<Option<Value>, _>(index)),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            Value::String("<blob>".to_string())
        }
        _ => opt(row.try_get::<Option<String>, _>(index)),
    }
}

/// Converts one PostgreSQL column value to JSON, keyed on the driver's
/// declared type name.
fn pg_value_to_json(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(index)),
        "INT2" => opt(row.try_get::<Option<i16>, _>(index).map(|o| o.map(i64::from))),
        "INT4" => opt(row.try_get::<Option<i32>, _>(index).map(|o| o.map(i64::from))),
        "INT8" => opt(row.try_get::<Option<i64>, _>(index)),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(index).map(|o| o.map(f64::from))),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(index)),
        "NUMERIC" => decimal_to_json(row.try_get::<Option<BigDecimal>, _>(index)),
        "DATE" => stringify(row.try_get::<Option<chrono::NaiveDate>, _>(index)),
        "TIME" => stringify(row.try_get::<Option<chrono::NaiveTime>, _>(index)),
        "TIMESTAMP" => stringify(row.try_get::<Option<chrono::NaiveDateTime>, _>(index)),
        "TIMESTAMPTZ" => {
            stringify(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index))
        }
        "JSON" | "JSONB" => opt(row.try_get::<Option<Value>, _>(index)),
        "BYTEA" => Value::String("<blob>".to_string()),
        _ => opt(row.try_get::<Option<String>, _>(index)),
    }
}

fn opt<T: Into<Value>>(result: Result<Option<T>, sqlx::Error>) -> Value {
    match result {
        Ok(Some(value)) => value.into(),
        _ => Value::Null,
    }
}

fn stringify<T: ToString>(result: Result<Option<T>, sqlx::Error>) -> Value {
    match result {
        Ok(Some(value)) => Value::String(value.to_string()),
        _ => Value::Null,
    }
}

/// DECIMAL/NUMERIC render as a JSON number when the value survives an f64
/// round trip, otherwise as a string to avoid silent precision loss.
fn decimal_to_json(result: Result<Option<BigDecimal>, sqlx::Error>) -> Value {
    match result {
        Ok(Some(decimal)) => {
            let text = decimal.to_string();
            match text.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(number) if number.to_string() == text => Value::Number(number),
                _ => Value::String(text),
            }
        }
        _ => Value::Null,
    }
}
