//! # Data Source Handlers
//!
//! CRUD over registered data sources, connection testing, and the
//! background schema sync with its pollable progress record.

use crate::{errors::AppError, state::AppState};
use askdb::{
    execute::test_connection,
    providers::db::storage::DataSourceStore,
    sync::{SchemaSyncService, SyncProgress},
    types::{DataSource, NewDataSource},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<DataSource>>, AppError> {
    Ok(Json(state.store.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DataSource>, AppError> {
    let source = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("data source {id} not found")))?;
    Ok(Json(source))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewDataSource>,
) -> Result<Json<DataSource>, AppError> {
    Ok(Json(state.store.create(payload).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<NewDataSource>,
) -> Result<Json<Value>, AppError> {
    if state.store.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("data source {id} not found")));
    }
    state.store.update(id, payload).await?;
    // Connection settings may have changed; the next query rebuilds the
    // pool.
    state.executor.invalidate_pool(id).await;
    Ok(Json(json!({ "updated": id })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.store.delete(id).await?;
    state.executor.invalidate_pool(id).await;
    Ok(Json(json!({ "deleted": id })))
}

/// Tests connectivity for a registered data source.
pub async fn test(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let source = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("data source {id} not found")))?;
    Ok(Json(connection_report(&source).await))
}

/// Tests connectivity for settings that have not been saved yet.
pub async fn test_ad_hoc(
    Json(payload): Json<NewDataSource>,
) -> Result<Json<Value>, AppError> {
    let source = DataSource {
        id: 0,
        name: payload.name,
        description: payload.description,
        dialect: payload.dialect,
        host: payload.host,
        port: payload.port,
        db_name: payload.db_name,
        username: payload.username,
        password: payload.password,
        schema_synced_at: None,
    };
    Ok(Json(connection_report(&source).await))
}

async fn connection_report(source: &DataSource) -> Value {
    match test_connection(source).await {
        Ok(()) => json!({ "success": true, "message": "connection ok" }),
        Err(error) => json!({ "success": false, "message": error.to_string() }),
    }
}

/// Kicks off a background schema sync and returns immediately; progress is
/// polled through [`sync_progress`].
pub async fn sync_schema(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let source = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("data source {id} not found")))?;
    SchemaSyncService::spawn_sync(state.sync.clone(), source);
    Ok(Json(json!({ "started": id })))
}

pub async fn sync_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SyncProgress>, AppError> {
    state
        .sync
        .progress()
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no sync has run for data source {id}")))
}
