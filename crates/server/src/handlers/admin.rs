//! # Runtime Configuration Handlers
//!
//! Reads the current configuration snapshot and publishes replacements.
//! Publishing swaps in a whole new immutable snapshot: in-flight chat turns
//! keep the configuration they started with, and the LLM backend factory
//! re-runs once for the new version.

use crate::{errors::AppError, state::AppState};
use askdb::config::AppConfig;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

pub async fn get_config(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let snapshot = state.config.snapshot().await;
    Ok(Json(json!({
        "version": snapshot.version,
        "config": &*snapshot.config,
    })))
}

pub async fn put_config(
    State(state): State<AppState>,
    Json(payload): Json<AppConfig>,
) -> Result<Json<Value>, AppError> {
    let version = state.config.publish(payload).await;
    info!(version, "published new runtime configuration");
    Ok(Json(json!({ "version": version })))
}
