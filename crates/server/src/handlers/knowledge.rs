//! # Knowledge Base Handlers
//!
//! Glossary terms and saved Q→SQL examples. Saving an example re-indexes
//! it into the vector store so future questions can retrieve it as
//! few-shot grounding.
//!
//! The metadata store implements several store traits with same-named
//! methods, so calls here are trait-qualified.

use crate::{errors::AppError, state::AppState};
use askdb::providers::db::storage::{ExampleStore, GlossaryStore};
use askdb::types::{SqlExampleRecord, TermEntry};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct ScopeQuery {
    #[serde(default)]
    pub data_source_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateTermRequest {
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub data_source_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateExampleRequest {
    pub question: String,
    pub sql: String,
    pub data_source_id: i64,
}

pub async fn list_terms(
    State(state): State<AppState>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<TermEntry>>, AppError> {
    let terms = GlossaryStore::list(&*state.store, scope.data_source_id).await?;
    Ok(Json(terms))
}

pub async fn create_term(
    State(state): State<AppState>,
    Json(payload): Json<CreateTermRequest>,
) -> Result<Json<TermEntry>, AppError> {
    let term = GlossaryStore::create(
        &*state.store,
        &payload.term,
        &payload.definition,
        payload.data_source_id,
    )
    .await?;
    Ok(Json(term))
}

pub async fn delete_term(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    GlossaryStore::delete(&*state.store, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn list_examples(
    State(state): State<AppState>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<SqlExampleRecord>>, AppError> {
    let examples = ExampleStore::list(&*state.store, scope.data_source_id).await?;
    Ok(Json(examples))
}

pub async fn create_example(
    State(state): State<AppState>,
    Json(payload): Json<CreateExampleRequest>,
) -> Result<Json<SqlExampleRecord>, AppError> {
    let example = ExampleStore::save(
        &*state.store,
        &payload.question,
        &payload.sql,
        payload.data_source_id,
    )
    .await?;
    // Re-index on save so the example is retrievable immediately.
    state.retrieval.index_example(&example).await?;
    Ok(Json(example))
}

pub async fn delete_example(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    ExampleStore::delete(&*state.store, id).await?;
    Ok(Json(json!({ "deleted": id })))
}
