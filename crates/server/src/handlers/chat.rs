//! # Chat Handlers
//!
//! Session CRUD and the core chat turn: load history, run the pipeline,
//! persist both sides of the exchange with the audit fields, and auto-title
//! the session on first use.

use crate::{errors::AppError, state::AppState};
use askdb::{
    pipeline::PipelineOutcome,
    providers::db::storage::SessionStore,
    types::{ChatMessage, ChatSession, HistoryTurn, NewChatMessage},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

const DEFAULT_SESSION_TITLE: &str = "New chat";
const TITLE_MAX_CHARS: usize = 30;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub data_source_id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatTurnRequest {
    pub question: String,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<ChatSession>, AppError> {
    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
    let session = state
        .store
        .create_session(payload.data_source_id, &title)
        .await?;
    Ok(Json(session))
}

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatSession>>, AppError> {
    Ok(Json(state.store.list_sessions().await?))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    Ok(Json(state.store.messages(session_id).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.delete_session(session_id).await?;
    Ok(Json(serde_json::json!({ "deleted": session_id })))
}

/// The core chat turn.
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(payload): Json<ChatTurnRequest>,
) -> Result<Json<ChatMessage>, AppError> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::BadRequest("question must not be empty".to_string()));
    }

    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {session_id} not found")))?;

    state
        .store
        .append_message(NewChatMessage::user(session.id, &question))
        .await?;

    // History excludes the just-appended user turn; the pipeline carries
    // the current question separately.
    let records = state.store.messages(session.id).await?;
    let history: Vec<HistoryTurn> = records
        .iter()
        .take(records.len().saturating_sub(1))
        .map(|m| HistoryTurn {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();

    let permission_predicate = resolve_permission_rule();

    let assistant = match state
        .pipeline
        .run(
            &question,
            session.data_source_id,
            &history,
            permission_predicate.as_deref(),
        )
        .await
    {
        Ok(outcome) => assistant_message(session.id, &outcome)?,
        // Security rejections still leave an auditable assistant message
        // instead of a bare error response.
        Err(error) if error.is_security() => {
            let mut message = NewChatMessage::assistant(
                session.id,
                &format!("The safety policy rejected the generated SQL: {error}"),
            );
            message.error = Some(error.to_string());
            message
        }
        Err(error) => return Err(error.into()),
    };

    let saved = state.store.append_message(assistant).await?;

    if session.title == DEFAULT_SESSION_TITLE {
        let title = truncate_title(&question);
        info!(session_id, title = %title, "auto-titling session from first question");
        state.store.rename_session(session.id, &title).await?;
    }

    Ok(Json(saved))
}

fn assistant_message(
    session_id: i64,
    outcome: &PipelineOutcome,
) -> Result<NewChatMessage, AppError> {
    let mut message = NewChatMessage::assistant(session_id, &outcome.content());
    match outcome {
        PipelineOutcome::Succeeded {
            sql,
            outcome: execution,
            analysis,
            suggestions,
            ..
        } => {
            message.sql_query = Some(sql.clone());
            message.sql_result =
                Some(serde_json::to_string(execution).map_err(askdb::PipelineError::from)?);
            if let Some(analysis) = analysis {
                message.analysis = Some(analysis.insight.clone());
                message.chart_type = Some(analysis.chart_type.clone());
                message.x_axis = analysis.x_axis.clone();
                message.y_axis = analysis.y_axis.clone();
            }
            if !suggestions.is_empty() {
                message.suggestions =
                    Some(serde_json::to_string(suggestions).map_err(askdb::PipelineError::from)?);
            }
        }
        PipelineOutcome::GenerationFailure { .. } => {}
        PipelineOutcome::ExhaustedFailure { sql, error, .. } => {
            message.sql_query = Some(sql.clone());
            message.error = Some(error.clone());
        }
    }
    Ok(message)
}

/// The hook for the caller's row-level permission predicate.
///
/// An authorization layer would derive a filter such as `dept_id = 1001`
/// from the authenticated caller here; without one, every caller runs
/// unfiltered.
fn resolve_permission_rule() -> Option<String> {
    None
}

fn truncate_title(question: &str) -> String {
    if question.chars().count() <= TITLE_MAX_CHARS {
        question.to_string()
    } else {
        let truncated: String = question.chars().take(TITLE_MAX_CHARS).collect();
        format!("{truncated}...")
    }
}
