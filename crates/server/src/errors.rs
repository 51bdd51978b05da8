use askdb::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// Maps the library's error taxonomy onto HTTP: input errors become 400,
/// security rejections 403, unknown ids 404, provider failures 502, and
/// everything else 500.
pub enum AppError {
    Pipeline(PipelineError),
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Pipeline(err) => {
                error!("PipelineError: {err:?}");
                let status = match &err {
                    PipelineError::EmptySql | PipelineError::UnsupportedDialect(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    PipelineError::SqlNotReadOnly(_) | PipelineError::ForbiddenKeyword(_) => {
                        StatusCode::FORBIDDEN
                    }
                    PipelineError::UnknownDataSource(_) => StatusCode::NOT_FOUND,
                    PipelineError::LlmRequest(_)
                    | PipelineError::LlmDeserialization(_)
                    | PipelineError::LlmApi(_)
                    | PipelineError::EmbeddingRequest(_)
                    | PipelineError::EmbeddingApi(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(err) => {
                error!("Internal server error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
