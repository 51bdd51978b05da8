pub mod admin;
pub mod chat;
pub mod datasource;
pub mod knowledge;

use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> &'static str {
    "askdb server"
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
