//! # Row-Level Permission Rewrite
//!
//! Injects a caller-scoped filter predicate into already-validated SQL by
//! asking the LLM to rewrite the statement. The rewrite is best-effort: on
//! any failure (LLM error, no SQL in the reply) the original statement is
//! used and the fallback is logged as a policy-relevant event.

use crate::{
    generate::extract_fenced_sql,
    prompts::PERMISSION_REWRITE_PROMPT,
    providers::ai::AiProvider,
    types::SqlDialect,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const REWRITE_TEMPERATURE: f32 = 0.1;

pub struct PermissionRewriter {
    llm: Arc<dyn AiProvider>,
}

impl PermissionRewriter {
    pub fn new(llm: Arc<dyn AiProvider>) -> Self {
        Self { llm }
    }

    /// Applies a row-level filter predicate to a validated statement.
    ///
    /// A blank predicate is a no-op without an LLM call.
    pub async fn apply_permission(
        &self,
        sql: &str,
        dialect: SqlDialect,
        filter_predicate: &str,
    ) -> String {
        if filter_predicate.trim().is_empty() {
            return sql.to_string();
        }

        info!(rule = %filter_predicate, "applying row-level permission rewrite");
        let prompt = PERMISSION_REWRITE_PROMPT
            .replace("{sql}", sql)
            .replace("{engine}", dialect.as_str())
            .replace("{filter}", filter_predicate);

        match self.llm.complete(None, &prompt, REWRITE_TEMPERATURE).await {
            Ok(reply) => {
                debug!("<-- permission rewrite reply: {reply}");
                match extract_rewritten_sql(&reply) {
                    Some(rewritten) => rewritten,
                    None => {
                        warn!(
                            "permission rewrite reply contained no SQL; \
                             keeping the original statement"
                        );
                        sql.to_string()
                    }
                }
            }
            Err(error) => {
                warn!(error = %error,
                    "permission rewrite failed; keeping the original statement");
                sql.to_string()
            }
        }
    }
}

/// Fenced-block extraction first, then a bare SELECT.
fn extract_rewritten_sql(reply: &str) -> Option<String> {
    if let Some(sql) = extract_fenced_sql(reply) {
        return Some(sql);
    }
    let trimmed = reply.trim();
    trimmed
        .to_uppercase()
        .starts_with("SELECT")
        .then(|| trimmed.to_string())
}
