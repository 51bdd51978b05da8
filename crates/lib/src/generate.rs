//! # SQL Generation
//!
//! Drives context assembly and the LLM call, then parses the reply with a
//! two-tier strategy: a structured JSON object first (tolerating fenced
//! wrappers), then fenced ```sql block extraction, then a bare statement
//! beginning with SELECT truncated at its first terminator. The result is a
//! tagged [`ParsedReply`] rather than exception-driven control flow.

use crate::{
    config::AppConfig,
    context::{build_glossary_context, GenerationContext},
    errors::PipelineError,
    prompts::{SQL_GENERATION_SYSTEM_PROMPT, SQL_GENERATION_USER_PROMPT},
    providers::{ai::AiProvider, db::storage::GlossaryStore},
    retrieval::{build_examples_context, build_schema_context, RetrievalEngine,
        RAG_DISABLED_PLACEHOLDER},
    types::SqlCandidate,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// The outcome of parsing one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Parsed { sql: String, explanation: String },
    Unparsed { explanation: String },
}

pub struct SqlGenerator {
    llm: Arc<dyn AiProvider>,
    retrieval: Arc<RetrievalEngine>,
    glossary: Arc<dyn GlossaryStore>,
}

impl SqlGenerator {
    pub fn new(
        llm: Arc<dyn AiProvider>,
        retrieval: Arc<RetrievalEngine>,
        glossary: Arc<dyn GlossaryStore>,
    ) -> Self {
        Self {
            llm,
            retrieval,
            glossary,
        }
    }

    /// Generates one SQL candidate for a question.
    ///
    /// `history` is the already-rendered working history; the orchestrator
    /// appends execution-error notes to it between attempts.
    pub async fn generate(
        &self,
        question: &str,
        data_source_id: i64,
        history: &str,
        config: &AppConfig,
    ) -> Result<SqlCandidate, PipelineError> {
        info!(data_source_id, question = %question, "generating SQL");

        let (schema_context, examples_context) = if config.rag.enabled {
            let schema_docs = self
                .retrieval
                .retrieve_schema(question, data_source_id, &config.rag)
                .await?;
            let example_docs = self
                .retrieval
                .retrieve_examples(question, data_source_id, &config.rag)
                .await?;
            (
                build_schema_context(&schema_docs),
                build_examples_context(&example_docs),
            )
        } else {
            debug!("retrieval disabled by configuration; using placeholder context");
            (
                RAG_DISABLED_PLACEHOLDER.to_string(),
                RAG_DISABLED_PLACEHOLDER.to_string(),
            )
        };

        let terms = self.glossary.terms_for(data_source_id).await?;
        let context = GenerationContext {
            schema_context,
            glossary_context: build_glossary_context(&terms),
            examples_context,
            chat_history: history.to_string(),
            question: question.to_string(),
        };

        let user_prompt = context.render(SQL_GENERATION_USER_PROMPT);
        debug!(system_prompt = SQL_GENERATION_SYSTEM_PROMPT, user_prompt = %user_prompt,
            "--> Sending generation prompt");

        let reply = self
            .llm
            .complete(
                Some(SQL_GENERATION_SYSTEM_PROMPT),
                &user_prompt,
                config.llm.temperature,
            )
            .await?;
        debug!("<-- generation reply: {reply}");

        Ok(match parse_generation_reply(&reply) {
            ParsedReply::Parsed { sql, explanation } => SqlCandidate {
                sql: Some(sql),
                explanation,
                success: true,
            },
            ParsedReply::Unparsed { explanation } => SqlCandidate {
                sql: None,
                explanation,
                success: false,
            },
        })
    }
}

#[derive(Deserialize, Debug)]
struct GenerationReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    brief: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parses a model reply into SQL and an explanation.
///
/// Tier one is the structured contract (`success`/`sql`/`brief` or
/// `message`); tier two is fenced-block and bare-statement extraction for
/// replies that ignore the contract.
pub fn parse_generation_reply(reply: &str) -> ParsedReply {
    let mut sql: Option<String> = None;
    let mut explanation = reply.trim().to_string();

    if let Some(json) = extract_json_object(reply) {
        if let Ok(parsed) = serde_json::from_str::<GenerationReply>(&json) {
            if parsed.success {
                sql = parsed
                    .sql
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                if let Some(brief) = parsed.brief.filter(|b| !b.trim().is_empty()) {
                    explanation = brief;
                }
            } else if let Some(message) = parsed.message.filter(|m| !m.trim().is_empty()) {
                explanation = message;
            }
        }
    }

    let sql = sql.or_else(|| extract_sql_statement(reply));
    match sql {
        Some(sql) => ParsedReply::Parsed { sql, explanation },
        None => ParsedReply::Unparsed { explanation },
    }
}

/// Pulls a JSON object out of a reply that may wrap it in a fenced code
/// block or surround it with prose.
fn extract_json_object(reply: &str) -> Option<String> {
    let trimmed = reply.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.rfind("```") {
            return Some(rest[..end].trim().to_string());
        }
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(end) = rest.rfind("```") {
            return Some(rest[..end].trim().to_string());
        }
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| reply[start..=end].to_string())
}

/// Extracts the contents of a ```sql fenced block.
pub(crate) fn extract_fenced_sql(reply: &str) -> Option<String> {
    let re = Regex::new(r"(?i)```sql\s*([\s\S]+?)\s*```").ok()?;
    re.captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Fallback extraction: a fenced block, or a bare statement beginning with
/// SELECT, truncated at its first terminator.
fn extract_sql_statement(reply: &str) -> Option<String> {
    if let Some(sql) = extract_fenced_sql(reply) {
        return Some(sql);
    }
    let trimmed = reply.trim();
    if trimmed.to_uppercase().starts_with("SELECT") {
        return Some(match trimmed.find(';') {
            Some(index) => trimmed[..=index].trim().to_string(),
            None => trimmed.to_string(),
        });
    }
    None
}
