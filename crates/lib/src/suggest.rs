//! # Follow-Up Question Suggestions
//!
//! A best-effort LLM call that proposes follow-up questions after a
//! successful turn. The reply parser degrades in stages: JSON array, then
//! list-looking lines, then a fixed generic fallback — the caller always
//! gets something usable.

use crate::{
    analysis::strip_code_fences, errors::PipelineError, prompts::SUGGEST_QUESTIONS_PROMPT,
    providers::ai::AiProvider,
};
use std::sync::Arc;
use tracing::{debug, warn};

const SUGGESTION_TEMPERATURE: f32 = 0.5;

/// Used when the reply yields nothing parseable at all.
pub const FALLBACK_SUGGESTIONS: &[&str] = &[
    "What does the overall trend look like?",
    "Can this be broken down by month?",
    "What explains the outliers?",
];

pub struct SuggestionGenerator {
    llm: Arc<dyn AiProvider>,
}

impl SuggestionGenerator {
    pub fn new(llm: Arc<dyn AiProvider>) -> Self {
        Self { llm }
    }

    /// Proposes follow-up questions for a completed turn.
    pub async fn suggest(
        &self,
        question: &str,
        sql: Option<&str>,
    ) -> Result<Vec<String>, PipelineError> {
        let prompt = SUGGEST_QUESTIONS_PROMPT
            .replace("{question}", question)
            .replace("{sql}", sql.unwrap_or("(no SQL)"));

        let reply = self
            .llm
            .complete(None, &prompt, SUGGESTION_TEMPERATURE)
            .await?;
        debug!("<-- suggestion reply: {reply}");
        Ok(parse_suggestions(&reply))
    }
}

/// Parses a suggestion reply: JSON array first, then line-prefix stripping,
/// then the fixed fallback list.
pub fn parse_suggestions(reply: &str) -> Vec<String> {
    let cleaned = strip_code_fences(reply);
    if let Ok(list) = serde_json::from_str::<Vec<String>>(&cleaned) {
        let list: Vec<String> = list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !list.is_empty() {
            return list;
        }
    }

    warn!("suggestion reply was not a JSON array; stripping list prefixes");
    let mut suggestions = Vec::new();
    for line in reply.lines() {
        let line = line.trim();
        let stripped = if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('*'))
        {
            rest.trim()
        } else if line.starts_with(|c: char| c.is_ascii_digit()) {
            line.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
        } else {
            continue;
        };
        if !stripped.is_empty() {
            suggestions.push(stripped.to_string());
        }
    }

    if suggestions.is_empty() {
        FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        suggestions
    }
}
