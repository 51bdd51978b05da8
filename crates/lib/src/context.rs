//! # Generation Context Assembly
//!
//! Deterministic string assembly for the generation prompt: no network, no
//! randomness, a pure function of its inputs. Retrieval results, glossary
//! terms, and conversation history are rendered here; the prompt templates
//! live in [`crate::prompts`].

use crate::types::{HistoryTurn, TermEntry};

/// How many trailing conversation turns are kept in the prompt.
pub const HISTORY_WINDOW: usize = 6;

pub const NO_HISTORY_PLACEHOLDER: &str = "(no prior conversation)";
pub const NO_GLOSSARY_PLACEHOLDER: &str = "(no domain-specific terms)";

/// Fully assembled inputs for one generation attempt.
///
/// Rebuilt for every retry so the error note appended to the working
/// history reaches the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    pub schema_context: String,
    pub glossary_context: String,
    pub examples_context: String,
    pub chat_history: String,
    pub question: String,
}

impl GenerationContext {
    /// Fills a prompt template's placeholders from this context.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{schema_context}", &self.schema_context)
            .replace("{term_glossary}", &self.glossary_context)
            .replace("{sql_examples}", &self.examples_context)
            .replace("{chat_history}", &self.chat_history)
            .replace("{question}", &self.question)
    }
}

/// Renders glossary terms one line per term. Global terms are expected to
/// already be merged into the slice by the store lookup.
pub fn build_glossary_context(terms: &[TermEntry]) -> String {
    if terms.is_empty() {
        return NO_GLOSSARY_PLACEHOLDER.to_string();
    }
    terms
        .iter()
        .map(|t| format!("- {}: {}", t.term, t.definition))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the trailing conversation history, oldest first, each turn
/// prefixed by its speaker.
pub fn build_history_context(turns: &[HistoryTurn]) -> String {
    if turns.is_empty() {
        return NO_HISTORY_PLACEHOLDER.to_string();
    }
    let start = turns.len().saturating_sub(HISTORY_WINDOW);
    turns[start..]
        .iter()
        .map(|t| format!("{} {}", t.role.history_prefix(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}
