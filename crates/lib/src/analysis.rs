//! # Result Analysis
//!
//! A post-hoc, best-effort LLM call that summarizes the result set and
//! recommends a chart. It runs only after a successful execution, over a
//! bounded sample of rows, and its failure never fails the pipeline — the
//! orchestrator catches errors and leaves the analysis fields absent.

use crate::{errors::PipelineError, prompts::DATA_ANALYSIS_PROMPT, providers::ai::AiProvider};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// How many result rows are shown to the model.
pub const ANALYSIS_SAMPLE_ROWS: usize = 20;

const ANALYSIS_TEMPERATURE: f32 = 0.3;

/// The analyzer's structured output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub insight: String,
    #[serde(default = "default_chart_type")]
    pub chart_type: String,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
}

fn default_chart_type() -> String {
    "Table".to_string()
}

pub struct ResultAnalyzer {
    llm: Arc<dyn AiProvider>,
}

impl ResultAnalyzer {
    pub fn new(llm: Arc<dyn AiProvider>) -> Self {
        Self { llm }
    }

    /// Summarizes the result set and recommends a visualization.
    pub async fn analyze(
        &self,
        question: &str,
        sql: &str,
        rows: &[Map<String, Value>],
    ) -> Result<AnalysisResult, PipelineError> {
        if rows.is_empty() {
            return Ok(AnalysisResult {
                insight: "The query returned no rows; there is nothing to analyze.".to_string(),
                chart_type: default_chart_type(),
                x_axis: None,
                y_axis: None,
            });
        }

        let sample = &rows[..rows.len().min(ANALYSIS_SAMPLE_ROWS)];
        let data = serde_json::to_string(sample)?;
        let prompt = DATA_ANALYSIS_PROMPT
            .replace("{question}", question)
            .replace("{sql}", sql)
            .replace("{data}", &data);

        let reply = self.llm.complete(None, &prompt, ANALYSIS_TEMPERATURE).await?;
        debug!("<-- analysis reply: {reply}");
        Ok(parse_analysis_reply(&reply))
    }
}

/// Parses the analyzer's JSON reply, falling back to the raw reply as the
/// insight with a plain table recommendation.
pub fn parse_analysis_reply(reply: &str) -> AnalysisResult {
    let cleaned = strip_code_fences(reply);
    match serde_json::from_str::<AnalysisResult>(&cleaned) {
        Ok(result) => result,
        Err(error) => {
            warn!(error = %error, "analysis reply was not valid JSON; using it verbatim");
            AnalysisResult {
                insight: reply.trim().to_string(),
                chart_type: default_chart_type(),
                x_axis: None,
                y_axis: None,
            }
        }
    }
}

/// Drops markdown code fences from a reply, leaving its body.
pub(crate) fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}
