//! # The Retry Orchestrator
//!
//! The pipeline's control loop. One run drives
//! `Generating → Executing → {Succeeded | Retrying | ExhaustedFailure |
//! GenerationFailure}`: generation failures are terminal (a missing
//! statement means "cannot answer", not a transient error), execution
//! failures feed an error note back into the next attempt's history, and
//! the attempt count is bounded by the configuration snapshot taken when
//! the run started. After a success, result analysis and follow-up
//! suggestions run once each, best-effort.

use crate::{
    analysis::{AnalysisResult, ResultAnalyzer},
    config::{ConfigHandle, ConfigSnapshot},
    context::build_history_context,
    errors::PipelineError,
    execute::QueryExecutor,
    generate::SqlGenerator,
    permission::PermissionRewriter,
    providers::{
        ai::AiProvider,
        db::storage::{DataSourceStore, GlossaryStore},
        factory::create_llm_provider,
    },
    retrieval::RetrievalEngine,
    suggest::SuggestionGenerator,
    types::{ExecutionOutcome, HistoryTurn},
    validate::validate_sql,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The terminal state of one chat turn.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Execution succeeded on attempt `attempt` (0-based).
    Succeeded {
        attempt: u32,
        sql: String,
        explanation: String,
        outcome: ExecutionOutcome,
        analysis: Option<AnalysisResult>,
        suggestions: Vec<String>,
    },
    /// The model produced no usable SQL; the turn ends with the model's own
    /// explanation. Not retried.
    GenerationFailure { explanation: String },
    /// Every attempt failed to execute; carries the last SQL and error.
    ExhaustedFailure {
        attempts: u32,
        sql: String,
        error: String,
    },
}

impl PipelineOutcome {
    /// The user-facing message for this outcome. Never empty.
    pub fn content(&self) -> String {
        match self {
            Self::Succeeded { explanation, .. } => {
                if explanation.trim().is_empty() {
                    "The query executed successfully.".to_string()
                } else {
                    explanation.clone()
                }
            }
            Self::GenerationFailure { explanation } => {
                if explanation.trim().is_empty() {
                    "I could not produce a SQL query for that question; \
                     try rephrasing it."
                        .to_string()
                } else {
                    explanation.clone()
                }
            }
            Self::ExhaustedFailure { sql, error, .. } => {
                format!("SQL execution failed: {error}\n\nGenerated SQL:\n```sql\n{sql}\n```")
            }
        }
    }
}

/// The assembled pipeline. Holds every collaborator a run needs; the LLM
/// backend is rebuilt lazily whenever the configuration snapshot's version
/// changes (once per configuration change, never per call).
pub struct ChatPipeline {
    config: ConfigHandle,
    retrieval: Arc<RetrievalEngine>,
    glossary: Arc<dyn GlossaryStore>,
    data_sources: Arc<dyn DataSourceStore>,
    executor: Arc<dyn QueryExecutor>,
    llm_cache: Mutex<Option<(u64, Arc<dyn AiProvider>)>>,
    llm_override: Option<Arc<dyn AiProvider>>,
}

impl ChatPipeline {
    pub fn new(
        config: ConfigHandle,
        retrieval: Arc<RetrievalEngine>,
        glossary: Arc<dyn GlossaryStore>,
        data_sources: Arc<dyn DataSourceStore>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            config,
            retrieval,
            glossary,
            data_sources,
            executor,
            llm_cache: Mutex::new(None),
            llm_override: None,
        }
    }

    /// Pins a fixed LLM backend, bypassing the factory. For tests.
    pub fn with_llm(mut self, llm: Arc<dyn AiProvider>) -> Self {
        self.llm_override = Some(llm);
        self
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    async fn llm_for(
        &self,
        snapshot: &ConfigSnapshot,
    ) -> Result<Arc<dyn AiProvider>, PipelineError> {
        if let Some(provider) = &self.llm_override {
            return Ok(provider.clone());
        }
        let mut cache = self.llm_cache.lock().await;
        if let Some((version, provider)) = cache.as_ref() {
            if *version == snapshot.version {
                return Ok(provider.clone());
            }
        }
        let provider: Arc<dyn AiProvider> =
            Arc::from(create_llm_provider(&snapshot.config.llm)?);
        *cache = Some((snapshot.version, provider.clone()));
        Ok(provider)
    }

    /// Runs one full chat turn.
    ///
    /// `history` is the prior conversation (the current question excluded);
    /// `permission_predicate` is the caller's row-level filter, if any.
    pub async fn run(
        &self,
        question: &str,
        data_source_id: i64,
        history: &[HistoryTurn],
        permission_predicate: Option<&str>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let snapshot = self.config.snapshot().await;
        let config = snapshot.config.clone();
        let llm = self.llm_for(&snapshot).await?;

        let dialect = self
            .data_sources
            .get(data_source_id)
            .await?
            .ok_or(PipelineError::UnknownDataSource(data_source_id))?
            .dialect;

        let generator = SqlGenerator::new(llm.clone(), self.retrieval.clone(), self.glossary.clone());
        let rewriter = PermissionRewriter::new(llm.clone());
        let analyzer = ResultAnalyzer::new(llm.clone());
        let suggester = SuggestionGenerator::new(llm);

        let base_history = build_history_context(history);
        let mut working_history = base_history.clone();
        let max_retries = config.sql.max_retries.max(1);
        let mut attempt: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            if attempt > 0 {
                let error = last_error.as_deref().unwrap_or_default();
                info!(attempt, error = %error,
                    "retrying SQL generation with execution feedback");
                working_history = format!(
                    "{base_history}\n\n[System Error]: the previous SQL failed to execute \
                     with: {error}\nCorrect the SQL based on the error message."
                );
            }

            // Generating
            let candidate = generator
                .generate(question, data_source_id, &working_history, &config)
                .await?;

            let Some(sql) = candidate.sql.filter(|s| !s.trim().is_empty()) else {
                info!("generator produced no usable SQL; ending the turn");
                return Ok(PipelineOutcome::GenerationFailure {
                    explanation: candidate.explanation,
                });
            };

            // Mandatory read-only gate. Security violations are category
            // errors and terminate the turn without a retry.
            validate_sql(&sql, config.sql.read_only)?;

            // Best-effort row-level permission rewrite.
            let final_sql = match permission_predicate {
                Some(predicate) if !predicate.trim().is_empty() => {
                    rewriter.apply_permission(&sql, dialect, predicate).await
                }
                _ => sql,
            };

            // Executing
            let outcome = self
                .executor
                .execute(&final_sql, data_source_id, &config.sql)
                .await?;

            if outcome.success {
                let analysis = match analyzer.analyze(question, &final_sql, &outcome.rows).await {
                    Ok(result) => Some(result),
                    Err(error) => {
                        warn!(error = %error,
                            "result analysis failed; continuing without insight");
                        None
                    }
                };
                let suggestions = match suggester.suggest(question, Some(&final_sql)).await {
                    Ok(list) => list,
                    Err(error) => {
                        warn!(error = %error,
                            "suggestion generation failed; continuing without suggestions");
                        Vec::new()
                    }
                };
                return Ok(PipelineOutcome::Succeeded {
                    attempt,
                    sql: final_sql,
                    explanation: candidate.explanation,
                    outcome,
                    analysis,
                    suggestions,
                });
            }

            let message = outcome
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown execution error".to_string());

            if attempt + 1 >= max_retries {
                info!(attempts = attempt + 1, "retry budget exhausted");
                return Ok(PipelineOutcome::ExhaustedFailure {
                    attempts: attempt + 1,
                    sql: final_sql,
                    error: message,
                });
            }

            last_error = Some(message);
            attempt += 1;
        }
    }
}
