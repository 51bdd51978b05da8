use thiserror::Error;

/// Custom error types for the pipeline.
///
/// Variants group into the taxonomy the orchestrator cares about: input
/// errors and security errors are terminal and never retried, provider
/// errors surface from the LLM/embedding boundary, and store errors come
/// from the local metadata or vector databases.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("LLM request failed: {0}")]
    LlmRequest(reqwest::Error),
    #[error("Failed to deserialize LLM response: {0}")]
    LlmDeserialization(reqwest::Error),
    #[error("LLM API returned an error: {0}")]
    LlmApi(String),
    #[error("Embedding request failed: {0}")]
    EmbeddingRequest(reqwest::Error),
    #[error("Embedding API returned an empty or malformed payload: {0}")]
    EmbeddingApi(String),
    #[error("API key is missing")]
    MissingApiKey,
    #[error("SQL must not be empty")]
    EmptySql,
    #[error("only SELECT statements may be executed, got: {0}")]
    SqlNotReadOnly(String),
    #[error("SQL contains a forbidden keyword: {0}")]
    ForbiddenKeyword(String),
    #[error("data source {0} not found")]
    UnknownDataSource(i64),
    #[error("unsupported SQL dialect: {0}")]
    UnsupportedDialect(String),
    #[error("embedding dimension mismatch: index stores {expected}, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },
    #[error("vector store error: {0}")]
    VectorStore(#[from] turso::Error),
    #[error("metadata store error: {0}")]
    Store(String),
    #[error("schema extraction failed: {0}")]
    SchemaExtraction(String),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// True for read-only policy violations. These are category errors:
    /// retrying generation cannot fix them, so the orchestrator treats them
    /// as terminal for the turn.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::SqlNotReadOnly(_) | Self::ForbiddenKeyword(_))
    }
}
