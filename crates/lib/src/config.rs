//! # Runtime Configuration
//!
//! Every knob the pipeline reads lives in an immutable [`AppConfig`]
//! snapshot. The server publishes replacements through a [`ConfigHandle`];
//! a pipeline run takes one snapshot when it starts and is never affected
//! by a concurrent update. Snapshots carry a version number so components
//! that derive state from the configuration (the LLM backend factory) can
//! rebuild once per change instead of once per call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The root configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub sql: SqlConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Execution limits and the read-only policy switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    /// When true (the default), only SELECT statements reach execution.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    /// Hard cap on materialized result rows.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Per-query timeout at the executor boundary.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Total generate-validate-execute attempts per turn.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            read_only: default_read_only(),
            max_rows: default_max_rows(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_read_only() -> bool {
    true
}
fn default_max_rows() -> usize {
    1000
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

/// Retrieval behavior. Disabling retrieval is a documented degraded mode:
/// generation proceeds with placeholder context instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_rag_enabled")]
    pub enabled: bool,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Minimum cosine similarity for a document to be returned.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: default_rag_enabled(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_rag_enabled() -> bool {
    true
}
fn default_top_k() -> u32 {
    5
}
fn default_similarity_threshold() -> f64 {
    0.5
}

/// Chat-completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Maps display aliases (e.g. "DeepSeek") to concrete model
    /// identifiers (e.g. "deepseek-chat").
    #[serde(default = "default_model_map")]
    pub model_map: HashMap<String, String>,
    /// The alias (or concrete name) of the model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_map: default_model_map(),
            default_model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Resolves a model alias to a concrete model identifier. An unmapped
    /// alias passes through verbatim.
    pub fn resolve_model(&self, alias: &str) -> String {
        self.model_map
            .get(alias)
            .cloned()
            .unwrap_or_else(|| alias.to_string())
    }

    /// The concrete model identifier for the configured default.
    pub fn resolved_default_model(&self) -> String {
        self.resolve_model(&self.default_model)
    }
}

fn default_model_map() -> HashMap<String, String> {
    HashMap::from([
        ("DeepSeek".to_string(), "deepseek-chat".to_string()),
        ("GPT-3.5".to_string(), "gpt-3.5-turbo".to_string()),
        ("GPT-4".to_string(), "gpt-4-turbo".to_string()),
    ])
}
fn default_model() -> String {
    "DeepSeek".to_string()
}
fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}
fn default_temperature() -> f32 {
    0.1
}

/// Embedding backend settings.
///
/// `dimensions` is fixed per deployment: the vector index stores vectors of
/// exactly this width, so it is read once at startup and not affected by
/// runtime config updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_api_url")]
    pub api_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_api_url(),
            model: default_embedding_model(),
            api_key: None,
            dimensions: default_dimensions(),
        }
    }
}

fn default_embedding_api_url() -> String {
    "https://open.bigmodel.cn/api/paas/v4/embeddings".to_string()
}
fn default_embedding_model() -> String {
    "embedding-3".to_string()
}
fn default_dimensions() -> usize {
    1024
}

/// A versioned configuration snapshot.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub config: Arc<AppConfig>,
}

/// Hands out immutable configuration snapshots and publishes replacements.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<ConfigSnapshot>>,
}

impl ConfigHandle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConfigSnapshot {
                version: 0,
                config: Arc::new(config),
            })),
        }
    }

    /// The current snapshot. Cheap to call; the returned `Arc` stays valid
    /// for the caller's whole run regardless of later updates.
    pub async fn snapshot(&self) -> ConfigSnapshot {
        self.inner.read().await.clone()
    }

    /// Publishes a new configuration, returning the new version number.
    /// In-flight runs keep the snapshot they started with.
    pub async fn publish(&self, config: AppConfig) -> u64 {
        let mut guard = self.inner.write().await;
        let version = guard.version + 1;
        *guard = ConfigSnapshot {
            version,
            config: Arc::new(config),
        };
        version
    }
}
