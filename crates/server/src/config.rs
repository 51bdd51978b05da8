//! # Server Configuration
//!
//! Loads the server's configuration from an optional `config.yml` next to
//! the crate, then layers environment variables on top: plain variables for
//! top-level keys (`PORT`, `DB_URL`) and `ASKDB_`-prefixed ones for nested
//! overrides (e.g. `ASKDB_LLM__API_KEY`, `ASKDB_RAG__ENABLED`). The result
//! deserializes into the library's [`AppConfig`] plus the server-only keys.

use askdb::config::AppConfig;
use config::{Config as ConfigBuilder, Environment, File};
use serde::Deserialize;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    General(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// The port to listen on. Loaded from `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path of the local metadata/vector database. Loaded from
    /// `DB_URL`.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// The pipeline configuration (sql/rag/llm/embedding sections).
    #[serde(flatten)]
    pub app: AppConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_db_url() -> String {
    "db/askdb.db".to_string()
}

/// Loads the configuration from a file and environment variables.
pub fn get_config(config_path_override: Option<&str>) -> Result<ServerConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let config_path = match config_path_override {
        Some(path) => path.to_string(),
        None => format!("{}/config.yml", env!("CARGO_MANIFEST_DIR")),
    };
    if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from '{config_path}'.");
        builder = builder.add_source(File::with_name(&config_path));
    } else {
        info!("'{config_path}' not found; using defaults and environment variables.");
    }

    let settings = builder
        // Plain environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Prefixed variables for nested overrides, e.g.
        // ASKDB_LLM__API_KEY or ASKDB_SQL__MAX_RETRIES.
        .add_source(
            Environment::with_prefix("ASKDB")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
