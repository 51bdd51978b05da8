//! # Server Configuration Tests
//!
//! Layered loading: defaults with no file, a yaml file filling the nested
//! pipeline sections, and partial files falling back per key.

use askdb_server::config::get_config;
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yml")
        .tempfile()
        .expect("temp config file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn missing_file_yields_defaults() {
    let config = get_config(Some("/nonexistent/config.yml")).expect("defaults load");
    assert_eq!(config.port, 9090);
    assert_eq!(config.db_url, "db/askdb.db");
    assert!(config.app.sql.read_only);
    assert_eq!(config.app.sql.max_retries, 3);
    assert!(config.app.rag.enabled);
    assert_eq!(config.app.embedding.dimensions, 1024);
}

#[test]
fn yaml_file_fills_nested_sections() {
    let file = config_file(
        r#"
port: 8123
db_url: /tmp/test-askdb.db
sql:
  max_rows: 50
  max_retries: 5
rag:
  enabled: false
  similarity_threshold: 0.3
llm:
  default_model: glm-4-flash
  api_key: test-key
  base_url: https://open.bigmodel.cn/api/paas/v4
embedding:
  api_key: test-key
  dimensions: 512
"#,
    );

    let config = get_config(Some(file.path().to_str().unwrap())).expect("config loads");
    assert_eq!(config.port, 8123);
    assert_eq!(config.db_url, "/tmp/test-askdb.db");
    assert_eq!(config.app.sql.max_rows, 50);
    assert_eq!(config.app.sql.max_retries, 5);
    // Unset keys keep their defaults.
    assert!(config.app.sql.read_only);
    assert!(!config.app.rag.enabled);
    assert_eq!(config.app.rag.similarity_threshold, 0.3);
    assert_eq!(config.app.llm.default_model, "glm-4-flash");
    assert_eq!(config.app.embedding.dimensions, 512);
}

#[test]
fn model_alias_map_survives_the_round_trip() {
    // The config loader folds keys to lowercase, so alias keys are
    // written lowercase in files; Rust-side defaults are unaffected.
    let file = config_file(
        r#"
llm:
  model_map:
    fast: glm-4-flash
  default_model: fast
"#,
    );
    let config = get_config(Some(file.path().to_str().unwrap())).expect("config loads");
    assert_eq!(config.app.llm.resolved_default_model(), "glm-4-flash");
}
