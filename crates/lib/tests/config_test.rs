//! # Configuration Tests
//!
//! Alias resolution and the snapshot/publish contract: an in-flight run
//! keeps the snapshot it started with; versions advance per publish.

use askdb::config::{AppConfig, ConfigHandle};

#[test]
fn defaults_match_the_documented_knobs() {
    let config = AppConfig::default();
    assert!(config.sql.read_only);
    assert_eq!(config.sql.max_rows, 1000);
    assert_eq!(config.sql.timeout_seconds, 30);
    assert_eq!(config.sql.max_retries, 3);
    assert!(config.rag.enabled);
    assert_eq!(config.rag.top_k, 5);
    assert_eq!(config.rag.similarity_threshold, 0.5);
    assert_eq!(config.embedding.dimensions, 1024);
}

#[test]
fn model_aliases_resolve_through_the_map() {
    let config = AppConfig::default();
    assert_eq!(config.llm.resolve_model("DeepSeek"), "deepseek-chat");
    assert_eq!(config.llm.resolve_model("GPT-4"), "gpt-4-turbo");
}

#[test]
fn unmapped_aliases_pass_through_verbatim() {
    let config = AppConfig::default();
    assert_eq!(
        config.llm.resolve_model("qwen2.5-coder"),
        "qwen2.5-coder"
    );
}

#[tokio::test]
async fn publish_bumps_the_version_and_replaces_the_snapshot() {
    let handle = ConfigHandle::new(AppConfig::default());
    let first = handle.snapshot().await;
    assert_eq!(first.version, 0);

    let mut updated = AppConfig::default();
    updated.sql.max_retries = 5;
    let version = handle.publish(updated).await;
    assert_eq!(version, 1);

    let second = handle.snapshot().await;
    assert_eq!(second.version, 1);
    assert_eq!(second.config.sql.max_retries, 5);

    // The old snapshot is untouched: an in-flight run never observes the
    // update.
    assert_eq!(first.config.sql.max_retries, 3);
}
