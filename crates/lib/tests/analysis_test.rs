//! # Analyzer and Suggestion Tests
//!
//! Both enrichment steps must always yield something usable: the analyzer
//! falls back to the raw reply, the suggester degrades through line
//! stripping down to a fixed list.

mod common;

use askdb::analysis::{parse_analysis_reply, ResultAnalyzer, ANALYSIS_SAMPLE_ROWS};
use askdb::suggest::{parse_suggestions, SuggestionGenerator, FALLBACK_SUGGESTIONS};
use common::{row, setup_tracing, MockAiProvider};
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[test]
fn analysis_parses_structured_reply() {
    let reply = r#"```json
{"insight": "Sales rose steadily.", "chart_type": "Line", "x_axis": "month", "y_axis": "sales"}
```"#;
    let result = parse_analysis_reply(reply);
    assert_eq!(result.insight, "Sales rose steadily.");
    assert_eq!(result.chart_type, "Line");
    assert_eq!(result.x_axis.as_deref(), Some("month"));
}

#[test]
fn analysis_falls_back_to_verbatim_reply() {
    let result = parse_analysis_reply("The data shows a clear upward trend.");
    assert_eq!(result.insight, "The data shows a clear upward trend.");
    assert_eq!(result.chart_type, "Table");
    assert!(result.x_axis.is_none());
}

#[tokio::test]
async fn empty_result_sets_skip_the_llm() {
    setup_tracing();
    let provider = MockAiProvider::new(vec![]);
    let history = provider.call_history.clone();
    let analyzer = ResultAnalyzer::new(Arc::new(provider));

    let result = analyzer
        .analyze("how many?", "SELECT 1", &[])
        .await
        .expect("empty analysis short-circuits");

    assert!(result.insight.contains("no rows"));
    assert_eq!(result.chart_type, "Table");
    assert!(history.read().unwrap().is_empty());
}

#[tokio::test]
async fn analysis_samples_at_most_twenty_rows() {
    setup_tracing();
    let provider = MockAiProvider::new(vec![
        json!({"insight": "ok", "chart_type": "Table"}).to_string(),
    ]);
    let history = provider.call_history.clone();
    let analyzer = ResultAnalyzer::new(Arc::new(provider));

    let rows: Vec<Map<String, Value>> = (0..50)
        .map(|i| row(&[("n", Value::from(i))]))
        .collect();
    analyzer
        .analyze("numbers?", "SELECT n FROM t", &rows)
        .await
        .expect("analysis succeeds");

    let calls = history.read().unwrap();
    let prompt = &calls[0].1;
    assert!(prompt.contains(&format!("{{\"n\":{}}}", ANALYSIS_SAMPLE_ROWS - 1)));
    assert!(!prompt.contains(&format!("{{\"n\":{}}}", ANALYSIS_SAMPLE_ROWS)));
}

#[test]
fn suggestions_parse_a_json_array() {
    let reply = r#"["How about monthly totals?", "Top regions?", "Any outliers?"]"#;
    assert_eq!(
        parse_suggestions(reply),
        vec!["How about monthly totals?", "Top regions?", "Any outliers?"]
    );
}

#[test]
fn suggestions_strip_list_prefixes_when_json_fails() {
    let reply = "Here are some ideas:\n- What changed last month?\n2. Which region leads?\n* Any seasonal effects?";
    assert_eq!(
        parse_suggestions(reply),
        vec![
            "What changed last month?",
            "Which region leads?",
            "Any seasonal effects?"
        ]
    );
}

#[test]
fn suggestions_fall_back_to_the_generic_list() {
    let parsed = parse_suggestions("I have no ideas today.");
    assert_eq!(parsed.len(), FALLBACK_SUGGESTIONS.len());
    assert_eq!(parsed[0], FALLBACK_SUGGESTIONS[0]);
}

#[tokio::test]
async fn suggester_uses_the_sql_in_its_prompt() {
    setup_tracing();
    let provider = MockAiProvider::new(vec![json!(["a", "b", "c"]).to_string()]);
    let history = provider.call_history.clone();
    let suggester = SuggestionGenerator::new(Arc::new(provider));

    let suggestions = suggester
        .suggest("revenue?", Some("SELECT SUM(amount) FROM orders"))
        .await
        .expect("suggestions succeed");

    assert_eq!(suggestions, vec!["a", "b", "c"]);
    let calls = history.read().unwrap();
    assert!(calls[0].1.contains("SELECT SUM(amount) FROM orders"));
}
