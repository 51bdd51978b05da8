//! # Vector Index Tests
//!
//! Exercises the turso-backed index with vectors of known cosine
//! similarity: threshold filtering, descending ordering, owner/kind
//! isolation, bulk deletion, and the dimensionality guard.

mod common;

use askdb::errors::PipelineError;
use askdb::providers::db::vector::{NewVectorDocument, VectorStore};
use askdb::types::DocKind;
use common::setup_tracing;
use serde_json::Map;

async fn store(dimensions: usize) -> VectorStore {
    let db = turso::Builder::new_local(":memory:")
        .build()
        .await
        .expect("in-memory turso database");
    VectorStore::new(db, dimensions).await.expect("vector store")
}

/// A unit vector whose cosine similarity with `[1, 0, 0]` is exactly `cos`.
fn unit_vector_with_similarity(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).sqrt(), 0.0]
}

#[tokio::test]
async fn search_filters_by_threshold_and_orders_by_similarity() {
    setup_tracing();
    let store = store(3).await;
    let query = vec![1.0, 0.0, 0.0];

    for (content, cos) in [("high", 0.9f32), ("mid", 0.6), ("low", 0.3)] {
        store
            .insert(
                content,
                1,
                DocKind::Schema,
                &Map::new(),
                &unit_vector_with_similarity(cos),
            )
            .await
            .expect("insert");
    }

    let results = store
        .search(&query, 1, DocKind::Schema, 5, 0.5)
        .await
        .expect("search");

    assert_eq!(results.len(), 2, "only two documents clear the threshold");
    assert_eq!(results[0].content, "high");
    assert_eq!(results[1].content, "mid");
    assert!((results[0].similarity - 0.9).abs() < 1e-3);
    assert!((results[1].similarity - 0.6).abs() < 1e-3);
    assert!(results[0].similarity > results[1].similarity);
}

#[tokio::test]
async fn search_respects_owner_and_kind_filters() {
    setup_tracing();
    let store = store(3).await;
    let vector = vec![1.0, 0.0, 0.0];

    store
        .insert("schema for source 1", 1, DocKind::Schema, &Map::new(), &vector)
        .await
        .unwrap();
    store
        .insert("example for source 1", 1, DocKind::Example, &Map::new(), &vector)
        .await
        .unwrap();
    store
        .insert("schema for source 2", 2, DocKind::Schema, &Map::new(), &vector)
        .await
        .unwrap();

    let results = store
        .search(&vector, 1, DocKind::Schema, 10, 0.0)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, "schema for source 1");
    assert_eq!(results[0].kind, DocKind::Schema);
}

#[tokio::test]
async fn delete_by_owner_and_kind_removes_only_that_slice() {
    setup_tracing();
    let store = store(3).await;
    let vector = vec![0.0, 1.0, 0.0];

    let docs: Vec<NewVectorDocument> = [
        (1, DocKind::Schema, "s1"),
        (1, DocKind::Schema, "s2"),
        (1, DocKind::Example, "e1"),
        (2, DocKind::Schema, "other"),
    ]
    .into_iter()
    .map(|(owner_id, kind, content)| NewVectorDocument {
        content: content.to_string(),
        owner_id,
        kind,
        metadata: Map::new(),
        embedding: vector.clone(),
    })
    .collect();
    store.insert_batch(&docs).await.expect("batch insert");

    let deleted = store
        .delete_by_owner_and_kind(1, DocKind::Schema)
        .await
        .expect("delete");
    assert_eq!(deleted, 2);

    let remaining_examples = store
        .search(&vector, 1, DocKind::Example, 10, 0.0)
        .await
        .unwrap();
    assert_eq!(remaining_examples.len(), 1);

    let other_owner = store
        .search(&vector, 2, DocKind::Schema, 10, 0.0)
        .await
        .unwrap();
    assert_eq!(other_owner.len(), 1);
}

#[tokio::test]
async fn mismatched_dimensionality_is_rejected() {
    setup_tracing();
    let store = store(3).await;

    let result = store
        .insert("bad", 1, DocKind::Schema, &Map::new(), &[1.0, 0.0])
        .await;
    assert!(matches!(
        result,
        Err(PipelineError::EmbeddingDimension {
            expected: 3,
            actual: 2
        })
    ));

    let result = store.search(&[1.0, 0.0], 1, DocKind::Schema, 5, 0.0).await;
    assert!(matches!(
        result,
        Err(PipelineError::EmbeddingDimension { .. })
    ));
}

#[tokio::test]
async fn metadata_round_trips_through_the_index() {
    setup_tracing();
    let store = store(3).await;
    let mut metadata = Map::new();
    metadata.insert("sql".to_string(), "SELECT 1".into());

    store
        .insert("q", 1, DocKind::Example, &metadata, &[1.0, 0.0, 0.0])
        .await
        .unwrap();

    let results = store
        .search(&[1.0, 0.0, 0.0], 1, DocKind::Example, 1, 0.5)
        .await
        .unwrap();
    assert_eq!(results[0].metadata.get("sql").and_then(|v| v.as_str()), Some("SELECT 1"));
}
