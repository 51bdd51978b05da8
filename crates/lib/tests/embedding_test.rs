//! # Embedding Client Tests
//!
//! The provider boundary is mocked with wiremock: order restoration from a
//! shuffled response, transparent chunking past the provider batch limit,
//! and the malformed-payload failure path.

mod common;

use askdb::config::EmbeddingConfig;
use askdb::errors::PipelineError;
use askdb::providers::ai::embedding::{EmbeddingClient, PROVIDER_BATCH_LIMIT};
use common::setup_tracing;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn client_for(server: &MockServer, dimensions: usize) -> EmbeddingClient {
    let config = EmbeddingConfig {
        api_url: format!("{}/embeddings", server.uri()),
        model: "embedding-3".to_string(),
        api_key: Some("test-key".to_string()),
        dimensions,
    };
    EmbeddingClient::new(&config).expect("client should build")
}

#[test]
fn missing_credential_is_rejected_at_construction() {
    let config = EmbeddingConfig {
        api_key: None,
        ..EmbeddingConfig::default()
    };
    assert!(matches!(
        EmbeddingClient::new(&config),
        Err(PipelineError::MissingApiKey)
    ));
}

#[tokio::test]
async fn batch_order_is_restored_from_a_shuffled_response() {
    setup_tracing();
    let server = MockServer::start().await;

    // The provider reorders items; only the index field ties them back.
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 2, "embedding": [3.0, 3.0]},
                {"index": 0, "embedding": [1.0, 1.0]},
                {"index": 1, "embedding": [2.0, 2.0]},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let vectors = client
        .embed_batch(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .expect("embedding should succeed");

    assert_eq!(
        vectors,
        vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]
    );
}

/// Echoes one embedding per input, so chunked requests of any size get a
/// well-formed response.
struct EchoEmbeddings {
    dimensions: usize,
}

impl Respond for EchoEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        let count = body["input"].as_array().map(|a| a.len()).unwrap_or(0);
        let data: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "index": i,
                    "embedding": vec![i as f32; self.dimensions],
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

#[tokio::test]
async fn oversized_batches_are_chunked_transparently() {
    setup_tracing();
    let server = MockServer::start().await;

    // One past the limit forces exactly two requests.
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(EchoEmbeddings { dimensions: 2 })
        .expect(2)
        .mount(&server)
        .await;

    let inputs: Vec<String> = (0..PROVIDER_BATCH_LIMIT + 1)
        .map(|i| format!("text {i}"))
        .collect();

    let client = client_for(&server, 2);
    let vectors = client
        .embed_batch(&inputs)
        .await
        .expect("chunked embedding should succeed");

    assert_eq!(vectors.len(), PROVIDER_BATCH_LIMIT + 1);
    // The first item of each chunk carries index 0 from the echo responder.
    assert_eq!(vectors[0], vec![0.0, 0.0]);
    assert_eq!(vectors[PROVIDER_BATCH_LIMIT], vec![0.0, 0.0]);
}

#[tokio::test]
async fn empty_payload_is_an_embedding_error() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let result = client.embed("anything").await;
    assert!(matches!(result, Err(PipelineError::EmbeddingApi(_))));
}

#[tokio::test]
async fn wrong_dimensionality_is_an_embedding_error() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0, 2.0, 3.0]}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let result = client.embed("anything").await;
    assert!(matches!(result, Err(PipelineError::EmbeddingApi(_))));
}
