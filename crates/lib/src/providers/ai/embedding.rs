//! # Embeddings Provider
//!
//! Turns text into fixed-dimension vectors through an OpenAI-compatible
//! embeddings API. Batches beyond the provider's hard limit are chunked
//! transparently, and responses are re-sorted by their own item index so
//! callers always receive vectors in input order.

use crate::{config::EmbeddingConfig, errors::PipelineError};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// The provider accepts at most this many inputs per request.
pub const PROVIDER_BATCH_LIMIT: usize = 64;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize, Debug)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// A client for generating vector embeddings.
#[derive(Clone, Debug)]
pub struct EmbeddingClient {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

impl EmbeddingClient {
    /// Creates a new `EmbeddingClient`. Fails when no credential is
    /// configured.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, PipelineError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PipelineError::MissingApiKey)?;
        let client = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
        })
    }

    /// The fixed dimensionality of every vector this client produces.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Generates an embedding for a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            PipelineError::EmbeddingApi("provider returned no embedding".to_string())
        })
    }

    /// Generates embeddings for many texts, preserving input order.
    ///
    /// Inputs beyond the provider's batch limit are split into multiple
    /// requests; the caller never sees the limit.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(PROVIDER_BATCH_LIMIT) {
            all.extend(self.request_batch(chunk).await?);
        }
        Ok(all)
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        debug!(batch = texts.len(), "--> Sending request to embeddings API");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(PipelineError::EmbeddingRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingApi(error_text));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingApi(e.to_string()))?;

        let mut data = embedding_response.data;
        if data.is_empty() {
            return Err(PipelineError::EmbeddingApi(
                "provider returned no embeddings".to_string(),
            ));
        }
        if data.len() != texts.len() {
            return Err(PipelineError::EmbeddingApi(format!(
                "provider returned {} embeddings for {} inputs",
                data.len(),
                texts.len()
            )));
        }

        // The provider may batch and reorder internally; its item index is
        // the contract for restoring input order.
        data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            if item.embedding.len() != self.dimensions {
                return Err(PipelineError::EmbeddingApi(format!(
                    "provider returned a {}-dimensional vector, expected {}",
                    item.embedding.len(),
                    self.dimensions
                )));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}
