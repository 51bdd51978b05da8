use crate::{errors::PipelineError, providers::ai::AiProvider};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// The vendor chat-completions endpoint.
pub const ZHIPU_CHAT_COMPLETIONS_URL: &str =
    "https://open.bigmodel.cn/api/paas/v4/chat/completions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// --- Zhipu-specific request and response structures ---

#[derive(Serialize)]
struct ZhipuRequest<'a> {
    model: &'a str,
    messages: Vec<ZhipuMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ZhipuMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ZhipuResponse {
    choices: Vec<ZhipuChoice>,
}

#[derive(Deserialize, Debug)]
struct ZhipuChoice {
    message: ZhipuMessage,
}

// --- Zhipu Provider implementation ---

/// A provider for the Zhipu (bigmodel.cn) chat API.
#[derive(Clone, Debug)]
pub struct ZhipuProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    model: String,
}

impl ZhipuProvider {
    /// Creates a new `ZhipuProvider` for a concrete (already resolved)
    /// model identifier.
    pub fn new(api_key: String, model: String) -> Result<Self, PipelineError> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::MissingApiKey);
        }
        let client = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url: ZHIPU_CHAT_COMPLETIONS_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Overrides the endpoint URL. Used by tests to point at a mock server.
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }
}

#[async_trait]
impl AiProvider for ZhipuProvider {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, PipelineError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
            messages.push(ZhipuMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ZhipuMessage {
            role: "user".to_string(),
            content: user_prompt.to_string(),
        });

        let request_body = ZhipuRequest {
            model: &self.model,
            messages,
            temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(PipelineError::LlmRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::LlmApi(error_text));
        }

        let zhipu_response: ZhipuResponse = response
            .json()
            .await
            .map_err(PipelineError::LlmDeserialization)?;

        let content = zhipu_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::LlmApi("Zhipu API returned no choices".to_string()))?;

        if content.trim().is_empty() {
            return Err(PipelineError::LlmApi(
                "Zhipu API returned an empty message".to_string(),
            ));
        }
        Ok(content)
    }
}
