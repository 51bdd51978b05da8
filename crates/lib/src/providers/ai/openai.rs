use crate::{errors::PipelineError, providers::ai::AiProvider};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatRequestMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatRequestMessage,
}

// --- Generic OpenAI-compatible provider implementation ---

/// A provider for any OpenAI-compatible `/chat/completions` API
/// (DeepSeek, OpenAI, local gateways, ...).
#[derive(Clone, Debug)]
pub struct OpenAiCompatProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatProvider {
    /// Creates a new provider from a base URL and a concrete model name.
    /// The standard `/chat/completions` path is appended; an API key is
    /// optional to allow keyless local gateways.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Result<Self, PipelineError> {
        let client = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::ReqwestClientBuild)?;
        let api_url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, PipelineError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatRequestMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatRequestMessage {
            role: "user".to_string(),
            content: user_prompt.to_string(),
        });

        let request_body = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            stream: false,
        };

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .json(&request_body)
            .send()
            .await
            .map_err(PipelineError::LlmRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::LlmApi(error_text));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(PipelineError::LlmDeserialization)?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::LlmApi("LLM API returned no choices".to_string()))?;

        if content.trim().is_empty() {
            return Err(PipelineError::LlmApi(
                "LLM API returned an empty message".to_string(),
            ));
        }
        Ok(content)
    }
}
