//! # Chat Backend Factory
//!
//! Centralizes backend selection for the chat-completion boundary. The
//! decision is made once per configuration snapshot, never per call: a base
//! URL on bigmodel.cn or a GLM-family model name routes to the vendor
//! backend, anything else to the generic OpenAI-compatible client. Model
//! aliases are resolved through the snapshot's alias map; an unmapped alias
//! passes through verbatim.

use crate::{
    config::LlmConfig,
    errors::PipelineError,
    providers::ai::{openai::OpenAiCompatProvider, zhipu::ZhipuProvider, AiProvider},
};
use tracing::info;

/// Creates the chat backend for a configuration snapshot.
pub fn create_llm_provider(llm: &LlmConfig) -> Result<Box<dyn AiProvider>, PipelineError> {
    let model = llm.resolved_default_model();

    if llm.base_url.contains("bigmodel.cn") || model.to_lowercase().contains("glm") {
        let api_key = llm.api_key.clone().ok_or(PipelineError::MissingApiKey)?;
        info!(model = %model, "Configuring vendor (Zhipu) chat backend");
        Ok(Box::new(ZhipuProvider::new(api_key, model)?))
    } else {
        info!(base_url = %llm.base_url, model = %model, "Configuring OpenAI-compatible chat backend");
        Ok(Box::new(OpenAiCompatProvider::new(
            llm.base_url.clone(),
            llm.api_key.clone(),
            model,
        )?))
    }
}
