pub mod embedding;
pub mod openai;
pub mod zhipu;

use crate::errors::PipelineError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for chat-completion backends.
///
/// This defines the single capability the pipeline needs from a language
/// model: one completion call over an optional system prompt, a user
/// prompt, and a temperature. Backends are interchangeable; selection
/// happens once per configuration snapshot in [`crate::providers::factory`].
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Sends one chat completion and returns the assistant's reply text.
    ///
    /// Implementations must fail with an error rather than silently return
    /// an empty string when the backend produces no choices.
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, PipelineError>;
}

dyn_clone::clone_trait_object!(AiProvider);
