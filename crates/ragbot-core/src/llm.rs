//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::chat::ChatMessage;

/// Result of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u32>,
}

/// Trait for generative model providers (e.g., Ollama)
///
/// Implementations own their request timeout; a call that exceeds it fails with
/// [`crate::Error::Timeout`] and an unreachable backend with [`crate::Error::Network`].
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn complete(&self, prompt: &str) -> Result<GenerationResult>;

    /// Generate the next assistant turn for a message list
    async fn chat(&self, messages: &[ChatMessage]) -> Result<GenerationResult>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
