//! Ollama model backend

use std::sync::Arc;

use ragbot_core::{EmbeddingProvider, LLMProvider, ModelBackend, Result};

use crate::client::{OllamaClient, OllamaEmbedder};
use crate::config::OllamaConfig;

/// Creates Ollama generation and embedding handles from one configuration
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(OllamaConfig::from_env()?))
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

impl ModelBackend for OllamaBackend {
    fn llm(&self) -> Result<Arc<dyn LLMProvider>> {
        Ok(Arc::new(OllamaClient::new(self.config.clone())?))
    }

    fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(OllamaEmbedder::new(self.config.clone())?))
    }
}
