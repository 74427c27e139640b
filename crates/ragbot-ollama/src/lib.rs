//! Ollama integration for ragbot
//!
//! This crate provides the Ollama implementations of the LLMProvider and
//! EmbeddingProvider traits, and a ModelBackend that builds both.

mod backend;
mod client;
mod config;


pub use backend::OllamaBackend;
pub use client::{OllamaClient, OllamaEmbedder};
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_EMBED_MODEL, DEFAULT_LLM_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TEMPERATURE, OllamaConfig,
};

// Re-export core types for convenience
pub use ragbot_core::{
    EmbeddingProvider, Error, GenerationResult, LLMProvider, ModelBackend, Result,
};
