//! Ollama HTTP clients for generation and embedding

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragbot_core::{
    ChatMessage, EmbeddingProvider, Error, GenerationResult, LLMProvider, Result,
};

use crate::config::OllamaConfig;

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    message: ChatMessage,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Build the shared HTTP client with the configured request timeout
fn http_client(config: &OllamaConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

/// Map a transport failure to a connectivity error
fn request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("Ollama request timed out: {}", err))
    } else if err.is_decode() {
        Error::Serialization(err.to_string())
    } else {
        Error::Network(format!("Ollama backend unreachable: {}", err))
    }
}

/// Extract the server's error text from a non-success response
async fn error_text(response: Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    format!("status {}: {}", status, message)
}

/// Ollama generative model client
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
    current_model: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = http_client(&config)?;
        let current_model = config.llm_model.clone();
        Ok(Self {
            config,
            client,
            current_model,
        })
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.current_model = model_id.into();
        self
    }

    async fn perform_chat(&self, messages: &[ChatMessage]) -> Result<GenerationResult> {
        let request_body = ChatRequest {
            model: &self.current_model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(model = %self.current_model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(self.config.endpoint("api/chat"))
            .json(&request_body)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(Error::LLMProvider(format!(
                "Ollama chat request failed with {}",
                error_text(response).await
            )));
        }

        let body: ChatResponseBody = response.json().await.map_err(request_error)?;

        Ok(GenerationResult {
            text: body.message.content.trim().to_string(),
            model_id: self.current_model.clone(),
            tokens_used: body.eval_count,
        })
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<GenerationResult> {
        self.perform_chat(&[ChatMessage::user(prompt)]).await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<GenerationResult> {
        if messages.is_empty() {
            return Err(Error::InvalidInput("chat requires at least one message".to_string()));
        }
        self.perform_chat(messages).await
    }

    fn model_id(&self) -> &str {
        &self.current_model
    }
}

/// Ollama embedding model client
pub struct OllamaEmbedder {
    config: OllamaConfig,
    client: Client,
    current_model: String,
}

impl OllamaEmbedder {
    /// Create a new embedding client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = http_client(&config)?;
        let current_model = config.embed_model.clone();
        Ok(Self {
            config,
            client,
            current_model,
        })
    }

    /// Set the embedding model
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.current_model = model_id.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let request_body = EmbeddingRequest {
            model: &self.current_model,
            prompt: query,
        };

        let response = self
            .client
            .post(self.config.endpoint("api/embeddings"))
            .json(&request_body)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "Ollama embedding request failed with {}",
                error_text(response).await
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(request_error)?;
        if body.embedding.is_empty() {
            return Err(Error::Embedding(format!(
                "model '{}' returned an empty embedding",
                self.current_model
            )));
        }

        Ok(body.embedding)
    }

    fn model_id(&self) -> &str {
        &self.current_model
    }
}
