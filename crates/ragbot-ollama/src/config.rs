//! Ollama configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use ragbot_core::Result;
use ragbot_core::config::{parse_var, string_var};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "wizardlm2:7b-q5_K_M";
pub const DEFAULT_EMBED_MODEL: &str = "snowflake-arctic-embed:latest";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_TEMPERATURE: f32 = 0.75;

/// Configuration for the Ollama clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub llm_model: String,
    pub embed_model: String,
    pub request_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl OllamaConfig {
    /// Create configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            base_url: string_var(&lookup, "OLLAMA_BASE_URL", DEFAULT_BASE_URL),
            llm_model: string_var(&lookup, "RAGBOT_LLM_MODEL", DEFAULT_LLM_MODEL),
            embed_model: string_var(&lookup, "RAGBOT_EMBED_MODEL", DEFAULT_EMBED_MODEL),
            request_timeout_secs: parse_var(
                &lookup,
                "RAGBOT_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            temperature: parse_var(&lookup, "RAGBOT_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        })
    }

    /// Point the clients at another server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join an API path onto the base URL
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_env_empty() {
        let config = OllamaConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, OllamaConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OLLAMA_BASE_URL", "http://gpu-box:11434/"),
            ("RAGBOT_LLM_MODEL", "llama3:8b"),
            ("RAGBOT_REQUEST_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();
        let config = OllamaConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.llm_model, "llama3:8b");
        assert_eq!(config.embed_model, DEFAULT_EMBED_MODEL);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.endpoint("/api/chat"), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn test_invalid_timeout_is_configuration_error() {
        let result = OllamaConfig::from_lookup(|k| {
            (k == "RAGBOT_REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ragbot_core::Error::Configuration(_))));
    }
}
