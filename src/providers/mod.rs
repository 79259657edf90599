// LLM provider support
//
// The engine treats the model as an opaque `generate(messages, config) -> text`
// collaborator. `HttpProvider` is the real implementation; it picks the wire
// format (OpenAI-compatible or Ollama) from the model config on every call so
// config edits apply without rebuilding anything.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::constants::LLM_REQUEST_TIMEOUT_SECS;
use crate::config::{ModelConfig, Provider};

pub mod ollama;
pub mod openai;

/// One chat message in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for LLM providers
///
/// Implementations send `messages` to a model described by `model` and return
/// the reply text verbatim. No structure is imposed on the reply.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage], model: &ModelConfig) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// HTTP-backed provider dispatching on `ModelConfig::provider`
#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
}

impl HttpProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(LLM_REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn generate(&self, messages: &[ChatMessage], model: &ModelConfig) -> Result<String> {
        tracing::debug!(
            provider = ?model.provider,
            model = %model.model_name,
            messages = messages.len(),
            "Sending chat request"
        );
        match model.provider {
            Provider::Openai => openai::send_chat(&self.client, model, messages).await,
            Provider::Ollama => ollama::send_chat(&self.client, model, messages).await,
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
