// Ollama native chat endpoint (/api/chat, non-streaming)

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::config::ModelConfig;

/// Send `messages` to Ollama and return `message.content` (empty if absent).
///
/// Sampling parameters are left to the model's own defaults.
pub async fn send_chat(
    client: &Client,
    model: &ModelConfig,
    messages: &[ChatMessage],
) -> Result<String> {
    let url = format!("{}/api/chat", model.base_url());
    let request = OllamaRequest {
        model: &model.model_name,
        messages,
        stream: false,
    };

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .context("Failed to send request to Ollama")?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        anyhow::bail!(
            "Ollama request failed\n\nStatus: {}\nBody: {}",
            status,
            error_body
        );
    }

    let body: OllamaResponse = response
        .json()
        .await
        .context("Failed to parse Ollama response")?;

    Ok(body.message.and_then(|m| m.content).unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: Option<String>,
}
