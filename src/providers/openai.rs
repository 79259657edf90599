// OpenAI-compatible chat completions
//
// Works for OpenAI itself and any server exposing /v1/chat/completions.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::config::ModelConfig;

/// Send `messages` and return the first choice's content.
///
/// The bearer header is only attached when an API key is available; without
/// one the request goes out unauthenticated.
pub async fn send_chat(
    client: &Client,
    model: &ModelConfig,
    messages: &[ChatMessage],
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", model.base_url());
    let request = OpenAIRequest {
        model: &model.model_name,
        temperature: model.temperature,
        max_tokens: model.max_tokens,
        messages,
    };

    let mut builder = client
        .post(&url)
        .header("content-type", "application/json")
        .json(&request);
    if let Some(key) = model.api_key() {
        builder = builder.header("Authorization", format!("Bearer {}", key));
    } else {
        tracing::warn!(
            api_key_env = model.api_key_env.as_deref().unwrap_or_default(),
            "No API key in environment, sending unauthenticated request"
        );
    }

    let response = builder
        .send()
        .await
        .context("Failed to send request to OpenAI-compatible API")?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        anyhow::bail!(
            "OpenAI-compatible API request failed\n\nStatus: {}\nBody: {}",
            status,
            error_body
        );
    }

    let body: OpenAIResponse = response
        .json()
        .await
        .context("Failed to parse OpenAI-compatible API response")?;

    let choice = body
        .choices
        .into_iter()
        .next()
        .context("API returned no choices in response")?;

    Ok(choice.message.content.unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}
