//! Text-generation backend abstraction.
//!
//! The [`TextGenerator`] trait decouples collaborators from the actual model
//! backend (an OpenAI-compatible chat completions API). Tests use scripted
//! generators that return queued replies without network access.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::io::config::LlmConfig;

/// Abstraction over text-generation backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`, giving up after `timeout`.
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String>;
}

/// Client for `POST {base_url}/chat/completions`.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key(),
        })
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    #[instrument(skip_all, fields(model = %self.model, timeout_secs = timeout.as_secs()))]
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self.http.post(&self.endpoint).timeout(timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("send request to {}", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion rejected");
            return Err(anyhow!(
                "chat completion failed with status {}: {}",
                status,
                detail.trim()
            ));
        }

        let parsed: ChatResponse = response.json().await.context("parse chat completion")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("chat completion missing message content"))?;

        debug!(bytes = content.len(), "chat completion received");
        Ok(content)
    }
}
