//! [`Summariser`] over an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use repo2notion_core::contract::{Summariser, SummaryError};
use repo2notion_core::summarise::SummariserConfig;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// One completion request per call; the core guard handles size, retries and fallback.
pub struct ChatSummariser {
    http: reqwest::Client,
    api_key: String,
    config: SummariserConfig,
}

impl ChatSummariser {
    pub fn new(api_key: String, config: SummariserConfig) -> Result<Self, SummaryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        tracing::info!(base_url = %config.base_url, model = %config.model, "Initialised chat summariser");
        Ok(Self {
            http,
            api_key,
            config,
        })
    }
}

#[async_trait]
impl Summariser for ChatSummariser {
    async fn summarise(&self, raw: &str) -> Result<String, SummaryError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user", "content": format!("{}{}", self.config.prompt, raw) }
            ]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %text, "Chat completion request failed");
            return Err(format!("chat completion failed with {status}: {text}").into());
        }

        let completion: Completion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| "chat completion returned no content".into())
    }
}
