use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use larder_core::config::{LlmConfig, LlmProvider};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// reqwest-backed client for an OpenAI-compatible or Ollama endpoint. Every
/// request carries the configured timeout; a timed-out call surfaces as an
/// ordinary error, which the interpreter treats the same as a parse failure.
pub struct HttpLlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("build llm http client")?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> Result<&str> {
        self.config
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("llm base_url is not configured"))
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url()?.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.context("llm request failed")?;
        let response = response.error_for_status().context("llm returned error status")?;
        let payload: Value = response.json().await.context("llm response was not json")?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("llm response missing message content"))
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url()?.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        let response =
            self.client.post(&url).json(&body).send().await.context("llm request failed")?;
        let response = response.error_for_status().context("llm returned error status")?;
        let payload: Value = response.json().await.context("llm response was not json")?;

        payload["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("llm response missing `response` field"))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.config.provider {
            LlmProvider::OpenAi => self.complete_openai(prompt).await,
            LlmProvider::Ollama => self.complete_ollama(prompt).await,
        }
    }
}
