//! OpenAI-compatible chat-completion provider.

use crate::api_types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Role};
use crate::client::ScoreClient;
use crate::error::{ScoringError, ScoringResult};
use anyhow::{Context, Result};
use climate_core::config::LlmConfig;
use reqwest::Client;
use std::time::Duration;

const PROVIDER: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiScoreClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    reasoning_effort: String,
    verbosity: String,
}

impl OpenAiScoreClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("OpenAI provider requires an API key")?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .context("Failed to build HTTP client")?,
            api_key,
            base_url,
            model: config.model.clone(),
            reasoning_effort: config.reasoning_effort.clone(),
            verbosity: config.verbosity.clone(),
        })
    }

    fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: prompt.to_string(),
            }],
            reasoning_effort: non_empty(&self.reasoning_effort),
            verbosity: non_empty(&self.verbosity),
        }
    }
}

#[async_trait::async_trait]
impl ScoreClient for OpenAiScoreClient {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn score_batch(&self, prompt: &str) -> ScoringResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|source| ScoringError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ScoringError::Transport {
                provider: PROVIDER,
                source,
            })?;

        if !status.is_success() {
            return Err(ScoringError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        tracing::debug!(
            "OpenAI raw response (first 1000 chars): {}",
            text.chars().take(1000).collect::<String>()
        );

        let envelope: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ScoringError::InvalidEnvelope(e.to_string()))?;
        envelope
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| ScoringError::InvalidEnvelope("no choices[0].message.content".into()))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_carries_tuning_params() {
        let cfg = LlmConfig {
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        };
        let client = OpenAiScoreClient::new(&cfg).unwrap();
        let body = serde_json::to_value(client.request_body("hello")).unwrap();
        assert_eq!(body["model"], "gpt-5-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["reasoning_effort"], "minimal");
        assert_eq!(body["verbosity"], "low");
    }

    #[test]
    fn test_empty_tuning_params_are_omitted() {
        let cfg = LlmConfig {
            api_key: Some("sk-test".into()),
            reasoning_effort: String::new(),
            verbosity: String::new(),
            ..LlmConfig::default()
        };
        let client = OpenAiScoreClient::new(&cfg).unwrap();
        let body = serde_json::to_value(client.request_body("hello")).unwrap();
        assert!(body.get("reasoning_effort").is_none());
        assert!(body.get("verbosity").is_none());
    }

    #[test]
    fn test_requires_api_key() {
        assert!(OpenAiScoreClient::new(&LlmConfig::default()).is_err());
    }
}
