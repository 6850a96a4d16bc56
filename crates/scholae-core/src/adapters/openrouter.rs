//! OpenAI-compatible chat completion backend (OpenRouter by default).

use crate::capabilities::{GenerationRequest, TextGenerate};
use crate::config::TextGenerationConfig;
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterGenerator {
    api_key: String,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterGenerator {
    pub fn new(api_key: &str, settings: &TextGenerationConfig, timeout: Duration) -> CapabilityResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CapabilityError::Unavailable("text generation API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerate for OpenRouterGenerator {
    async fn generate(&self, request: &GenerationRequest) -> CapabilityResult<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(target: "scholae::llm", model = %self.model, max_tokens = request.max_tokens, "chat completion request");
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "Scholae")
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(CapabilityError::QueryFailed(format!("API error {status}: {text}")));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(format!("response parse failed: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CapabilityError::Malformed("completion has no content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_key() {
        let settings = TextGenerationConfig::default();
        assert!(OpenRouterGenerator::new("  ", &settings, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn trims_trailing_slash_from_base() {
        let settings = TextGenerationConfig {
            api_base: "https://example.test/v1/".into(),
            ..TextGenerationConfig::default()
        };
        let g = OpenRouterGenerator::new("k", &settings, Duration::from_secs(1)).unwrap();
        assert_eq!(g.api_base, "https://example.test/v1");
        assert_eq!(g.model(), settings.model);
    }
}
