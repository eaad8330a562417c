//! OpenAI chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::provider::{ReplyContext, ReplyProvider};
use crate::error::ProviderError;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Replies kept short — the persona is a distracted human, not an
/// essayist, and long answers read as botlike.
const MAX_REPLY_TOKENS: u32 = 120;

const TEMPERATURE: f32 = 0.8;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            timeout,
        }
    }

    fn build_body(&self, ctx: &ReplyContext) -> serde_json::Value {
        let mut messages = vec![json!({"role": "system", "content": ctx.directives})];
        for (role, text) in ctx.transcript() {
            messages.push(json!({"role": role, "content": text}));
        }
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_REPLY_TOKENS,
        })
    }
}

#[async_trait]
impl ReplyProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, ctx: &ReplyContext) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&self.build_body(ctx))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        provider: "openai".to_string(),
                        elapsed: self.timeout,
                    }
                } else {
                    ProviderError::RequestFailed {
                        provider: "openai".to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ErrorStatus {
                provider: "openai".to_string(),
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: "openai".to_string(),
                    reason: e.to_string(),
                })?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "openai".to_string(),
                reason: "missing choices[0].message.content".to_string(),
            })?;

        Ok(content.to_string())
    }
}
