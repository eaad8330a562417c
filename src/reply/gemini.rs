//! Gemini generateContent backend.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::provider::{ReplyContext, ReplyProvider};
use crate::error::ProviderError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            timeout,
        }
    }

    fn build_body(&self, ctx: &ReplyContext) -> serde_json::Value {
        // Gemini's roles are "user"/"model" rather than "assistant".
        let contents: Vec<serde_json::Value> = ctx
            .transcript()
            .into_iter()
            .map(|(role, text)| {
                let role = if role == "assistant" { "model" } else { role };
                json!({"role": role, "parts": [{"text": text}]})
            })
            .collect();
        json!({
            "system_instruction": {"parts": [{"text": ctx.directives}]},
            "contents": contents,
            "generationConfig": {"temperature": 0.8, "maxOutputTokens": 160},
        })
    }
}

#[async_trait]
impl ReplyProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, ctx: &ReplyContext) -> Result<String, ProviderError> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .timeout(self.timeout)
            .json(&self.build_body(ctx))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        provider: "gemini".to_string(),
                        elapsed: self.timeout,
                    }
                } else {
                    ProviderError::RequestFailed {
                        provider: "gemini".to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ErrorStatus {
                provider: "gemini".to_string(),
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: "gemini".to_string(),
                    reason: e.to_string(),
                })?;

        let content = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "gemini".to_string(),
                reason: "missing candidates[0].content.parts[0].text".to_string(),
            })?;

        Ok(content.to_string())
    }
}
