//! Gemini HTTP client.

use super::types::ApiError;
use critter_core::LlmError;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generative Language API client with key auth and a request timeout.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Unavailable {
                reason: format!("http client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// POST a generateContent request for `model`.
    pub async fn generate<Req: Serialize, Res: DeserializeOwned>(
        &self,
        model: &str,
        body: &Req,
    ) -> Result<Res, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable {
                reason: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| LlmError::InvalidResponse {
                reason: format!("malformed response: {}", e),
            });
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        Err(LlmError::RequestFailed {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
