//! Stateful persona conversation over the Gemini client.

use super::client::GeminiClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::{ChatProvider, PersonaConfig};
use async_trait::async_trait;
use critter_core::LlmError;
use tokio::sync::Mutex;

/// Chat persona holding one conversation for the life of the process.
///
/// History is extended only after a successful exchange, so a failed call
/// leaves the conversation exactly as it was.
pub struct GeminiChat {
    client: GeminiClient,
    config: PersonaConfig,
    history: Mutex<Vec<Content>>,
}

impl GeminiChat {
    pub fn new(client: GeminiClient, config: PersonaConfig) -> Self {
        Self {
            client,
            config,
            history: Mutex::new(Vec::new()),
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Result<String, LlmError> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| LlmError::InvalidResponse {
                reason: "no candidates in response".to_string(),
            })?;
        let text = candidate
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                reason: "candidate held no text".to_string(),
            });
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    async fn send_message(&self, message: &str) -> Result<String, LlmError> {
        // Hold the lock across the call: turns must land in order.
        let mut history = self.history.lock().await;

        let mut contents = history.clone();
        contents.push(Content::user(message));

        let request = GenerateContentRequest {
            system_instruction: Some(Content::system(self.config.instruction.clone())),
            contents,
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let response: GenerateContentResponse =
            self.client.generate(&self.config.model, &request).await?;
        let reply = Self::extract_text(&response)?;

        history.push(Content::user(message));
        history.push(Content::model(reply.clone()));
        tracing::debug!(turns = history.len(), "persona exchange complete");

        Ok(reply)
    }
}

impl std::fmt::Debug for GeminiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiChat")
            .field("model", &self.config.model)
            .finish()
    }
}
