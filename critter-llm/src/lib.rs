//! Critter LLM - chat persona providers
//!
//! Provider-agnostic trait for the scripted character persona the bot can
//! hold a conversation as. The trait owns nothing; implementations keep
//! the conversation history, so one running process is one conversation.

pub mod providers;

use async_trait::async_trait;
use critter_core::LlmError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Persona tuning handed to a provider at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaConfig {
    /// Model identifier, e.g. "gemini-1.5-flash".
    pub model: String,
    /// System instruction that establishes the character.
    pub instruction: String,
    pub temperature: f32,
}

/// Trait for chat persona providers.
/// Implementations must be thread-safe (Send + Sync) and stateful: each
/// call extends one ongoing conversation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one message and return the persona's reply.
    ///
    /// Callers prefix speaker attribution themselves (`"From {name}: ..."`);
    /// providers treat the message as opaque text.
    async fn send_message(&self, message: &str) -> Result<String, LlmError>;
}

/// Mock chat provider for testing.
/// Replays scripted responses in order and records every prompt it saw.
#[derive(Debug, Default)]
pub struct MockChat {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    failure: Mutex<Option<LlmError>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that answers with `responses` in order, then falls back to a
    /// fixed filler reply.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with `error`.
    pub fn fail_with(&self, error: LlmError) {
        *self.failure.lock().expect("failure lock") = Some(error);
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock").clone()
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn send_message(&self, message: &str) -> Result<String, LlmError> {
        if let Some(err) = self.failure.lock().expect("failure lock").clone() {
            return Err(err);
        }
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(message.to_string());
        Ok(self
            .responses
            .lock()
            .expect("response lock")
            .pop_front()
            .unwrap_or_else(|| "Moo.".to_string()))
    }
}
