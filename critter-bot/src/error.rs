//! Error types for the bot front end.

use crate::config::ConfigError;
use crate::cowsay::CowsayError;
use critter_core::{CredentialError, CritterError, LlmError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] CritterError),
    #[error(transparent)]
    Cowsay(#[from] CowsayError),
}

impl From<StoreError> for BotError {
    fn from(err: StoreError) -> Self {
        BotError::Core(err.into())
    }
}

impl From<LlmError> for BotError {
    fn from(err: LlmError) -> Self {
        BotError::Core(err.into())
    }
}

impl From<CredentialError> for BotError {
    fn from(err: CredentialError) -> Self {
        BotError::Core(err.into())
    }
}
