//! Error types for Critter operations

use thiserror::Error;

/// User-input validation errors.
///
/// Always recoverable: the offending command is rejected and reported, the
/// process keeps running. These are raised before any store call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown character name: {0}")]
    UnknownEntity(String),

    #[error("Unknown crit type: {0}")]
    UnknownMetric(String),

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(String),
}

/// Backing tabular store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("No value at {location}; counters must be pre-seeded")]
    EmptyCell { location: String },

    #[error("Value at {location} is not an integer: {value:?}")]
    InvalidCounter { location: String, value: String },
}

/// Chat persona provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("Persona unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Persona request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid persona response: {reason}")]
    InvalidResponse { reason: String },
}

/// Configuration errors. Fatal at startup; the process must not start.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate {kind} key: {key}")]
    Duplicate { kind: &'static str, key: String },

    #[error("Entity {entity} references unknown campaign {group}")]
    UnknownGroup { entity: String, group: String },
}

/// Credential/session errors.
///
/// Fatal at startup if no usable token can be produced; once running, a
/// failed refresh surfaces to callers as `StoreError::Unavailable`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Credential file not found: {path}")]
    NotFound { path: String },

    #[error("Malformed credential file: {reason}")]
    Malformed { reason: String },

    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },
}

/// Master error type for all Critter errors.
#[derive(Debug, Clone, Error)]
pub enum CritterError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Persona error: {0}")]
    Llm(#[from] LlmError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Result type alias for Critter operations.
pub type CritterResult<T> = Result<T, CritterError>;

impl StoreError {
    /// Shorthand for the unavailable variant, the catch-all for service,
    /// auth, network, and timeout faults reported by the backing store.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
