//! Configuration loading for the Critter bot.
//!
//! All fields are required unless explicitly marked optional. No defaults
//! beyond the cowsay program name; a missing or invalid setting stops the
//! process before it ever talks to the store.

use critter_core::{EntityRecord, EntityRegistry, MetricRecord, MetricRegistry};
use critter_llm::PersonaConfig;
use critter_store::RetryPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    pub spreadsheet_id: String,
    /// Known sub-table names; at least two campaigns are expected.
    pub campaigns: Vec<String>,
    /// Cell on each campaign sheet holding the session number, e.g. `H2`.
    pub session_cell: String,
    pub request_timeout_ms: u64,
    #[serde(default = "default_cowsay_path")]
    pub cowsay_path: String,
    pub auth: AuthConfig,
    pub retry: RetryConfig,
    pub persona: PersonaSection,
    pub assets: AssetsConfig,
    pub entities: HashMap<String, EntityRecord>,
    pub metrics: HashMap<String, MetricRecord>,
}

fn default_cowsay_path() -> String {
    "cowsay".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Authorized-user credential file, refreshed in place.
    pub authorized_user_path: Option<PathBuf>,
    /// Fixed token for environments that manage credentials externally.
    pub static_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaSection {
    pub api_key: String,
    pub model: String,
    pub instruction: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
    /// Thumbnail attached to error replies.
    pub warning_image: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or CRITTER_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error(transparent)]
    Registry(#[from] critter_core::ConfigError),
}

impl BotConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: BotConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "spreadsheet_id",
                reason: "must not be empty".to_string(),
            });
        }
        if self.campaigns.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "campaigns",
                reason: "at least two campaigns are required".to_string(),
            });
        }
        if self.campaigns.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "campaigns",
                reason: "campaign names must not be empty".to_string(),
            });
        }
        if self.session_cell.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session_cell",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.auth.authorized_user_path.is_none() && self.auth.static_token.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "authorized_user_path or static_token must be provided".to_string(),
            });
        }
        if self.retry.initial_backoff_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.initial_backoff_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_backoff_ms",
                reason: "must be >= initial_backoff_ms".to_string(),
            });
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.multiplier",
                reason: "must be >= 1.0".to_string(),
            });
        }
        if self.persona.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persona.api_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.persona.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persona.model",
                reason: "must not be empty".to_string(),
            });
        }
        if self.persona.instruction.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persona.instruction",
                reason: "must not be empty".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.persona.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "persona.temperature",
                reason: "must be within 0.0..=2.0".to_string(),
            });
        }
        if self.entities.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "entities",
                reason: "at least one entity is required".to_string(),
            });
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "metrics",
                reason: "at least one metric is required".to_string(),
            });
        }
        // Registry-level validation (duplicates, field shapes, groups).
        self.build_registries()?;
        Ok(())
    }

    /// Build the validated registries, checking every entity's group
    /// against the campaign list.
    pub fn build_registries(&self) -> Result<(EntityRegistry, MetricRegistry), ConfigError> {
        for (name, record) in &self.entities {
            if !self.campaigns.iter().any(|c| c == &record.group) {
                return Err(ConfigError::Registry(
                    critter_core::ConfigError::UnknownGroup {
                        entity: name.clone(),
                        group: record.group.clone(),
                    },
                ));
            }
        }
        let entities = EntityRegistry::from_entries(
            self.entities.iter().map(|(k, v)| (k.clone(), v.clone())),
        )?;
        let metrics = MetricRegistry::from_entries(
            self.metrics.iter().map(|(k, v)| (k.clone(), v.clone())),
        )?;
        Ok((entities, metrics))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            multiplier: self.retry.multiplier,
        }
    }

    pub fn persona_config(&self) -> PersonaConfig {
        PersonaConfig {
            model: self.persona.model.clone(),
            instruction: self.persona.instruction.clone(),
            temperature: self.persona.temperature,
        }
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("CRITTER_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
