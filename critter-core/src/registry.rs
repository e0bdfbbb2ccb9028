//! Entity and metric registries.
//!
//! Both registries are built from configuration data and validated at
//! construction: duplicate keys (case-insensitive for entities), empty
//! fields, and zero rows are rejected. Code never embeds literal tables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One tracked character: which sub-table it lives on, its row there, and
/// the display color used for replies about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityRecord {
    pub group: String,
    pub row: u32,
    pub color: u32,
}

/// Whether a metric is celebrated or mourned in replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
}

/// One counted event type: the column holding its counters plus the
/// presentation metadata attached to replies about it. `title` may contain
/// an `{emoji}` slot filled by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricRecord {
    pub column: String,
    pub title: String,
    pub mood: Mood,
    pub image: PathBuf,
    pub sound: PathBuf,
}

/// Case-insensitive name -> `EntityRecord` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRegistry {
    entries: HashMap<String, EntityRecord>,
}

impl EntityRegistry {
    /// Build a registry, rejecting duplicate names (case-insensitive),
    /// empty names or groups, and row 0 (rows are 1-based).
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, EntityRecord)>,
    ) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();
        for (name, record) in entries {
            let key = name.trim().to_uppercase();
            if key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "entities".to_string(),
                    reason: "entity name must not be empty".to_string(),
                });
            }
            if record.group.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("entities.{}.group", key),
                    reason: "must not be empty".to_string(),
                });
            }
            if record.row == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("entities.{}.row", key),
                    reason: "rows are 1-based".to_string(),
                });
            }
            if map.insert(key.clone(), record).is_some() {
                return Err(ConfigError::Duplicate {
                    kind: "entity",
                    key,
                });
            }
        }
        Ok(Self { entries: map })
    }

    /// Look up an entity by name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&EntityRecord> {
        self.entries.get(&name.trim().to_uppercase())
    }

    /// Canonical (uppercased) names in the registry, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Metric key -> `MetricRecord` map. Keys are matched exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRegistry {
    entries: HashMap<String, MetricRecord>,
}

impl MetricRegistry {
    /// Build a registry, rejecting duplicate keys, empty keys, and columns
    /// that are empty or not plain column letters.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, MetricRecord)>,
    ) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();
        for (key, record) in entries {
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "metrics".to_string(),
                    reason: "metric key must not be empty".to_string(),
                });
            }
            if record.column.is_empty() || !record.column.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("metrics.{}.column", key),
                    reason: "must be one or more column letters A-Z".to_string(),
                });
            }
            if map.insert(key.clone(), record).is_some() {
                return Err(ConfigError::Duplicate {
                    kind: "metric",
                    key,
                });
            }
        }
        Ok(Self { entries: map })
    }

    /// Look up a metric by its exact key.
    pub fn lookup(&self, key: &str) -> Option<&MetricRecord> {
        self.entries.get(key.trim())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
