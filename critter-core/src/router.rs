//! Command routing: raw user arguments to addressed counter targets.
//!
//! Resolution is pure with respect to the registries. Nothing here performs
//! I/O, so unknown names are rejected before any store call happens.

use crate::error::ValidationError;
use crate::registry::{EntityRecord, EntityRegistry, MetricRecord, MetricRegistry};

/// A fully resolved counter target, ready for an increment.
///
/// Carries the registry records along so the presentation layer can build a
/// reply (color, title, assets) without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Canonical (uppercased) entity name.
    pub entity_name: String,
    /// Metric key as registered.
    pub metric_key: String,
    /// Sub-table holding the counter.
    pub group: String,
    /// Cell address within the sub-table, e.g. `B3`.
    pub address: String,
    pub entity: EntityRecord,
    pub metric: MetricRecord,
}

/// Maps `(subject, metric)` argument pairs to counter targets via the two
/// registries, and campaign names to their sub-table.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    entities: EntityRegistry,
    metrics: MetricRegistry,
    campaigns: Vec<String>,
}

impl CommandRouter {
    /// `campaigns` is the fixed set of known sub-table names, as configured.
    pub fn new(entities: EntityRegistry, metrics: MetricRegistry, campaigns: Vec<String>) -> Self {
        Self {
            entities,
            metrics,
            campaigns,
        }
    }

    /// Resolve a `(subject, metric)` pair to a counter target.
    ///
    /// Subject lookup is case-insensitive; metric keys are matched exactly.
    /// The address is the metric's column followed by the entity's row.
    pub fn resolve(&self, subject: &str, metric_key: &str) -> Result<Target, ValidationError> {
        let entity = self
            .entities
            .lookup(subject)
            .ok_or_else(|| ValidationError::UnknownEntity(subject.to_string()))?;
        let metric = self
            .metrics
            .lookup(metric_key)
            .ok_or_else(|| ValidationError::UnknownMetric(metric_key.to_string()))?;

        Ok(Target {
            entity_name: subject.trim().to_uppercase(),
            metric_key: metric_key.trim().to_string(),
            group: entity.group.clone(),
            address: format!("{}{}", metric.column, entity.row),
            entity: entity.clone(),
            metric: metric.clone(),
        })
    }

    /// Validate a campaign name against the known set, case-insensitively,
    /// returning the canonical sub-table name.
    pub fn resolve_session_target(&self, campaign: &str) -> Result<String, ValidationError> {
        let wanted = campaign.trim();
        self.campaigns
            .iter()
            .find(|known| known.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| ValidationError::UnknownCampaign(campaign.to_string()))
    }

    pub fn campaigns(&self) -> &[String] {
        &self.campaigns
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn metrics(&self) -> &MetricRegistry {
        &self.metrics
    }
}
