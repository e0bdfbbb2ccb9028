//! Critter Core - registries, routing, and error types
//!
//! Pure data structures and lookup logic. No I/O lives here; the store and
//! persona crates depend on this one for their shared types.

pub mod error;
pub mod registry;
pub mod router;

pub use error::{
    ConfigError, CredentialError, CritterError, CritterResult, LlmError, StoreError,
    ValidationError,
};
pub use registry::{EntityRecord, EntityRegistry, MetricRecord, MetricRegistry, Mood};
pub use router::{CommandRouter, Target};
