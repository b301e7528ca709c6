//! Error Taxonomy
//!
//! Three tiers: configuration errors are fatal and surface before the run
//! starts, generator errors are scoped to one source for one tick or
//! incident and only degrade that source's contribution, write errors are
//! fatal once draining has begun. The core performs no retries.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal configuration problems, raised before the engine enters `Running`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("simulation window is not monotonic: start {start} must precede end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("service catalog is empty")]
    EmptyServiceCatalog,

    #[error("incident catalog is empty")]
    EmptyIncidentCatalog,

    #[error("incident type '{incident_type}' has invalid duration range {min}..={max} minutes")]
    InvalidDurationRange {
        incident_type: String,
        min: u32,
        max: u32,
    },

    #[error("incident type '{incident_type}' has negative probability {probability}")]
    NegativeProbability {
        incident_type: String,
        probability: f64,
    },

    #[error("incident catalog has zero total probability weight")]
    ZeroProbabilityMass,

    #[error("generation parameter '{name}' must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("failed to read config file {path}: {cause}")]
    Read { path: PathBuf, cause: std::io::Error },

    #[error("failed to parse config file {path}: {cause}")]
    Parse {
        path: PathBuf,
        cause: toml::de::Error,
    },
}

/// Recoverable failure of one source generator for one tick or incident.
///
/// The scheduler logs these and continues; the failing source simply
/// contributes no records for that unit of work.
#[derive(Debug, Error)]
#[error("{source_name} generator failed: {message}")]
pub struct GeneratorError {
    pub source_name: &'static str,
    pub message: String,
}

impl GeneratorError {
    pub fn new(source_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            source_name,
            message: message.into(),
        }
    }
}

/// Fatal output failure during the draining phase.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path}: {cause}")]
    Io { path: PathBuf, cause: std::io::Error },

    #[error("failed to encode record for {path}: {cause}")]
    Encode {
        path: PathBuf,
        cause: serde_json::Error,
    },
}

/// Top-level error surfaced by a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
