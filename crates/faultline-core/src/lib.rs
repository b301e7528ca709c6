//! # faultline-core - Incident Telemetry Simulation Core
//!
//! Data model and deterministic building blocks for the faultline simulator:
//! temporal pattern generators, the cross-source correlation engine with its
//! named incident recipes, configuration loading/validation, and the error
//! taxonomy shared with the orchestration crate.
//!
//! Everything here is pure with respect to time and randomness: callers pass
//! the simulated timestamp and a seeded `StdRng`, so a fixed seed and window
//! replay byte-identical output. No wall-clock reads, no thread RNG, no I/O.

pub mod config;
pub mod correlate;
pub mod error;
pub mod ids;
pub mod incident;
pub mod patterns;

pub use config::{GenerationParams, IncidentSpec, ServiceSpec, SimulationConfig};
pub use correlate::CorrelationEngine;
pub use error::{ConfigError, GeneratorError, SimError, WriteError};
pub use incident::{
    Incident, IncidentEvent, IncidentIndex, IncidentIndexEntry, Severity, Source, WireRecord,
};
pub use patterns::RecoveryMode;
