//! # faultline-sim - Incident Telemetry Simulator
//!
//! Drives a virtual clock across a requested window, emitting background
//! observability noise between scheduled incidents and fanning each incident
//! out across four telemetry sources (Kubernetes, Sentry, CloudWatch,
//! Grafana) with shared correlation ids, so a downstream clustering consumer
//! can recover every incident from the raw streams alone.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    SimulationEngine                        │
//! │  ┌────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │  Schedule  │  │ Correlation  │  │  Source Generators │  │
//! │  │  (timing)  │──│   Engine     │──│  (4 behind 1 trait)│  │
//! │  └────────────┘  └──────────────┘  └────────────────────┘  │
//! │         │                │                   │             │
//! │         └────────────────┼───────────────────┘             │
//! │                          ▼                                 │
//! │                  ┌───────────────┐                         │
//! │                  │  OutputSink   │  NDJSON / gzip, per-day │
//! │                  │  + index JSON │  per-source partitions  │
//! │                  └───────────────┘                         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything random flows through one seeded `StdRng`, so a fixed seed,
//! window, and configuration replay byte-identical streams and index.

pub mod engine;
pub mod output;
pub mod sources;

mod data;

pub use engine::{RunState, RunSummary, ScheduleEntry, SimulationEngine};
pub use output::{DirectorySink, MemorySink, OutputSink};
pub use sources::{SourceGenerator, default_generators};
