//! Source Generators
//!
//! One trait, four statically registered implementations — Kubernetes,
//! Sentry, CloudWatch, Grafana. Each renders source-specific wire payloads
//! either for an incident (honoring its services, window, and severity, and
//! embedding the correlation id in the payload itself) or for uncorrelated
//! background traffic. Generators perform no I/O and share no mutable
//! state; all randomness comes through the engine's seeded RNG.

pub mod cloudwatch;
pub mod grafana;
pub mod kubernetes;
pub mod sentry;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;

use faultline_core::{GeneratorError, Incident, SimulationConfig, Source, WireRecord};

pub use cloudwatch::CloudwatchGenerator;
pub use grafana::GrafanaGenerator;
pub use kubernetes::KubernetesGenerator;
pub use sentry::SentryGenerator;

/// The capability set every telemetry backend must satisfy.
pub trait SourceGenerator {
    /// Which stream this generator feeds.
    fn source(&self) -> Source;

    /// Render wire records for one incident: one record per scripted event
    /// of this source, or a fallback sequence inside the incident window
    /// when the incident carries no script for this source. Every record
    /// embeds the incident's correlation id.
    fn generate_for_incident(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError>;

    /// Render uncorrelated background records for the given services at the
    /// given count target.
    fn generate_normal_operation(
        &self,
        timestamp: DateTime<Utc>,
        services: &[String],
        count: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError>;
}

/// The four generators in fixed registration order (which is also stream
/// accumulation order).
pub fn default_generators(config: &SimulationConfig) -> Vec<Box<dyn SourceGenerator>> {
    vec![
        Box::new(KubernetesGenerator::new(config)),
        Box::new(SentryGenerator::new(config)),
        Box::new(CloudwatchGenerator::new(config)),
        Box::new(GrafanaGenerator::new(config)),
    ]
}

/// ISO-8601 with millisecond precision and a `Z` suffix — the timestamp
/// shape every payload uses.
pub(crate) fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn epoch_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}
