//! Incident Data Model
//!
//! An [`Incident`] is a scripted, time-bounded fault spanning all four
//! telemetry sources, identified by a shared correlation id. Its
//! [`IncidentEvent`]s are placed on the incident's internal timeline by the
//! correlation engine and are immutable once appended; the incident itself
//! is frozen once it is handed to the scheduler.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The four telemetry sources a run fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Kubernetes,
    Sentry,
    Cloudwatch,
    Grafana,
}

impl Source {
    /// Fixed iteration order for stream accumulation and output.
    pub const ALL: [Source; 4] = [
        Source::Kubernetes,
        Source::Sentry,
        Source::Cloudwatch,
        Source::Grafana,
    ];

    /// Stream name used for output directories and the incident index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Kubernetes => "kubernetes",
            Source::Sentry => "sentry",
            Source::Cloudwatch => "cloudwatch",
            Source::Grafana => "grafana",
        }
    }

    /// Event-id prefix for this source.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Source::Kubernetes => "k8s",
            Source::Sentry => "sentry",
            Source::Cloudwatch => "cw",
            Source::Grafana => "grafana",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident severity, ordered least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    #[default]
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A single event on an incident's timeline.
///
/// Immutable once created; owned by the incident that created it and never
/// shared across incidents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub event_id: String,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub severity: Severity,
    /// Opaque key-value payload; keys are kept sorted for stable encoding.
    pub data: Map<String, Value>,
    pub correlation_id: String,
    pub incident_id: String,
}

/// A complete incident across all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub incident_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub severity: Severity,
    /// Non-empty; the first entry is the root-cause service.
    pub affected_services: Vec<String>,
    /// Append-only, ordered by insertion. Event timestamps may precede
    /// `start_time`: lead-up warnings are part of the model.
    pub events: Vec<IncidentEvent>,
    pub correlation_id: String,
    pub root_cause_service: Option<String>,
    pub cascading_failures: Vec<String>,
}

impl Incident {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Timestamp at the given fraction of the incident's duration.
    pub fn at_fraction(&self, fraction: f64) -> DateTime<Utc> {
        let millis = self.duration().num_milliseconds() as f64 * fraction;
        self.start_time + Duration::milliseconds(millis as i64)
    }

    /// Scripted events belonging to one source, in insertion order.
    pub fn events_for(&self, source: Source) -> impl Iterator<Item = &IncidentEvent> {
        self.events.iter().filter(move |e| e.source == source)
    }
}

/// One rendered stream record: the payload that goes on the wire plus the
/// timestamp sinks need for sorting and day partitioning. The timestamp
/// duplicates whatever time field the payload carries so sinks never have
/// to re-parse source-specific shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRecord {
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl WireRecord {
    pub fn new(timestamp: DateTime<Utc>, payload: Value) -> Self {
        Self { timestamp, payload }
    }
}

/// Entry of the incident index written once at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentIndexEntry {
    pub incident_id: String,
    pub incident_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub severity: Severity,
    pub affected_services: Vec<String>,
    pub correlation_id: String,
    pub event_count: usize,
}

impl From<&Incident> for IncidentIndexEntry {
    fn from(incident: &Incident) -> Self {
        Self {
            incident_id: incident.incident_id.clone(),
            incident_type: incident.incident_type.clone(),
            start_time: incident.start_time,
            end_time: incident.end_time,
            severity: incident.severity,
            affected_services: incident.affected_services.clone(),
            correlation_id: incident.correlation_id.clone(),
            event_count: incident.events.len(),
        }
    }
}

/// The sole interface consumed by the downstream correlation demo: metadata
/// for every incident produced in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentIndex {
    pub incidents: Vec<IncidentIndexEntry>,
}
