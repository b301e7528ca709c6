//! Sentry Source Generator
//!
//! Renders complete error-tracking events: exception values with stack
//! traces, breadcrumbs, user/request/runtime contexts, tags, fingerprint,
//! and SDK block. Incident records carry the correlation id in both `tags`
//! and `extra` so the downstream join works off either field.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde_json::{Map, Value, json};

use faultline_core::{
    GeneratorError, Incident, ServiceSpec, SimulationConfig, Source, WireRecord, ids, patterns,
};

use super::{SourceGenerator, iso};
use crate::data;

const PLATFORMS: &[(&str, &str, &str)] = &[
    ("python", "CPython", "3.11.6"),
    ("node", "Node.js", "18.17.0"),
    ("java", "Java", "17.0.8"),
];

pub struct SentryGenerator {
    services: BTreeMap<String, ServiceSpec>,
    project: String,
    organization: String,
}

impl SentryGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            services: config.services.clone(),
            project: "production-backend".to_string(),
            organization: "company".to_string(),
        }
    }

    fn release(&self, rng: &mut StdRng, service: &str) -> String {
        self.services
            .get(service)
            .and_then(|spec| spec.image.as_deref())
            .and_then(|image| image.split(':').next_back())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "v{}.{}.{}",
                    rng.random_range(1..=5u32),
                    rng.random_range(0..=20u32),
                    rng.random_range(0..=50u32)
                )
            })
    }

    fn transaction_name(&self, rng: &mut StdRng, service: &str) -> String {
        let endpoint = self
            .services
            .get(service)
            .and_then(|spec| spec.endpoints.choose(rng).cloned())
            .unwrap_or_else(|| "/".to_string());
        let method = *["GET", "POST", "PUT", "DELETE"].choose(rng).unwrap_or(&"GET");
        format!("{method} {endpoint}")
    }

    /// One complete error event document.
    #[allow(clippy::too_many_arguments)]
    fn error_event(
        &self,
        rng: &mut StdRng,
        timestamp: DateTime<Utc>,
        error_type: &str,
        service: &str,
        message: &str,
        level: &str,
        mut tags: Map<String, Value>,
        extra: Map<String, Value>,
    ) -> Value {
        let (platform, runtime_name, runtime_version) =
            *PLATFORMS.choose(rng).unwrap_or(&PLATFORMS[0]);
        let server_name = ids::pod_name(rng, service);
        let received_lag = rng.random_range(10..100i64);
        let breadcrumb_count = rng.random_range(5..15usize);
        let user_context = if rng.random_bool(0.7) {
            json!({ "id": data::user_id(rng), "ip_address": data::ip_address(rng) })
        } else {
            json!({})
        };
        let request_url = format!(
            "https://api.company.com{}",
            self.services
                .get(service)
                .and_then(|spec| spec.endpoints.choose(rng).cloned())
                .unwrap_or_else(|| "/".to_string())
        );

        tags.insert("environment".into(), json!("production"));
        tags.insert("server_name".into(), json!(server_name.clone()));
        tags.insert("service".into(), json!(service));
        tags.insert("error_type".into(), json!(error_type));
        tags.insert("category".into(), json!(error_category(error_type)));

        json!({
            "event_id": ids::uuid_simple(rng),
            "timestamp": iso(timestamp),
            "received": iso(timestamp + Duration::milliseconds(received_lag)),
            "platform": platform,
            "level": level,
            "logger": logger_name(rng, service, platform),
            "transaction": self.transaction_name(rng, service),
            "server_name": server_name,
            "release": self.release(rng, service),
            "environment": "production",
            "message": { "formatted": message, "message": message },
            "exception": {
                "values": [{
                    "type": error_type,
                    "value": message,
                    "module": module_name(service, platform, error_type),
                    "stacktrace": { "frames": data::stack_frames(rng, service) },
                    "mechanism": {
                        "type": "generic",
                        "handled": rng.random_bool(0.5),
                        "synthetic": false,
                    },
                }],
            },
            "breadcrumbs": {
                "values": data::breadcrumbs(rng, breadcrumb_count),
            },
            "user": user_context,
            "request": {
                "url": request_url,
                "headers": {
                    "User-Agent": data::user_agent(rng),
                    "X-Request-Id": data::request_id(rng),
                    "X-Forwarded-For": data::ip_address(rng),
                },
            },
            "contexts": {
                "runtime": { "name": runtime_name, "version": runtime_version, "type": "runtime" },
                "os": {
                    "name": "Linux",
                    "version": "5.15.0-1040-aws",
                    "type": "os",
                },
                "trace": {
                    "trace_id": ids::trace_id(rng),
                    "span_id": ids::span_id(rng),
                    "type": "trace",
                },
            },
            "tags": tags,
            "extra": extra,
            "fingerprint": [error_type, service],
            "sdk": {
                "name": format!("sentry.{platform}"),
                "version": "1.31.0",
            },
            "project": self.project,
            "culprit": format!("{}.handlers.request_handler", service.replace('-', "_")),
            "organization": self.organization,
        })
    }

    fn correlation_fields(incident: &Incident) -> (Map<String, Value>, Map<String, Value>) {
        let mut tags = Map::new();
        tags.insert("correlation_id".into(), json!(incident.correlation_id));
        let mut extra = Map::new();
        extra.insert("incident_id".into(), json!(incident.incident_id));
        extra.insert("correlation_id".into(), json!(incident.correlation_id));
        (tags, extra)
    }

    /// Fallback for unscripted incident types: a Gaussian burst of runtime
    /// errors centered mid-incident.
    fn fallback_incident_records(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Vec<WireRecord> {
        let service = incident
            .root_cause_service
            .as_deref()
            .unwrap_or("user-service");
        let duration_secs = incident.duration().num_seconds().max(60) as f64;
        let window = duration_secs.min(600.0);
        let center = incident.at_fraction(0.5);

        let mut timestamps = patterns::burst(rng, center, window, 8.5 / window);
        if timestamps.is_empty() {
            timestamps.push(incident.start_time);
        }

        timestamps
            .into_iter()
            .map(|timestamp| {
                let timestamp = timestamp.clamp(incident.start_time, incident.end_time);
                let (tags, extra) = Self::correlation_fields(incident);
                let message = format!(
                    "Upstream dependency degraded during {}",
                    incident.incident_type
                );
                let payload = self.error_event(
                    rng,
                    timestamp,
                    "ServiceDegradedError",
                    service,
                    &message,
                    "error",
                    tags,
                    extra,
                );
                WireRecord::new(timestamp, payload)
            })
            .collect()
    }
}

impl SourceGenerator for SentryGenerator {
    fn source(&self) -> Source {
        Source::Sentry
    }

    fn generate_for_incident(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError> {
        let scripted: Vec<_> = incident.events_for(Source::Sentry).collect();
        if scripted.is_empty() {
            return Ok(self.fallback_incident_records(incident, rng));
        }

        let records = scripted
            .iter()
            .map(|event| {
                let service = event.data["service"].as_str().unwrap_or("unknown");
                let message = event.data["error_message"]
                    .as_str()
                    .unwrap_or("An unexpected error occurred");

                let (mut tags, extra) = Self::correlation_fields(incident);
                // Scripted tag severities (e.g. escalation after the third
                // allocation failure) override the event level.
                let mut level = "error";
                if let Some(scripted_tags) =
                    event.data.get("tags").and_then(Value::as_object)
                {
                    for (key, value) in scripted_tags {
                        tags.insert(key.clone(), value.clone());
                    }
                    if let Some(severity) = scripted_tags.get("severity").and_then(Value::as_str) {
                        level = if severity == "warning" { "warning" } else { "error" };
                    }
                }

                let payload = self.error_event(
                    rng,
                    event.timestamp,
                    &event.event_type,
                    service,
                    message,
                    level,
                    tags,
                    extra,
                );
                WireRecord::new(event.timestamp, payload)
            })
            .collect();
        Ok(records)
    }

    fn generate_normal_operation(
        &self,
        timestamp: DateTime<Utc>,
        services: &[String],
        _count: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError> {
        let mut records = Vec::new();
        for service in services {
            // Error tracking is quiet in steady state: most batches emit
            // nothing for a healthy service.
            if !rng.random_bool(0.2) {
                continue;
            }
            for _ in 0..2 {
                let (level, error_type, message) = if rng.random_bool(0.8) {
                    (
                        "warning",
                        *["DeprecationWarning", "UserWarning", "ResourceWarning"]
                            .choose(rng)
                            .unwrap_or(&"UserWarning"),
                        *[
                            "Slow database query detected",
                            "Cache miss rate above threshold",
                            "High memory usage detected",
                            "Deprecated API endpoint used",
                        ]
                        .choose(rng)
                        .unwrap_or(&"Slow database query detected"),
                    )
                } else {
                    (
                        "error",
                        *["TransientError", "RetryableError"]
                            .choose(rng)
                            .unwrap_or(&"TransientError"),
                        *[
                            "Temporary connection error (retrying)",
                            "Request timeout (will retry)",
                            "Service temporarily unavailable",
                        ]
                        .choose(rng)
                        .unwrap_or(&"Temporary connection error (retrying)"),
                    )
                };

                let payload = self.error_event(
                    rng,
                    timestamp,
                    error_type,
                    service,
                    message,
                    level,
                    Map::new(),
                    Map::new(),
                );
                records.push(WireRecord::new(timestamp, payload));
            }
        }
        Ok(records)
    }
}

fn error_category(error_type: &str) -> &'static str {
    if error_type.contains("Database")
        || error_type.contains("SQL")
        || error_type.contains("Pool")
        || error_type.contains("Connection")
    {
        "database"
    } else if error_type.contains("Memory") || error_type.contains("OOM") {
        "memory"
    } else if error_type.contains("Timeout") {
        "performance"
    } else if error_type.contains("HTTP") || error_type.contains("Status") {
        "http"
    } else {
        "application"
    }
}

fn logger_name(rng: &mut StdRng, service: &str, platform: &str) -> String {
    match platform {
        "python" => {
            if rng.random_bool(0.5) {
                format!("{}.handlers", service.replace('-', "_"))
            } else {
                (*["uvicorn.error", "gunicorn.error", "django.request", "flask.app"]
                    .choose(rng)
                    .unwrap_or(&"uvicorn.error"))
                .to_string()
            }
        }
        "node" => format!("{service}.controller"),
        _ => format!("com.company.{}.service", service.replace('-', "_")),
    }
}

fn module_name(service: &str, platform: &str, error_type: &str) -> String {
    match platform {
        "python" => {
            if error_type.contains("Database") || error_type.contains("Pool") {
                "sqlalchemy.pool".to_string()
            } else if error_type.contains("Connection") || error_type.contains("Timeout") {
                "urllib3.connectionpool".to_string()
            } else {
                format!("app.{}.handlers", service.replace('-', "_"))
            }
        }
        "node" => format!("{service}/lib/index"),
        _ => format!("com.company.{}.Main", service.replace('-', "_")),
    }
}
