//! Kubernetes Source Generator
//!
//! Renders `v1 Event` objects and pod log entries. Incident events carry
//! the correlation id in `metadata.annotations`; background pod logs mimic
//! the zoo of real application log formats (JSON, logfmt, python-style,
//! plain) that log shippers actually collect.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde_json::{Map, Value, json};

use faultline_core::patterns::DEFAULT_PROPAGATION_DELAYS;
use faultline_core::{
    GeneratorError, Incident, ServiceSpec, SimulationConfig, Source, WireRecord, ids, patterns,
};

use super::{SourceGenerator, iso};
use crate::data;

const EVENT_COMPONENTS: &[&str] = &[
    "kubelet",
    "default-scheduler",
    "controller-manager",
    "kube-apiserver",
];

pub struct KubernetesGenerator {
    services: BTreeMap<String, ServiceSpec>,
}

impl KubernetesGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            services: config.services.clone(),
        }
    }

    fn namespace(&self, service: &str) -> &str {
        self.services
            .get(service)
            .map(|spec| spec.namespace.as_str())
            .unwrap_or("production")
    }

    fn version_label(&self, service: &str) -> String {
        self.services
            .get(service)
            .and_then(|spec| spec.image.as_deref())
            .and_then(|image| image.split(':').next_back())
            .unwrap_or("unknown")
            .to_string()
    }

    /// A `v1 Event` document for one pod.
    #[allow(clippy::too_many_arguments)]
    fn event_record(
        &self,
        rng: &mut StdRng,
        timestamp: DateTime<Utc>,
        reason: &str,
        message: &str,
        service: &str,
        pod_name: &str,
        kind: &str,
        correlation: Option<(&str, &str)>,
    ) -> Value {
        let namespace = self.namespace(service);
        let mut metadata = json!({
            "name": format!("{pod_name}.{}", ids::hex(rng, 16)),
            "namespace": namespace,
            "creationTimestamp": iso(timestamp),
            "resourceVersion": rng.random_range(100_000..1_000_000u32).to_string(),
        });
        if let Some((correlation_id, incident_id)) = correlation {
            metadata["annotations"] = json!({
                "correlation-id": correlation_id,
                "incident-id": incident_id,
            });
        }

        json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": metadata,
            "involvedObject": {
                "kind": "Pod",
                "namespace": namespace,
                "name": pod_name,
                "uid": ids::uuid(rng).to_string(),
                "apiVersion": "v1",
                "resourceVersion": rng.random_range(100_000..1_000_000u32).to_string(),
                "fieldPath": format!("spec.containers{{{service}}}"),
            },
            "reason": reason,
            "message": message,
            "source": {
                "component": EVENT_COMPONENTS.choose(rng).unwrap_or(&"kubelet"),
                "host": data::node_name(rng),
            },
            "firstTimestamp": iso(timestamp),
            "lastTimestamp": iso(timestamp),
            "count": 1,
            "type": kind,
        })
    }

    /// A collected pod log line with its kubernetes metadata block.
    fn pod_log_record(
        &self,
        rng: &mut StdRng,
        timestamp: DateTime<Utc>,
        service: &str,
        pod_name: &str,
        level: &str,
        message: &str,
        context: Option<&Map<String, Value>>,
    ) -> Value {
        json!({
            "timestamp": iso(timestamp),
            "stream": if rng.random_bool(0.8) { "stdout" } else { "stderr" },
            "log": application_log_line(rng, timestamp, level, message, context),
            "kubernetes": {
                "pod_name": pod_name,
                "namespace_name": self.namespace(service),
                "container_name": service,
                "container_id": format!("docker://{}", data::container_id(rng)),
                "pod_id": ids::uuid(rng).to_string(),
                "labels": {
                    "app": service,
                    "version": self.version_label(service),
                    "environment": "production",
                    "tier": "backend",
                },
                "host": data::node_name(rng),
            },
        })
    }

    /// Fallback for incident types without a scripted orchestration
    /// sequence: a short causal chain of warning, back-off, restart inside
    /// the incident window.
    fn fallback_incident_records(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Vec<WireRecord> {
        let service = incident
            .root_cause_service
            .as_deref()
            .unwrap_or("user-service");
        let pod_name = ids::pod_name(rng, service);
        let chain = patterns::causal_chain(
            rng,
            incident.start_time,
            2,
            &DEFAULT_PROPAGATION_DELAYS,
        );
        let correlation = (incident.correlation_id.as_str(), incident.incident_id.as_str());

        let steps = [
            (
                incident.incident_type.as_str(),
                format!("Incident detected: {}", incident.incident_type),
                "Warning",
            ),
            (
                "BackOff",
                format!("Back-off restarting degraded container {service}"),
                "Warning",
            ),
            (
                "Restarted",
                format!("Container {service} restarted"),
                "Normal",
            ),
        ];

        chain
            .iter()
            .zip(steps.iter())
            .map(|(timestamp, (reason, message, kind))| {
                let timestamp = (*timestamp).min(incident.end_time);
                let payload = self.event_record(
                    rng,
                    timestamp,
                    reason,
                    message,
                    service,
                    &pod_name,
                    kind,
                    Some(correlation),
                );
                WireRecord::new(timestamp, payload)
            })
            .collect()
    }
}

impl SourceGenerator for KubernetesGenerator {
    fn source(&self) -> Source {
        Source::Kubernetes
    }

    fn generate_for_incident(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError> {
        let scripted: Vec<_> = incident.events_for(Source::Kubernetes).collect();
        if scripted.is_empty() {
            return Ok(self.fallback_incident_records(incident, rng));
        }

        let records = scripted
            .iter()
            .map(|event| {
                let service = event.data["service"].as_str().unwrap_or("unknown");
                let pod_name = event.data["pod_name"].as_str().unwrap_or("unknown-pod");
                let reason = event
                    .data
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or(&event.event_type);
                let message = event
                    .data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Incident event");
                let kind = if event.event_type == "Restarted" {
                    "Normal"
                } else {
                    "Warning"
                };

                let mut payload = self.event_record(
                    rng,
                    event.timestamp,
                    reason,
                    message,
                    service,
                    pod_name,
                    kind,
                    Some((&event.correlation_id, &event.incident_id)),
                );
                if let Some(exit_code) = event.data.get("exit_code") {
                    payload["exitCode"] = exit_code.clone();
                }
                WireRecord::new(event.timestamp, payload)
            })
            .collect();
        Ok(records)
    }

    fn generate_normal_operation(
        &self,
        timestamp: DateTime<Utc>,
        services: &[String],
        count: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError> {
        let mut records = Vec::new();
        if services.is_empty() {
            return Ok(records);
        }
        let per_service = (count / services.len()).max(1);

        for service in services {
            let pod_name = ids::pod_name(rng, service);
            let endpoints = self
                .services
                .get(service)
                .map(|spec| spec.endpoints.clone())
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| vec!["/health".to_string()]);

            for _ in 0..per_service {
                let roll: f64 = rng.random();
                let payload = if roll < 0.5 {
                    // HTTP access log
                    let endpoint = endpoints.choose(rng).cloned().unwrap_or_default();
                    let method = *["GET", "POST", "PUT", "DELETE"].choose(rng).unwrap_or(&"GET");
                    let status = data::http_status_code(rng, 0.95);
                    let latency = data::latency_ms(rng);

                    let mut context = Map::new();
                    context.insert("http_method".into(), json!(method));
                    context.insert("http_path".into(), json!(endpoint));
                    context.insert("http_status".into(), json!(status));
                    context.insert("response_time_ms".into(), json!(latency));
                    context.insert("ip".into(), json!(data::ip_address(rng)));
                    context.insert("user_agent".into(), json!(data::user_agent(rng)));

                    self.pod_log_record(
                        rng,
                        timestamp,
                        service,
                        &pod_name,
                        "info",
                        &format!("{method} {endpoint} {status} {latency:.2}ms"),
                        Some(&context),
                    )
                } else if roll < 0.8 {
                    let message = *[
                        "Request processed successfully",
                        "Cache hit for key",
                        "Background task completed",
                        "Health check passed",
                        "Metrics exported successfully",
                    ]
                    .choose(rng)
                    .unwrap_or(&"Request processed successfully");
                    let mut context = Map::new();
                    context.insert("request_id".into(), json!(data::request_id(rng)));
                    self.pod_log_record(
                        rng, timestamp, service, &pod_name, "info", message, Some(&context),
                    )
                } else if roll < 0.95 {
                    let message = format!(
                        "Processing request with ID {}",
                        data::request_id(rng)
                    );
                    self.pod_log_record(
                        rng, timestamp, service, &pod_name, "debug", &message, None,
                    )
                } else {
                    // database query log
                    let query = data::sql_query(rng);
                    let duration: f64 = rng.random_range(10.0..500.0);
                    let mut context = Map::new();
                    context.insert("query".into(), json!(query));
                    context.insert("duration_ms".into(), json!(duration));
                    context.insert("rows_affected".into(), json!(rng.random_range(0..1000u32)));
                    self.pod_log_record(
                        rng,
                        timestamp,
                        service,
                        &pod_name,
                        "info",
                        &format!("Query executed: {query} (duration: {duration:.2}ms)"),
                        Some(&context),
                    )
                };
                records.push(WireRecord::new(timestamp, payload));
            }
        }
        Ok(records)
    }
}

/// Application log line in one of the formats real pods emit.
fn application_log_line(
    rng: &mut StdRng,
    timestamp: DateTime<Utc>,
    level: &str,
    message: &str,
    context: Option<&Map<String, Value>>,
) -> String {
    match rng.random_range(0..4u8) {
        0 => {
            // structured JSON logger
            let mut line = Map::new();
            line.insert("timestamp".into(), json!(iso(timestamp)));
            line.insert("level".into(), json!(level.to_uppercase()));
            line.insert("message".into(), json!(message));
            line.insert(
                "logger".into(),
                json!(
                    *[
                        "com.company.service.Controller",
                        "app.handlers.UserHandler",
                        "service.middleware.RequestLogger",
                        "app.database.ConnectionPool",
                    ]
                    .choose(rng)
                    .unwrap_or(&"app.handlers.UserHandler")
                ),
            );
            if let Some(context) = context {
                line.extend(context.clone());
            }
            line.insert("trace_id".into(), json!(ids::trace_id(rng)));
            line.insert("span_id".into(), json!(ids::span_id(rng)));
            Value::Object(line).to_string()
        }
        1 => {
            // logfmt
            let mut parts = vec![
                format!("time=\"{}\"", iso(timestamp)),
                format!("level={level}"),
                format!("msg=\"{message}\""),
            ];
            if let Some(context) = context {
                for (key, value) in context {
                    match value {
                        Value::String(s) => parts.push(format!("{key}=\"{s}\"")),
                        other => parts.push(format!("{key}={other}")),
                    }
                }
            }
            parts.join(" ")
        }
        2 => {
            // python logging style
            let logger = *[
                "uvicorn.access",
                "gunicorn.error",
                "django.request",
                "flask.app",
                "app.services.user",
            ]
            .choose(rng)
            .unwrap_or(&"uvicorn.access");
            format!(
                "{},{:03} {:8} [{logger}] {message}",
                timestamp.format("%Y-%m-%d %H:%M:%S"),
                timestamp.timestamp_subsec_millis(),
                level.to_uppercase(),
            )
        }
        _ => format!(
            "{} {} {message}",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            level.to_uppercase()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use faultline_core::{CorrelationEngine, Severity};
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_scripted_incident_renders_one_record_per_event() {
        let config = SimulationConfig::default();
        let generator = KubernetesGenerator::new(&config);
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);

        let incident = engine
            .create_memory_leak_incident(&mut rng, start(), "user-service", 60)
            .clone();
        let records = generator.generate_for_incident(&incident, &mut rng).unwrap();

        assert_eq!(records.len(), 4);
        for record in &records {
            assert_eq!(
                record.payload["metadata"]["annotations"]["correlation-id"],
                json!(incident.correlation_id)
            );
            assert_eq!(record.payload["kind"], json!("Event"));
        }
        // The OOM kill keeps its container exit code.
        assert!(records.iter().any(|r| r.payload["exitCode"] == json!(137)));
    }

    #[test]
    fn test_generic_incident_gets_fallback_chain() {
        let config = SimulationConfig::default();
        let generator = KubernetesGenerator::new(&config);
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);

        let known = config.service_names();
        let incident = engine
            .create_generic_incident(
                &mut rng,
                "service_degradation",
                start(),
                20,
                Severity::High,
                vec!["api-gateway".to_string()],
                &known,
            )
            .clone();
        let records = generator.generate_for_incident(&incident, &mut rng).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| {
            r.timestamp >= incident.start_time && r.timestamp <= incident.end_time
        }));
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_normal_operation_has_no_correlation_markers() {
        let config = SimulationConfig::default();
        let generator = KubernetesGenerator::new(&config);
        let mut rng = StdRng::seed_from_u64(42);

        let services = vec!["user-service".to_string(), "order-service".to_string()];
        let records = generator
            .generate_normal_operation(start(), &services, 10, &mut rng)
            .unwrap();

        assert_eq!(records.len(), 10);
        for record in &records {
            assert!(record.payload.get("metadata").is_none());
            assert!(record.payload["kubernetes"]["pod_name"].is_string());
            assert!(!record.payload.to_string().contains("correlation"));
        }
    }
}
