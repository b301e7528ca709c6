//! Grafana Source Generator
//!
//! Renders dashboard panel query results (PromQL expression, datapoints,
//! panel metadata), annotations, and the per-panel base values the normal
//! operation stream samples around. Panel ids are a stable hash of the
//! panel title so re-runs keep ids identical.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde_json::{Value, json};

use faultline_core::{
    GeneratorError, Incident, RecoveryMode, ServiceSpec, SimulationConfig, Source, WireRecord,
    patterns,
};

use super::{SourceGenerator, epoch_millis};

const DASHBOARDS: &[(&str, &[&str])] = &[
    (
        "Infrastructure Overview",
        &["CPU Usage", "Memory Usage", "Network Traffic", "Disk I/O", "Pod Count", "Node Status"],
    ),
    (
        "Application Performance",
        &["Request Rate", "Response Time P95", "Response Time P99", "Error Rate", "Success Rate", "Throughput"],
    ),
    (
        "Database Metrics",
        &["Query Duration", "Connection Pool Usage", "Active Connections", "Query Rate", "Cache Hit Rate", "Deadlocks"],
    ),
    (
        "JVM Metrics",
        &["JVM Heap Usage", "GC Time", "GC Count", "Thread Count"],
    ),
];

pub struct GrafanaGenerator {
    services: BTreeMap<String, ServiceSpec>,
}

impl GrafanaGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            services: config.services.clone(),
        }
    }

    /// One panel query result document.
    fn panel_result(
        &self,
        timestamp: DateTime<Utc>,
        panel_name: &str,
        service: &str,
        value: f64,
        correlation: Option<(&str, &str)>,
    ) -> Value {
        let expr = prometheus_query(panel_name, service);
        let mut tags = json!({
            "service": service,
            "environment": "production",
            "cluster": "production-us-east-1",
        });
        if let Some((correlation_id, incident_id)) = correlation {
            tags["correlation_id"] = json!(correlation_id);
            tags["incident_id"] = json!(incident_id);
        }

        json!({
            "dashboard": dashboard_for_panel(panel_name),
            "panel": {
                "id": panel_id(panel_name),
                "title": panel_name,
                "type": panel_type(panel_name),
                "datasource": "Prometheus",
            },
            "target": {
                "expr": expr,
                "legendFormat": format!("{service} - {panel_name}"),
                "refId": "A",
            },
            "datapoints": [[value, epoch_millis(timestamp)]],
            "unit": panel_unit(panel_name),
            "tags": tags,
            "meta": {
                "executedQueryString": expr,
                "preferredVisualisationType": "graph",
            },
        })
    }

    /// Dashboard annotation marking an incident.
    fn annotation(&self, rng: &mut StdRng, incident: &Incident) -> Value {
        json!({
            "id": rng.random_range(1000..10_000u32),
            "dashboardId": panel_id("Application Performance"),
            "panelId": Value::Null,
            "time": epoch_millis(incident.start_time),
            "timeEnd": epoch_millis(incident.start_time + Duration::minutes(1)),
            "title": format!("Incident: {}", incident.incident_type),
            "text": format!(
                "Incident {} started affecting {}",
                incident.incident_id,
                incident.affected_services.join(", ")
            ),
            "tags": ["incident", incident.incident_type.as_str(), incident.severity.as_str()],
            "type": "annotation",
            "correlationId": incident.correlation_id,
            "incidentId": incident.incident_id,
        })
    }

    /// Fallback for unscripted incident types: an annotation at onset plus a
    /// success-rate dip that recovers logarithmically over the last 40% of
    /// the window.
    fn fallback_incident_records(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Vec<WireRecord> {
        let service = incident
            .root_cause_service
            .as_deref()
            .unwrap_or("user-service");
        let correlation = (incident.correlation_id.as_str(), incident.incident_id.as_str());

        let mut records = vec![WireRecord::new(
            incident.start_time,
            self.annotation(rng, incident),
        )];

        let failure_time = incident.at_fraction(0.6);
        let recovery_secs = incident.duration().num_seconds().max(60) as f64 * 0.4;
        for (timestamp, health) in
            patterns::recovery(failure_time, RecoveryMode::Gradual, recovery_secs)
        {
            let timestamp = timestamp.min(incident.end_time);
            let success_rate = 90.0 + 10.0 * health;
            records.push(WireRecord::new(
                timestamp,
                self.panel_result(
                    timestamp,
                    "Success Rate",
                    service,
                    success_rate,
                    Some(correlation),
                ),
            ));
        }
        records
    }
}

impl SourceGenerator for GrafanaGenerator {
    fn source(&self) -> Source {
        Source::Grafana
    }

    fn generate_for_incident(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError> {
        let scripted: Vec<_> = incident.events_for(Source::Grafana).collect();
        if scripted.is_empty() {
            return Ok(self.fallback_incident_records(incident, rng));
        }

        let records = scripted
            .iter()
            .map(|event| {
                let panel_name = event.data["panel_name"].as_str().unwrap_or("Error Rate");
                let value = event.data["metric_value"].as_f64().unwrap_or(0.0);
                let service = event.data["service"].as_str().unwrap_or("unknown");
                let payload = self.panel_result(
                    event.timestamp,
                    panel_name,
                    service,
                    value,
                    Some((&event.correlation_id, &event.incident_id)),
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
        let all_panels: Vec<&str> = DASHBOARDS
            .iter()
            .flat_map(|(_, panels)| panels.iter().copied())
            .collect();

        let mut records = Vec::new();
        for service in services {
            if !self.services.contains_key(service) {
                continue;
            }
            for _ in 0..3 {
                let panel_name = all_panels.choose(rng).unwrap_or(&"CPU Usage");
                let base = panel_base_value(panel_name);
                let value = (base + base * rng.random_range(-0.05..0.05)).max(0.0);
                records.push(WireRecord::new(
                    timestamp,
                    self.panel_result(timestamp, panel_name, service, value, None),
                ));
            }
        }
        Ok(records)
    }
}

/// Stable FNV-1a panel id, independent of hasher seeds across runs.
fn panel_id(panel_name: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in panel_name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash % 10_000
}

fn dashboard_for_panel(panel_name: &str) -> &'static str {
    DASHBOARDS
        .iter()
        .find(|(_, panels)| panels.contains(&panel_name))
        .map(|(dashboard, _)| *dashboard)
        .unwrap_or("Application Performance")
}

fn panel_type(panel_name: &str) -> &'static str {
    let lower = panel_name.to_lowercase();
    if lower.contains("usage") || lower.contains("utilization") {
        "gauge"
    } else if lower.contains("status") {
        "stat"
    } else {
        "graph"
    }
}

fn panel_unit(panel_name: &str) -> &'static str {
    let lower = panel_name.to_lowercase();
    if lower.contains("rate") && !lower.contains("error") && !lower.contains("success") {
        "reqps"
    } else if lower.contains("time") || lower.contains("duration") {
        "ms"
    } else if lower.contains("usage") || lower.contains("utilization") || lower.contains("error")
        || lower.contains("success") || lower.contains("pool")
    {
        "percent"
    } else if lower.contains("count") {
        "count"
    } else if lower.contains("traffic") {
        "bytes"
    } else {
        "none"
    }
}

fn panel_base_value(panel_name: &str) -> f64 {
    match panel_name {
        "CPU Usage" => 35.0,
        "Memory Usage" => 50.0,
        "Request Rate" => 150.0,
        "Response Time P95" => 120.0,
        "Response Time P99" => 250.0,
        "Error Rate" => 0.5,
        "Success Rate" => 99.5,
        "Query Duration" => 45.0,
        "Connection Pool Usage" => 40.0,
        "Cache Hit Rate" => 92.0,
        "JVM Heap Usage" => 55.0,
        "GC Time" => 0.02,
        "Pod Count" => 5.0,
        "Network Traffic" => 1_024_000.0,
        _ => 50.0,
    }
}

fn prometheus_query(panel_name: &str, service: &str) -> String {
    match panel_name {
        "CPU Usage" => format!(
            "rate(container_cpu_usage_seconds_total{{pod=~\"{service}.*\"}}[5m]) * 100"
        ),
        "Memory Usage" => format!(
            "container_memory_usage_bytes{{pod=~\"{service}.*\"}} / container_spec_memory_limit_bytes * 100"
        ),
        "Request Rate" => format!("rate(http_requests_total{{service=\"{service}\"}}[5m])"),
        "Response Time P95" => format!(
            "histogram_quantile(0.95, rate(http_request_duration_seconds_bucket{{service=\"{service}\"}}[5m]))"
        ),
        "Response Time P99" => format!(
            "histogram_quantile(0.99, rate(http_request_duration_seconds_bucket{{service=\"{service}\"}}[5m]))"
        ),
        "Error Rate" => format!(
            "rate(http_requests_total{{service=\"{service}\",status=~\"5..\"}}[5m]) / rate(http_requests_total{{service=\"{service}\"}}[5m]) * 100"
        ),
        "Success Rate" => format!(
            "rate(http_requests_total{{service=\"{service}\",status=~\"2..\"}}[5m]) / rate(http_requests_total{{service=\"{service}\"}}[5m]) * 100"
        ),
        "Connection Pool Usage" | "Database Connection Pool" => format!(
            "pgbouncer_pools_cl_active{{database=\"{service}\"}} / pgbouncer_pools_cl_max * 100"
        ),
        "Cache Hit Rate" => "redis_keyspace_hits_total / (redis_keyspace_hits_total + redis_keyspace_misses_total) * 100".to_string(),
        "JVM Heap Usage" => format!(
            "jvm_memory_used_bytes{{area=\"heap\",service=\"{service}\"}} / jvm_memory_max_bytes{{area=\"heap\"}} * 100"
        ),
        "GC Time" => format!("rate(jvm_gc_collection_seconds_sum{{service=\"{service}\"}}[5m])"),
        "Pod Count" => format!(
            "count(kube_pod_info{{namespace=\"production\",pod=~\"{service}.*\"}})"
        ),
        "Network Traffic" => format!(
            "rate(container_network_receive_bytes_total{{pod=~\"{service}.*\"}}[5m])"
        ),
        _ => format!("up{{service=\"{service}\"}}"),
    }
}
