//! Cross-Source Correlation Engine
//!
//! Owns the run-scoped incident registry and the named scenario recipes.
//! A recipe places events for all four sources on one incident timeline,
//! expressed as fractions of the incident's total duration, and stamps every
//! event with the shared correlation id. Recipes are tie-break contracts:
//! the fractions and counts below are fixed, so the same seed, start time,
//! and duration reproduce an identical event set.
//!
//! The registry lives for exactly one run — created with the engine,
//! drained into the incident index when the run completes. It is a field,
//! not a process-wide singleton.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde_json::{Map, Value, json};

use crate::config::IncidentSpec;
use crate::ids;
use crate::incident::{Incident, IncidentEvent, IncidentIndex, Severity, Source};

/// Simplified downstream dependency map used for cascading failures.
const SERVICE_DEPENDENCIES: &[(&str, &[&str])] = &[
    ("api-gateway", &["user-service", "order-service", "product-service"]),
    ("order-service", &["payment-service", "user-service", "product-service"]),
    ("user-service", &["postgres-primary"]),
    ("payment-service", &["postgres-primary"]),
    ("product-service", &["redis-cache", "postgres-primary"]),
];

/// Generates correlated incidents across all four telemetry sources.
pub struct CorrelationEngine {
    incidents: Vec<Incident>,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self {
            incidents: Vec::new(),
        }
    }

    /// All incidents produced so far, in creation order.
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Drain the registry into the final incident index.
    pub fn into_index(self) -> IncidentIndex {
        IncidentIndex {
            incidents: self.incidents.iter().map(Into::into).collect(),
        }
    }

    /// Allocate a new incident record and its identifiers. The returned
    /// incident is not yet registered; recipes append events to it and then
    /// hand it to [`register`](Self::register).
    pub fn create_incident(
        &mut self,
        rng: &mut StdRng,
        incident_type: &str,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        severity: Severity,
        affected_services: Vec<String>,
    ) -> Incident {
        let root_cause_service = affected_services.first().cloned();
        Incident {
            incident_id: ids::incident_id(rng),
            incident_type: incident_type.to_string(),
            start_time,
            end_time: start_time + Duration::minutes(i64::from(duration_minutes)),
            severity,
            affected_services,
            events: Vec::new(),
            correlation_id: ids::correlation_id(rng),
            root_cause_service,
            cascading_failures: Vec::new(),
        }
    }

    /// Freeze an incident into the registry and return the stored copy.
    pub fn register(&mut self, incident: Incident) -> &Incident {
        self.incidents.push(incident);
        // push above guarantees non-empty
        self.incidents.last().unwrap()
    }

    /// Dispatch a schedule entry to its recipe, or to the generic fallback
    /// for types without a scripted cross-source recipe.
    pub fn materialize<'a>(
        &'a mut self,
        rng: &mut StdRng,
        incident_type: &str,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        spec: &IncidentSpec,
        known_services: &[String],
    ) -> &'a Incident {
        let service = spec
            .affected_services
            .choose(rng)
            .cloned()
            .or_else(|| known_services.first().cloned())
            .unwrap_or_else(|| "user-service".to_string());

        match incident_type {
            "memory_leak" => {
                self.create_memory_leak_incident(rng, start_time, &service, duration_minutes)
            }
            "deployment_failure" => {
                self.create_deployment_failure_incident(rng, start_time, &service, duration_minutes)
            }
            "database_connection_pool_exhaustion" => self
                .create_connection_pool_exhaustion_incident(
                    rng,
                    start_time,
                    &service,
                    duration_minutes,
                ),
            _ => self.create_generic_incident(
                rng,
                incident_type,
                start_time,
                duration_minutes,
                spec.severity,
                vec![service],
                known_services,
            ),
        }
    }

    // ------------------------------------------------------------------
    // Per-source event appenders
    // ------------------------------------------------------------------

    /// Append a container-orchestration event (pod warning, kill, restart).
    pub fn add_orchestration_event(
        &self,
        rng: &mut StdRng,
        incident: &mut Incident,
        timestamp: DateTime<Utc>,
        event_type: &str,
        service: &str,
        pod_name: &str,
        extra: Map<String, Value>,
    ) {
        let mut data = Map::new();
        data.insert("service".to_string(), json!(service));
        data.insert("pod_name".to_string(), json!(pod_name));
        data.insert("namespace".to_string(), json!("production"));
        data.insert("event_type".to_string(), json!(event_type));
        data.extend(extra);

        Self::push_event(rng, incident, Source::Kubernetes, timestamp, event_type, data);
    }

    /// Append an error-tracking issue event.
    pub fn add_error_event(
        &self,
        rng: &mut StdRng,
        incident: &mut Incident,
        timestamp: DateTime<Utc>,
        error_type: &str,
        service: &str,
        error_message: &str,
        extra: Map<String, Value>,
    ) {
        let mut data = Map::new();
        data.insert("service".to_string(), json!(service));
        data.insert("error_type".to_string(), json!(error_type));
        data.insert("error_message".to_string(), json!(error_message));
        data.insert("environment".to_string(), json!("production"));
        data.extend(extra);

        Self::push_event(rng, incident, Source::Sentry, timestamp, error_type, data);
    }

    /// Append a cloud-metric datapoint event.
    pub fn add_metric_event(
        &self,
        rng: &mut StdRng,
        incident: &mut Incident,
        timestamp: DateTime<Utc>,
        metric_name: &str,
        metric_value: f64,
        service: &str,
        extra: Map<String, Value>,
    ) {
        let mut data = Map::new();
        data.insert("metric_name".to_string(), json!(metric_name));
        data.insert("metric_value".to_string(), json!(metric_value));
        data.insert("service".to_string(), json!(service));
        data.insert("namespace".to_string(), json!("AWS/ECS"));
        data.extend(extra);

        let event_type = format!("metric_anomaly_{metric_name}");
        Self::push_event(rng, incident, Source::Cloudwatch, timestamp, &event_type, data);
    }

    /// Append a dashboard panel sample event.
    pub fn add_panel_event(
        &self,
        rng: &mut StdRng,
        incident: &mut Incident,
        timestamp: DateTime<Utc>,
        panel_name: &str,
        metric_value: f64,
        service: &str,
        extra: Map<String, Value>,
    ) {
        let mut data = Map::new();
        data.insert("panel_name".to_string(), json!(panel_name));
        data.insert("metric_value".to_string(), json!(metric_value));
        data.insert("service".to_string(), json!(service));
        data.insert("dashboard".to_string(), json!("Production Monitoring"));
        data.extend(extra);

        let event_type = format!("panel_alert_{panel_name}");
        Self::push_event(rng, incident, Source::Grafana, timestamp, &event_type, data);
    }

    fn push_event(
        rng: &mut StdRng,
        incident: &mut Incident,
        source: Source,
        timestamp: DateTime<Utc>,
        event_type: &str,
        data: Map<String, Value>,
    ) {
        incident.events.push(IncidentEvent {
            event_id: ids::prefixed(rng, source.id_prefix(), 12),
            source,
            timestamp,
            event_type: event_type.to_string(),
            severity: incident.severity,
            data,
            correlation_id: incident.correlation_id.clone(),
            incident_id: incident.incident_id.clone(),
        });
    }

    // ------------------------------------------------------------------
    // Named scenario recipes
    // ------------------------------------------------------------------

    /// Memory leak: dashboards see the heap climb first, cloud metrics
    /// follow, allocation errors start at 30% progress, and the pod is
    /// OOM-killed at 90% with a restart 5 seconds later.
    pub fn create_memory_leak_incident(
        &mut self,
        rng: &mut StdRng,
        start_time: DateTime<Utc>,
        service: &str,
        duration_minutes: u32,
    ) -> &Incident {
        let mut incident = self.create_incident(
            rng,
            "memory_leak",
            start_time,
            duration_minutes,
            Severity::Critical,
            vec![service.to_string()],
        );
        let pod_name = ids::pod_name(rng, service);

        let warning_time = incident.at_fraction(0.3);
        let critical_time = incident.at_fraction(0.7);
        let oom_time = incident.at_fraction(0.9);

        // Grafana: 10 heap samples over the first 70%, climbing 60 -> 95.
        for i in 0..10u32 {
            let fraction = f64::from(i) / 9.0;
            let timestamp = incident.at_fraction(0.7 * fraction);
            let heap_pct = 60.0 + 35.0 * fraction;
            self.add_panel_event(
                rng,
                &mut incident,
                timestamp,
                "JVM Heap Usage",
                heap_pct,
                service,
                Map::new(),
            );
        }

        // CloudWatch: 8 memory-utilization samples over the first 80%, 65 -> 98.
        for i in 0..8u32 {
            let fraction = f64::from(i) / 7.0;
            let timestamp = incident.at_fraction(0.8 * fraction);
            let memory_pct = 65.0 + 33.0 * fraction;
            self.add_metric_event(
                rng,
                &mut incident,
                timestamp,
                "MemoryUtilization",
                memory_pct,
                service,
                Map::new(),
            );
        }

        // Sentry: 5 allocation failures from 30% progress, 5 minutes apart,
        // escalating after the third.
        for i in 0..5u32 {
            let timestamp = warning_time + Duration::minutes(i64::from(i) * 5);
            let mb = rng.random_range(100..500);
            let tag = if i < 3 { "warning" } else { "error" };
            let mut extra = Map::new();
            extra.insert("tags".to_string(), json!({ "severity": tag }));
            self.add_error_event(
                rng,
                &mut incident,
                timestamp,
                "MemoryError",
                service,
                &format!("Cannot allocate {mb}MB of memory"),
                extra,
            );
        }

        // Kubernetes: warning, critical pressure, OOM kill, restart.
        let mut warn = Map::new();
        warn.insert("reason".to_string(), json!("HighMemoryUsage"));
        warn.insert("message".to_string(), json!("Memory usage at 85%"));
        self.add_orchestration_event(
            rng, &mut incident, warning_time, "Warning", service, &pod_name, warn,
        );

        let mut pressure = Map::new();
        pressure.insert("reason".to_string(), json!("MemoryPressure"));
        pressure.insert("message".to_string(), json!("Memory usage critical at 95%"));
        self.add_orchestration_event(
            rng, &mut incident, critical_time, "Warning", service, &pod_name, pressure,
        );

        let mut oom = Map::new();
        oom.insert("reason".to_string(), json!("OOMKilled"));
        oom.insert("message".to_string(), json!("Container killed due to OOM"));
        oom.insert("exit_code".to_string(), json!(137));
        self.add_orchestration_event(
            rng, &mut incident, oom_time, "OOMKilled", service, &pod_name, oom,
        );

        let restart_count = rng.random_range(1..=5u32);
        let mut restart = Map::new();
        restart.insert("reason".to_string(), json!("PodRestarted"));
        restart.insert(
            "message".to_string(),
            json!(format!("Container restarted, restart count: {restart_count}")),
        );
        self.add_orchestration_event(
            rng,
            &mut incident,
            oom_time + Duration::seconds(5),
            "Restarted",
            service,
            &pod_name,
            restart,
        );

        self.register(incident)
    }

    /// Deployment failure: a bad image and a missing env var — pull
    /// back-offs, crash loops, config errors, and a 5xx spike.
    pub fn create_deployment_failure_incident(
        &mut self,
        rng: &mut StdRng,
        start_time: DateTime<Utc>,
        service: &str,
        duration_minutes: u32,
    ) -> &Incident {
        let mut incident = self.create_incident(
            rng,
            "deployment_failure",
            start_time,
            duration_minutes,
            Severity::High,
            vec![service.to_string()],
        );
        let new_pod = format!("{service}-new-{}", ids::hex(rng, 5));
        let image = format!("company/{service}:v2.5.0");

        let mut pull = Map::new();
        pull.insert("reason".to_string(), json!("ImagePullBackOff"));
        pull.insert(
            "message".to_string(),
            json!(format!("Back-off pulling image \"{image}\"")),
        );
        pull.insert("image".to_string(), json!(image));
        self.add_orchestration_event(
            rng,
            &mut incident,
            start_time,
            "ImagePullBackOff",
            service,
            &new_pod,
            pull,
        );

        for i in 0..5u32 {
            let crash_time = start_time + Duration::minutes(i64::from(i) * 2);
            let mut crash = Map::new();
            crash.insert("reason".to_string(), json!("CrashLoopBackOff"));
            crash.insert(
                "message".to_string(),
                json!(format!(
                    "Back-off restarting failed container, restart count: {}",
                    i + 1
                )),
            );
            crash.insert("exit_code".to_string(), json!(1));
            self.add_orchestration_event(
                rng,
                &mut incident,
                crash_time,
                "CrashLoopBackOff",
                service,
                &new_pod,
                crash,
            );
        }

        let config_error_start = start_time + Duration::seconds(30);
        for i in 0..3u32 {
            let timestamp = config_error_start + Duration::minutes(i64::from(i) * 3);
            let mut extra = Map::new();
            extra.insert("release".to_string(), json!("v2.5.0"));
            self.add_error_event(
                rng,
                &mut incident,
                timestamp,
                "ConfigurationError",
                service,
                "Missing required environment variable: DATABASE_URL",
                extra,
            );
        }

        let spike_start = start_time + Duration::minutes(2);
        for i in 0..6u32 {
            let timestamp = spike_start + Duration::minutes(i64::from(i));
            let error_count = f64::from(50 + i * 100);
            let mut extra = Map::new();
            extra.insert("unit".to_string(), json!("Count"));
            extra.insert("statistic".to_string(), json!("Sum"));
            self.add_metric_event(
                rng,
                &mut incident,
                timestamp,
                "HTTPCode_Target_5XX_Count",
                error_count,
                service,
                extra,
            );
        }

        for i in 0..5u32 {
            let timestamp = start_time + Duration::minutes(i64::from(i) * 2);
            let error_rate = 0.5 + f64::from(i) * 2.5;
            let mut extra = Map::new();
            extra.insert("unit".to_string(), json!("percent"));
            self.add_panel_event(
                rng,
                &mut incident,
                timestamp,
                "Error Rate",
                error_rate,
                service,
                extra,
            );
        }

        self.register(incident)
    }

    /// Connection-pool exhaustion: timeouts surge on the app side while the
    /// database pegs its connection ceiling and latency climbs.
    pub fn create_connection_pool_exhaustion_incident(
        &mut self,
        rng: &mut StdRng,
        start_time: DateTime<Utc>,
        service: &str,
        duration_minutes: u32,
    ) -> &Incident {
        let mut incident = self.create_incident(
            rng,
            "database_connection_pool_exhaustion",
            start_time,
            duration_minutes,
            Severity::Critical,
            vec![service.to_string(), "postgres-primary".to_string()],
        );
        let pod_name = ids::pod_name(rng, service);

        for i in 0..20u32 {
            let timestamp = start_time + Duration::seconds(i64::from(i) * 30);
            let mut extra = Map::new();
            extra.insert(
                "tags".to_string(),
                json!({ "database": "postgresql", "pool": "main" }),
            );
            self.add_error_event(
                rng,
                &mut incident,
                timestamp,
                "PoolTimeoutError",
                service,
                "QueuePool limit of 20 overflow 10 reached, connection timed out",
                extra,
            );
        }

        for i in 0..10u32 {
            let timestamp = start_time + Duration::minutes(i64::from(i) * 2);
            let mut extra = Map::new();
            extra.insert("unit".to_string(), json!("Count"));
            extra.insert("dimension".to_string(), json!("DBInstanceIdentifier"));
            self.add_metric_event(
                rng,
                &mut incident,
                timestamp,
                "DatabaseConnections",
                100.0,
                "postgres-primary",
                extra,
            );
        }

        for i in 0..12u32 {
            let timestamp = start_time + Duration::minutes(i64::from(i) * 2);
            let latency = 50.0 + f64::from(i) * 200.0;
            let mut extra = Map::new();
            extra.insert("unit".to_string(), json!("Milliseconds"));
            self.add_metric_event(
                rng,
                &mut incident,
                timestamp,
                "ReadLatency",
                latency,
                "postgres-primary",
                extra,
            );
        }

        for i in 0..8u32 {
            let timestamp = start_time + Duration::minutes(i64::from(i) * 3);
            let threshold = 1000 + i * 500;
            let mut slow = Map::new();
            slow.insert("reason".to_string(), json!("HighLatency"));
            slow.insert(
                "message".to_string(),
                json!(format!("Response time exceeded threshold: {threshold}ms")),
            );
            slow.insert("threshold".to_string(), json!("1000ms"));
            self.add_orchestration_event(
                rng,
                &mut incident,
                timestamp,
                "SlowResponse",
                service,
                &pod_name,
                slow,
            );
        }

        for i in 0..15u32 {
            let timestamp = start_time + Duration::minutes(i64::from(i) * 2);
            let pool_usage = (60.0 + f64::from(i) * 5.0).min(100.0);
            let mut extra = Map::new();
            extra.insert("unit".to_string(), json!("percent"));
            extra.insert("max_connections".to_string(), json!(20));
            self.add_panel_event(
                rng,
                &mut incident,
                timestamp,
                "Database Connection Pool",
                pool_usage,
                service,
                extra,
            );
        }

        self.register(incident)
    }

    /// Unscripted incident type: allocate the record, optionally mark the
    /// downstream blast radius, and leave rendering entirely to the source
    /// generators.
    #[allow(clippy::too_many_arguments)]
    pub fn create_generic_incident(
        &mut self,
        rng: &mut StdRng,
        incident_type: &str,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        severity: Severity,
        affected_services: Vec<String>,
        known_services: &[String],
    ) -> &Incident {
        let mut incident = self.create_incident(
            rng,
            incident_type,
            start_time,
            duration_minutes,
            severity,
            affected_services,
        );

        if let Some(root) = incident.root_cause_service.clone() {
            if Self::should_cascade(rng, 0.3) {
                incident.cascading_failures = Self::cascade_targets(&root)
                    .iter()
                    .filter(|target| known_services.iter().any(|s| s == *target))
                    .map(|target| target.to_string())
                    .collect();
            }
        }

        self.register(incident)
    }

    /// Probability-gated draw for whether a failure spreads downstream.
    pub fn should_cascade(rng: &mut StdRng, probability: f64) -> bool {
        rng.random_bool(probability.clamp(0.0, 1.0))
    }

    /// Services that might be dragged down by a failure of `root_service`.
    pub fn cascade_targets(root_service: &str) -> &'static [&'static str] {
        SERVICE_DEPENDENCIES
            .iter()
            .find(|(name, _)| *name == root_service)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_memory_leak_recipe_counts() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident =
            engine.create_memory_leak_incident(&mut rng, start(), "user-service", 60);

        assert_eq!(incident.events.len(), 27);
        assert_eq!(incident.events_for(Source::Grafana).count(), 10);
        assert_eq!(incident.events_for(Source::Cloudwatch).count(), 8);
        assert_eq!(incident.events_for(Source::Sentry).count(), 5);
        assert_eq!(incident.events_for(Source::Kubernetes).count(), 4);
        assert_eq!(incident.severity, Severity::Critical);
    }

    #[test]
    fn test_memory_leak_heap_samples_rise_60_to_95() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident =
            engine.create_memory_leak_incident(&mut rng, start(), "user-service", 60);

        let heap: Vec<&IncidentEvent> = incident.events_for(Source::Grafana).collect();
        let values: Vec<f64> = heap
            .iter()
            .map(|e| e.data["metric_value"].as_f64().unwrap())
            .collect();

        assert_eq!(values.len(), 10);
        assert!((values[0] - 60.0).abs() < 1e-9);
        assert!((values[9] - 95.0).abs() < 1e-9);
        assert!(values.windows(2).all(|w| w[0] < w[1]));

        // All samples land in the first 70% of the incident window.
        let cutoff = incident.at_fraction(0.7);
        assert!(heap.iter().all(|e| e.timestamp >= incident.start_time));
        assert!(heap.iter().all(|e| e.timestamp <= cutoff));
    }

    #[test]
    fn test_memory_leak_error_severity_escalates() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident =
            engine.create_memory_leak_incident(&mut rng, start(), "user-service", 60);

        let tags: Vec<&str> = incident
            .events_for(Source::Sentry)
            .map(|e| e.data["tags"]["severity"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["warning", "warning", "warning", "error", "error"]);
    }

    #[test]
    fn test_restart_follows_oom_by_five_seconds() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident =
            engine.create_memory_leak_incident(&mut rng, start(), "user-service", 60);

        let k8s: Vec<&IncidentEvent> = incident.events_for(Source::Kubernetes).collect();
        let oom = k8s.iter().find(|e| e.event_type == "OOMKilled").unwrap();
        let restart = k8s.iter().find(|e| e.event_type == "Restarted").unwrap();
        assert_eq!(restart.timestamp - oom.timestamp, Duration::seconds(5));
        assert_eq!(oom.timestamp, incident.at_fraction(0.9));
    }

    #[test]
    fn test_deployment_failure_recipe_counts() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident =
            engine.create_deployment_failure_incident(&mut rng, start(), "product-service", 15);

        assert_eq!(incident.events_for(Source::Kubernetes).count(), 6);
        assert_eq!(incident.events_for(Source::Sentry).count(), 3);
        assert_eq!(incident.events_for(Source::Cloudwatch).count(), 6);
        assert_eq!(incident.events_for(Source::Grafana).count(), 5);
        assert_eq!(incident.severity, Severity::High);
    }

    #[test]
    fn test_pool_exhaustion_spans_both_services() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident = engine.create_connection_pool_exhaustion_incident(
            &mut rng,
            start(),
            "order-service",
            30,
        );

        assert_eq!(
            incident.affected_services,
            vec!["order-service".to_string(), "postgres-primary".to_string()]
        );
        assert_eq!(incident.events.len(), 65);
        // Database-side metrics are attributed to the database service.
        assert!(
            incident
                .events_for(Source::Cloudwatch)
                .all(|e| e.data["service"] == json!("postgres-primary"))
        );
    }

    #[test]
    fn test_every_event_carries_incident_identifiers() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let incident =
            engine.create_memory_leak_incident(&mut rng, start(), "user-service", 60);

        for event in &incident.events {
            assert_eq!(event.correlation_id, incident.correlation_id);
            assert_eq!(event.incident_id, incident.incident_id);
        }
    }

    #[test]
    fn test_recipes_are_deterministic_under_seed() {
        let build = || {
            let mut engine = CorrelationEngine::new();
            let mut rng = StdRng::seed_from_u64(99);
            engine
                .create_memory_leak_incident(&mut rng, start(), "user-service", 60)
                .clone()
        };
        let a = build();
        let b = build();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_generic_incident_has_no_scripted_events() {
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let known: Vec<String> = vec!["api-gateway".into(), "user-service".into()];
        let incident = engine.create_generic_incident(
            &mut rng,
            "service_degradation",
            start(),
            20,
            Severity::High,
            vec!["api-gateway".to_string()],
            &known,
        );

        assert!(incident.events.is_empty());
        // Cascades, when drawn, only name services from the known catalog.
        assert!(
            incident
                .cascading_failures
                .iter()
                .all(|s| known.contains(s))
        );
    }

    #[test]
    fn test_cascade_targets_map() {
        assert_eq!(
            CorrelationEngine::cascade_targets("user-service"),
            &["postgres-primary"]
        );
        assert!(CorrelationEngine::cascade_targets("unknown-service").is_empty());
    }
}
