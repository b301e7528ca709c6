//! CloudWatch Source Generator
//!
//! Renders metric datapoints (with realistic statistics blocks), alarm
//! state changes, and the per-resource metric families (ECS service, RDS
//! instance, load balancer) that back them. Incident records embed the
//! correlation id as top-level fields on the datapoint.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use serde_json::{Value, json};

use faultline_core::{
    GeneratorError, Incident, ServiceSpec, SimulationConfig, Source, WireRecord, patterns,
};

use super::{SourceGenerator, iso};

pub struct CloudwatchGenerator {
    services: BTreeMap<String, ServiceSpec>,
    region: String,
}

impl CloudwatchGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            services: config.services.clone(),
            region: "us-east-1".to_string(),
        }
    }

    /// One metric datapoint with a statistics block sampled around `value`.
    #[allow(clippy::too_many_arguments)]
    fn metric_datapoint(
        &self,
        rng: &mut StdRng,
        timestamp: DateTime<Utc>,
        namespace: &str,
        metric_name: &str,
        value: f64,
        unit: &str,
        dimensions: Vec<Value>,
        correlation: Option<(&str, &str)>,
    ) -> Value {
        let sample_count = rng.random_range(10..100u32);
        let mut datapoint = json!({
            "Timestamp": iso(timestamp),
            "MetricName": metric_name,
            "Namespace": namespace,
            "Value": value,
            "Unit": unit,
            "Dimensions": dimensions,
            "Statistics": {
                "SampleCount": sample_count,
                "Sum": value * f64::from(sample_count),
                "Minimum": value * rng.random_range(0.7..0.9),
                "Maximum": value * rng.random_range(1.1..1.3),
                "Average": value,
            },
        });
        if let Some((correlation_id, incident_id)) = correlation {
            datapoint["CorrelationId"] = json!(correlation_id);
            datapoint["IncidentId"] = json!(incident_id);
        }
        datapoint
    }

    /// Alarm state-change document.
    #[allow(clippy::too_many_arguments)]
    fn alarm(
        &self,
        rng: &mut StdRng,
        timestamp: DateTime<Utc>,
        alarm_name: &str,
        metric_name: &str,
        namespace: &str,
        state: &str,
        reason: &str,
        threshold: f64,
        dimensions: Vec<Value>,
        correlation: Option<(&str, &str)>,
    ) -> Value {
        let recent: Vec<f64> = (0..5)
            .map(|_| rng.random_range(threshold * 0.8..threshold * 1.2))
            .collect();
        let state_reason_data = json!({
            "version": "1.0",
            "queryDate": iso(timestamp),
            "startDate": iso(timestamp - Duration::minutes(5)),
            "statistic": "Average",
            "period": 60,
            "recentDatapoints": recent,
            "threshold": threshold,
        });

        let mut alarm = json!({
            "AlarmName": alarm_name,
            "AlarmDescription": format!("Alarm for {metric_name} in {namespace}"),
            "StateValue": state,
            "StateReason": reason,
            "StateReasonData": state_reason_data.to_string(),
            "StateUpdatedTimestamp": iso(timestamp),
            "MetricName": metric_name,
            "Namespace": namespace,
            "Statistic": "Average",
            "Dimensions": dimensions,
            "Period": 60,
            "EvaluationPeriods": 2,
            "DatapointsToAlarm": 2,
            "Threshold": threshold,
            "ComparisonOperator": "GreaterThanThreshold",
            "TreatMissingData": "notBreaching",
            "ActionsEnabled": true,
            "AlarmActions": [format!("arn:aws:sns:{}:123456789012:alarm-notifications", self.region)],
        });
        if let Some((correlation_id, incident_id)) = correlation {
            alarm["CorrelationId"] = json!(correlation_id);
            alarm["IncidentId"] = json!(incident_id);
        }
        alarm
    }

    fn service_dimensions(service: &str) -> Vec<Value> {
        vec![
            json!({ "Name": "ServiceName", "Value": service }),
            json!({ "Name": "ClusterName", "Value": "production" }),
        ]
    }

    /// ECS metrics for one service at one point in time.
    fn ecs_metrics(
        &self,
        rng: &mut StdRng,
        timestamp: DateTime<Utc>,
        service: &str,
    ) -> Vec<Value> {
        let dimensions = Self::service_dimensions(service);
        let cpu = rng.random_range(20.0..60.0);
        let dp_cpu = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/ECS",
            "CPUUtilization",
            cpu,
            "Percent",
            dimensions.clone(),
            None,
        );
        let mem = rng.random_range(30.0..70.0);
        let dp_mem = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/ECS",
            "MemoryUtilization",
            mem,
            "Percent",
            dimensions,
            None,
        );
        vec![dp_cpu, dp_mem]
    }

    fn rds_metrics(&self, rng: &mut StdRng, timestamp: DateTime<Utc>) -> Vec<Value> {
        let dimensions = vec![json!({
            "Name": "DBInstanceIdentifier",
            "Value": "production-postgres"
        })];
        let db_connections = rng.random_range(10.0..50.0);
        let dp_db = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/RDS",
            "DatabaseConnections",
            db_connections,
            "Count",
            dimensions.clone(),
            None,
        );
        let read_latency = rng.random_range(5.0..50.0);
        let dp_latency = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/RDS",
            "ReadLatency",
            read_latency,
            "Milliseconds",
            dimensions.clone(),
            None,
        );
        let cpu = rng.random_range(20.0..70.0);
        let dp_cpu = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/RDS",
            "CPUUtilization",
            cpu,
            "Percent",
            dimensions,
            None,
        );
        vec![
            dp_db,
            dp_latency,
            dp_cpu,
        ]
    }

    fn elb_metrics(&self, rng: &mut StdRng, timestamp: DateTime<Utc>) -> Vec<Value> {
        let dimensions = vec![json!({
            "Name": "LoadBalancerName",
            "Value": "production-alb"
        })];
        let request_count = rng.random_range(100.0..1000.0);
        let healthy = rng.random_range(3..=10u32);
        let dp_request = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/ELB",
            "RequestCount",
            request_count,
            "Count",
            dimensions.clone(),
            None,
        );
        let dp_healthy = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/ELB",
            "HealthyHostCount",
            f64::from(healthy),
            "Count",
            dimensions.clone(),
            None,
        );
        let error_rate = rng.random_range(0.001..0.01);
        let dp_5xx = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/ELB",
            "HTTPCode_ELB_5XX",
            request_count * error_rate,
            "Count",
            dimensions.clone(),
            None,
        );
        let response_time = rng.random_range(50.0..300.0);
        let dp_latency = self.metric_datapoint(
            rng,
            timestamp,
            "AWS/ELB",
            "TargetResponseTime",
            response_time,
            "Milliseconds",
            dimensions,
            None,
        );
        vec![dp_request, dp_healthy, dp_5xx, dp_latency]
    }

    /// Fallback for unscripted incident types: a quadratic CPU degradation
    /// ramp plus one alarm once the ramp crosses its threshold.
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
        let ramp = patterns::degradation(rng, incident.start_time, incident.end_time);

        let mut records = Vec::new();
        let mut alarm_raised = false;
        for (timestamp, severity) in ramp {
            let value = 40.0 + 55.0 * severity;
            let payload = self.metric_datapoint(
                rng,
                timestamp,
                "AWS/ECS",
                "CPUUtilization",
                value,
                "Percent",
                Self::service_dimensions(service),
                Some(correlation),
            );
            records.push(WireRecord::new(timestamp, payload));

            // One ALARM transition per incident, at ~80% progress.
            if !alarm_raised && severity >= 0.64 {
                alarm_raised = true;
                let payload = self.alarm(
                    rng,
                    timestamp,
                    &format!("{service}-{}-alarm", incident.incident_type),
                    "CPUUtilization",
                    "AWS/ECS",
                    "ALARM",
                    &format!(
                        "Threshold Crossed: 1 datapoint [{value:.1}] was greater than the threshold (80.0)"
                    ),
                    80.0,
                    Self::service_dimensions(service),
                    Some(correlation),
                );
                records.push(WireRecord::new(timestamp, payload));
            }
        }

        if records.is_empty() {
            let payload = self.metric_datapoint(
                rng,
                incident.start_time,
                "AWS/ECS",
                "CPUUtilization",
                95.0,
                "Percent",
                Self::service_dimensions(service),
                Some(correlation),
            );
            records.push(WireRecord::new(incident.start_time, payload));
        }
        records
    }
}

impl SourceGenerator for CloudwatchGenerator {
    fn source(&self) -> Source {
        Source::Cloudwatch
    }

    fn generate_for_incident(
        &self,
        incident: &Incident,
        rng: &mut StdRng,
    ) -> Result<Vec<WireRecord>, GeneratorError> {
        let scripted: Vec<_> = incident.events_for(Source::Cloudwatch).collect();
        if scripted.is_empty() {
            return Ok(self.fallback_incident_records(incident, rng));
        }

        let records = scripted
            .iter()
            .map(|event| {
                let metric_name = event.data["metric_name"].as_str().unwrap_or("Unknown");
                let value = event.data["metric_value"].as_f64().unwrap_or(0.0);
                let service = event.data["service"].as_str().unwrap_or("unknown");
                let namespace = event.data["namespace"].as_str().unwrap_or("AWS/ECS");

                let db_scoped = event
                    .data
                    .get("dimension")
                    .and_then(Value::as_str)
                    .is_some_and(|d| d == "DBInstanceIdentifier")
                    || metric_name.contains("Latency")
                    || metric_name == "DatabaseConnections";
                let dimensions = if db_scoped {
                    vec![json!({
                        "Name": "DBInstanceIdentifier",
                        "Value": "production-postgres"
                    })]
                } else {
                    Self::service_dimensions(service)
                };
                let namespace = if db_scoped { "AWS/RDS" } else { namespace };

                let unit = event
                    .data
                    .get("unit")
                    .and_then(Value::as_str)
                    .unwrap_or_else(|| infer_unit(metric_name));

                let payload = self.metric_datapoint(
                    rng,
                    event.timestamp,
                    namespace,
                    metric_name,
                    value,
                    unit,
                    dimensions,
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
        let mut payloads = Vec::new();
        for service in services {
            if self.services.contains_key(service) {
                payloads.extend(self.ecs_metrics(rng, timestamp, service));
            }
        }
        if rng.random_bool(0.3) {
            payloads.extend(self.rds_metrics(rng, timestamp));
        }
        if rng.random_bool(0.3) {
            payloads.extend(self.elb_metrics(rng, timestamp));
        }

        Ok(payloads
            .into_iter()
            .map(|payload| WireRecord::new(timestamp, payload))
            .collect())
    }
}

fn infer_unit(metric_name: &str) -> &'static str {
    if metric_name.contains("Latency") || metric_name.contains("ResponseTime") {
        "Milliseconds"
    } else if metric_name.contains("Count") || metric_name.contains("Connections") {
        "Count"
    } else {
        "Percent"
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
    fn test_pool_exhaustion_metrics_are_db_scoped() {
        let config = SimulationConfig::default();
        let generator = CloudwatchGenerator::new(&config);
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);

        let incident = engine
            .create_connection_pool_exhaustion_incident(&mut rng, start(), "order-service", 30)
            .clone();
        let records = generator.generate_for_incident(&incident, &mut rng).unwrap();

        assert_eq!(records.len(), 22);
        for record in &records {
            assert_eq!(record.payload["Namespace"], json!("AWS/RDS"));
            assert_eq!(
                record.payload["Dimensions"][0]["Name"],
                json!("DBInstanceIdentifier")
            );
            assert_eq!(
                record.payload["CorrelationId"],
                json!(incident.correlation_id)
            );
        }
        let latencies: Vec<f64> = records
            .iter()
            .filter(|r| r.payload["MetricName"] == json!("ReadLatency"))
            .map(|r| r.payload["Value"].as_f64().unwrap())
            .collect();
        assert_eq!(latencies.len(), 12);
        assert!(latencies.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_fallback_ramp_raises_one_alarm() {
        let config = SimulationConfig::default();
        let generator = CloudwatchGenerator::new(&config);
        let mut engine = CorrelationEngine::new();
        let mut rng = StdRng::seed_from_u64(42);

        let known = config.service_names();
        let incident = engine
            .create_generic_incident(
                &mut rng,
                "service_degradation",
                start(),
                30,
                Severity::High,
                vec!["api-gateway".to_string()],
                &known,
            )
            .clone();
        let records = generator.generate_for_incident(&incident, &mut rng).unwrap();

        let alarms: Vec<_> = records
            .iter()
            .filter(|r| r.payload.get("AlarmName").is_some())
            .collect();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].payload["StateValue"], json!("ALARM"));
        assert!(records.iter().all(|r| {
            r.timestamp >= incident.start_time && r.timestamp <= incident.end_time
        }));
    }

    #[test]
    fn test_normal_metrics_have_no_correlation_fields() {
        let config = SimulationConfig::default();
        let generator = CloudwatchGenerator::new(&config);
        let mut rng = StdRng::seed_from_u64(42);

        let services = vec!["user-service".to_string()];
        let records = generator
            .generate_normal_operation(start(), &services, 10, &mut rng)
            .unwrap();

        assert!(!records.is_empty());
        for record in &records {
            assert!(record.payload.get("CorrelationId").is_none());
            assert!(record.payload["Statistics"]["SampleCount"].is_number());
        }
    }
}
