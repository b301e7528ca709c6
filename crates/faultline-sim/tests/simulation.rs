//! End-to-end properties of a full simulation run: determinism under a
//! fixed seed, correlation closure, background/incident exclusivity,
//! per-stream time ordering, day partitioning, and memory-leak scenario
//! fidelity at the stream level.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use faultline_core::{SimulationConfig, Source};
use faultline_sim::{MemorySink, SimulationEngine};

fn window_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
}

/// Low-volume base config so multi-hour runs stay small.
fn base_config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.generation.normal_logs_per_minute = 60.0;
    config.generation.base_interval_seconds = 300.0;
    config.generation.seed = seed;
    config
}

/// Catalog reduced to a single memory_leak that fires exactly once per hour.
fn leak_only_config(seed: u64) -> SimulationConfig {
    let mut config = base_config(seed);
    config.incidents.retain(|name, _| name == "memory_leak");
    if let Some(spec) = config.incidents.get_mut("memory_leak") {
        spec.probability = 1.0;
        spec.duration_minutes = [30, 30];
        spec.affected_services = vec!["user-service".to_string()];
    }
    config.generation.total_incidents = 720;
    config
}

fn run_into_sink(config: SimulationConfig, hours: i64) -> MemorySink {
    let start = window_start();
    let engine = SimulationEngine::new(config, start, start + Duration::hours(hours)).unwrap();
    let mut sink = MemorySink::new();
    engine.run(&mut sink).unwrap();
    sink
}

/// Does any string anywhere in the payload contain `needle`?
fn mentions(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|item| mentions(item, needle)),
        Value::Object(map) => map.values().any(|item| mentions(item, needle)),
        _ => false,
    }
}

/// Byte-for-byte fingerprint of everything a run produced.
fn fingerprint(sink: &MemorySink) -> String {
    let mut out = String::new();
    for source in Source::ALL {
        for record in sink.records(source) {
            out.push_str(&record.timestamp.to_rfc3339());
            out.push(':');
            out.push_str(&record.payload.to_string());
            out.push('\n');
        }
    }
    out.push_str(&serde_json::to_string(sink.index.as_ref().unwrap()).unwrap());
    out
}

#[test]
fn fixed_seed_runs_are_byte_identical() {
    let a = run_into_sink(base_config(42), 6);
    let b = run_into_sink(base_config(42), 6);
    assert_eq!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn different_seeds_diverge() {
    let a = run_into_sink(base_config(42), 3);
    let b = run_into_sink(base_config(43), 3);
    assert_ne!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn one_hour_memory_leak_end_to_end() {
    let sink = run_into_sink(leak_only_config(7), 1);

    // Four non-empty streams.
    for source in Source::ALL {
        assert!(!sink.records(source).is_empty(), "{source} stream empty");
    }

    // Exactly one incident in the index.
    let index = sink.index.as_ref().unwrap();
    assert_eq!(index.incidents.len(), 1);
    let entry = &index.incidents[0];
    assert_eq!(entry.incident_type, "memory_leak");
    assert_eq!(entry.severity, faultline_core::Severity::Critical);

    // The index event count equals the correlated records summed across all
    // four streams.
    let correlated: usize = Source::ALL
        .iter()
        .map(|source| {
            sink.payloads(*source)
                .iter()
                .filter(|payload| mentions(payload, &entry.correlation_id))
                .count()
        })
        .sum();
    assert_eq!(entry.event_count, correlated);
    assert_eq!(entry.event_count, 27);
}

#[test]
fn memory_leak_dashboard_fidelity_at_stream_level() {
    let sink = run_into_sink(leak_only_config(7), 1);
    let index = sink.index.as_ref().unwrap();
    let entry = &index.incidents[0];

    let duration = entry.end_time - entry.start_time;
    let cutoff = entry.start_time + Duration::milliseconds(
        (duration.num_milliseconds() as f64 * 0.7) as i64,
    );

    let heap: Vec<(&DateTime<Utc>, f64)> = sink
        .records(Source::Grafana)
        .into_iter()
        .filter(|record| {
            record.payload["panel"]["title"] == Value::String("JVM Heap Usage".into())
                && mentions(&record.payload, &entry.correlation_id)
        })
        .map(|record| {
            (
                &record.timestamp,
                record.payload["datapoints"][0][0].as_f64().unwrap(),
            )
        })
        .collect();

    assert_eq!(heap.len(), 10);
    assert!(heap.iter().all(|(t, _)| **t >= entry.start_time && **t <= cutoff));
    let values: Vec<f64> = heap.iter().map(|(_, v)| *v).collect();
    assert!((values[0] - 60.0).abs() < 1e-9);
    assert!((values[values.len() - 1] - 95.0).abs() < 1e-9);
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn correlation_closure_holds_for_every_incident() {
    let sink = run_into_sink(base_config(11), 24);
    let index = sink.index.as_ref().unwrap();

    for entry in &index.incidents {
        for source in Source::ALL {
            for record in sink.records(source) {
                if mentions(&record.payload, &entry.correlation_id) {
                    assert!(
                        record.timestamp >= entry.start_time
                            && record.timestamp <= entry.end_time,
                        "correlated record at {} outside [{}, {}] for {}",
                        record.timestamp,
                        entry.start_time,
                        entry.end_time,
                        entry.incident_id
                    );
                }
            }
        }
    }
}

#[test]
fn background_is_excluded_from_incident_windows() {
    let sink = run_into_sink(base_config(11), 24);
    let index = sink.index.as_ref().unwrap();
    let correlation_ids: Vec<&str> = index
        .incidents
        .iter()
        .map(|entry| entry.correlation_id.as_str())
        .collect();

    for source in Source::ALL {
        for record in sink.records(source) {
            let is_background = !correlation_ids
                .iter()
                .any(|id| mentions(&record.payload, id));
            if !is_background {
                continue;
            }
            for entry in &index.incidents {
                assert!(
                    !(record.timestamp > entry.start_time
                        && record.timestamp < entry.end_time),
                    "background record at {} inside incident window [{}, {}]",
                    record.timestamp,
                    entry.start_time,
                    entry.end_time
                );
            }
        }
    }
}

#[test]
fn streams_are_non_decreasing_in_time() {
    let sink = run_into_sink(base_config(19), 12);
    for source in Source::ALL {
        let records = sink.records(source);
        assert!(
            records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
            "{source} stream not monotonic"
        );
    }
}

#[test]
fn streams_are_partitioned_by_calendar_day() {
    let sink = run_into_sink(base_config(23), 36);

    for source in Source::ALL {
        let days = sink.streams.get(&source).unwrap();
        assert!(days.len() >= 2, "{source} has a single partition for a 36h run");
        for (day, records) in days {
            assert!(
                records.iter().all(|r| r.timestamp.date_naive() == *day),
                "{source} partition {day} contains foreign-day records"
            );
        }
    }
}

#[test]
fn incident_index_matches_stream_contents() {
    let sink = run_into_sink(base_config(31), 24);
    let index = sink.index.as_ref().unwrap();

    for entry in &index.incidents {
        assert!(entry.start_time <= entry.end_time);
        assert!(!entry.affected_services.is_empty());
        assert!(entry.correlation_id.starts_with("corr_"));
        assert!(entry.incident_id.starts_with("inc_"));

        // Every incident, scripted or generic, shows up in all four streams.
        for source in Source::ALL {
            let seen = sink
                .payloads(source)
                .iter()
                .any(|payload| mentions(payload, &entry.correlation_id));
            assert!(seen, "{source} has no records for {}", entry.incident_id);
        }
    }
}
