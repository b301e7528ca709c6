//! Scheduler / Orchestrator
//!
//! Owns the simulation clock — one writer, never moving backward — and the
//! run state machine `Idle -> Scheduling -> Running -> Draining -> Done`.
//! While running, each step either materializes a due incident (delegating
//! to the correlation engine and all four source generators, then jumping
//! the clock past the incident so background noise and incidents stay
//! mutually exclusive in time) or emits one background batch sized by the
//! traffic and seasonal multipliers.
//!
//! Overlap contract: at most one incident is active; overdue schedule
//! entries fire immediately rather than being dropped. The background step
//! is clamped so it never jumps over a pending entry, which is what makes
//! every in-window entry fire.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use faultline_core::{
    ConfigError, CorrelationEngine, SimError, SimulationConfig, Source, WireRecord, patterns,
};

use crate::output::OutputSink;
use crate::sources::{self, SourceGenerator};

/// One planned incident, consumed in `scheduled_start` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub scheduled_start: DateTime<Utc>,
    pub incident_type: String,
    pub duration_minutes: u32,
}

/// Engine lifecycle; `Done` is terminal and the engine is not reusable
/// (`run` consumes it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scheduling,
    Running,
    Draining,
    Done,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub incidents: usize,
    pub background_batches: u64,
    pub total_records: u64,
    pub records_by_source: BTreeMap<String, u64>,
}

pub struct SimulationEngine {
    config: SimulationConfig,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    clock: DateTime<Utc>,
    rng: StdRng,
    correlator: CorrelationEngine,
    generators: Vec<Box<dyn SourceGenerator>>,
    streams: BTreeMap<Source, Vec<WireRecord>>,
    state: RunState,
    summary: RunSummary,
}

impl SimulationEngine {
    /// Validate the configuration and window, seed the RNG, and register
    /// the four source generators. Fails fast on malformed configuration.
    pub fn new(
        config: SimulationConfig,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        if start >= end {
            return Err(ConfigError::InvalidDateRange { start, end }.into());
        }

        let generators = sources::default_generators(&config);
        let seed = config.generation.seed;
        Ok(Self {
            config,
            start,
            end,
            clock: start,
            rng: StdRng::seed_from_u64(seed),
            correlator: CorrelationEngine::new(),
            generators,
            streams: BTreeMap::new(),
            state: RunState::Idle,
            summary: RunSummary::default(),
        })
    }

    /// Replace the registered generators (test seam for failure injection).
    pub fn with_generators(mut self, generators: Vec<Box<dyn SourceGenerator>>) -> Self {
        self.generators = generators;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    /// Drive the whole run and write everything through the sink.
    pub fn run(mut self, sink: &mut dyn OutputSink) -> Result<RunSummary, SimError> {
        self.state = RunState::Scheduling;
        let schedule = self.build_schedule();
        info!(
            scheduled_incidents = schedule.len(),
            start = %self.start,
            end = %self.end,
            seed = self.config.generation.seed,
            "simulation run starting"
        );

        self.state = RunState::Running;
        let service_names = self.config.service_names();
        let mut cursor = 0usize;

        while self.clock < self.end {
            if let Some(entry) = schedule.get(cursor) {
                if entry.scheduled_start <= self.clock {
                    self.fire_incident(entry, &service_names);
                    cursor += 1;
                    continue;
                }
            }
            self.background_batch(&service_names);
            self.advance_clock(schedule.get(cursor));
        }

        self.state = RunState::Draining;
        self.drain(sink)?;
        self.state = RunState::Done;

        info!(
            incidents = self.summary.incidents,
            total_records = self.summary.total_records,
            background_batches = self.summary.background_batches,
            "simulation run complete"
        );
        Ok(self.summary)
    }

    /// Draw the incident schedule for the window: the configured total is
    /// scaled by window length relative to 30 days, starts land uniformly,
    /// types follow their probability weights.
    fn build_schedule(&mut self) -> Vec<ScheduleEntry> {
        let duration_hours = (self.end - self.start).num_seconds() as f64 / 3600.0;
        let scaled_count =
            (f64::from(self.config.generation.total_incidents) * duration_hours / 720.0) as usize;

        let types: Vec<String> = self.config.incidents.keys().cloned().collect();
        let weights: Vec<f64> = self
            .config
            .incidents
            .values()
            .map(|spec| spec.probability)
            .collect();
        let Ok(type_dist) = WeightedIndex::new(&weights) else {
            // validate() rejects zero/negative weight catalogs before this.
            warn!("incident catalog has no usable probability weights; scheduling nothing");
            return Vec::new();
        };

        let mut schedule = Vec::with_capacity(scaled_count);
        for _ in 0..scaled_count {
            let offset_hours = self.rng.random_range(0.0..duration_hours);
            let scheduled_start =
                self.start + Duration::milliseconds((offset_hours * 3_600_000.0) as i64);

            let incident_type = types[type_dist.sample(&mut self.rng)].clone();
            let [min, max] = self.config.incidents[&incident_type].duration_minutes;
            let duration_minutes = self.rng.random_range(min..=max);

            schedule.push(ScheduleEntry {
                scheduled_start,
                incident_type,
                duration_minutes,
            });
        }
        schedule.sort_by_key(|entry| entry.scheduled_start);
        schedule
    }

    /// Materialize one incident and fan it out to all four generators. A
    /// generator failure degrades that source's contribution, never the run.
    fn fire_incident(&mut self, entry: &ScheduleEntry, service_names: &[String]) {
        let Some(spec) = self.config.incidents.get(&entry.incident_type).cloned() else {
            return;
        };

        let incident = self
            .correlator
            .materialize(
                &mut self.rng,
                &entry.incident_type,
                entry.scheduled_start,
                entry.duration_minutes,
                &spec,
                service_names,
            )
            .clone();
        info!(
            incident_id = %incident.incident_id,
            incident_type = %incident.incident_type,
            start = %incident.start_time,
            duration_minutes = entry.duration_minutes,
            severity = incident.severity.as_str(),
            "injecting incident"
        );

        for i in 0..self.generators.len() {
            let source = self.generators[i].source();
            let result = self.generators[i].generate_for_incident(&incident, &mut self.rng);
            match result {
                Ok(records) => self.append_records(source, records),
                Err(error) => warn!(
                    source = source.as_str(),
                    incident_id = %incident.incident_id,
                    cause = %error,
                    "source generator failed; incident contribution dropped"
                ),
            }
        }
        self.summary.incidents += 1;

        // No background noise while an incident is active: jump straight
        // past it. The clock still never moves backward.
        self.clock = self.clock.max(incident.end_time);
    }

    /// One background batch at the current clock across all generators.
    fn background_batch(&mut self, service_names: &[String]) {
        let traffic = patterns::traffic_multiplier(self.clock);
        let seasonal = patterns::seasonal_multiplier(self.clock);
        let count = ((self.config.generation.normal_logs_per_minute * traffic * seasonal / 60.0)
            as usize)
            .max(1);

        let picked = self.rng.random_range(2..=4usize).min(service_names.len()).max(1);
        let selected: Vec<String> = service_names
            .choose_multiple(&mut self.rng, picked)
            .cloned()
            .collect();

        let timestamp = self.clock;
        for i in 0..self.generators.len() {
            let source = self.generators[i].source();
            let result = self.generators[i].generate_normal_operation(
                timestamp,
                &selected,
                count,
                &mut self.rng,
            );
            match result {
                Ok(records) => self.append_records(source, records),
                Err(error) => warn!(
                    source = source.as_str(),
                    tick_time = %timestamp,
                    cause = %error,
                    "source generator failed; background contribution dropped"
                ),
            }
        }
        self.summary.background_batches += 1;
    }

    /// Advance the clock by the traffic-scaled interval with +-30% jitter,
    /// clamped so a step never skips over a pending schedule entry.
    fn advance_clock(&mut self, next_entry: Option<&ScheduleEntry>) {
        let traffic = patterns::traffic_multiplier(self.clock);
        let seasonal = patterns::seasonal_multiplier(self.clock);
        let interval = self.config.generation.base_interval_seconds
            / (traffic * seasonal).max(f64::EPSILON);
        let jitter = self.rng.random_range(0.7..1.3);

        let mut next_clock =
            self.clock + Duration::milliseconds((interval * jitter * 1000.0) as i64);
        if let Some(entry) = next_entry {
            if entry.scheduled_start > self.clock && entry.scheduled_start < next_clock {
                next_clock = entry.scheduled_start;
            }
        }
        self.clock = next_clock.max(self.clock + Duration::milliseconds(1));
        debug!(clock = %self.clock, "clock advanced");
    }

    fn append_records(&mut self, source: Source, records: Vec<WireRecord>) {
        self.summary.total_records += records.len() as u64;
        *self
            .summary
            .records_by_source
            .entry(source.as_str().to_string())
            .or_default() += records.len() as u64;
        self.streams.entry(source).or_default().extend(records);
    }

    /// Sort each stream by timestamp, partition by calendar day, write all
    /// partitions, then write the incident index exactly once.
    fn drain(&mut self, sink: &mut dyn OutputSink) -> Result<(), SimError> {
        for source in Source::ALL {
            let mut records = self.streams.remove(&source).unwrap_or_default();
            records.sort_by_key(|record| record.timestamp);

            let mut day_start = 0usize;
            while day_start < records.len() {
                let day = records[day_start].timestamp.date_naive();
                let day_end = records[day_start..]
                    .iter()
                    .position(|record| record.timestamp.date_naive() != day)
                    .map(|offset| day_start + offset)
                    .unwrap_or(records.len());
                sink.write_stream(source, day, &records[day_start..day_end])?;
                day_start = day_end;
            }
        }

        let index = std::mem::take(&mut self.correlator).into_index();
        sink.write_index(&index)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use chrono::TimeZone;
    use faultline_core::GeneratorError;

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
    }

    fn one_incident_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.incidents.retain(|name, _| name == "memory_leak");
        if let Some(spec) = config.incidents.get_mut("memory_leak") {
            spec.probability = 1.0;
            spec.duration_minutes = [30, 30];
        }
        // 720 incidents per 30 days scales to exactly 1 per hour.
        config.generation.total_incidents = 720;
        config.generation.seed = 1234;
        config
    }

    #[test]
    fn test_new_engine_is_idle_and_validated() {
        let start = window_start();
        let engine =
            SimulationEngine::new(SimulationConfig::default(), start, start + Duration::hours(1))
                .unwrap();
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(engine.clock(), start);
    }

    #[test]
    fn test_inverted_window_fails_fast() {
        let start = window_start();
        let result =
            SimulationEngine::new(SimulationConfig::default(), start, start - Duration::hours(1));
        assert!(matches!(
            result,
            Err(SimError::Config(ConfigError::InvalidDateRange { .. }))
        ));
    }

    #[test]
    fn test_schedule_is_scaled_and_sorted() {
        let start = window_start();
        let mut engine = SimulationEngine::new(
            SimulationConfig::default(),
            start,
            start + Duration::days(30),
        )
        .unwrap();

        let schedule = engine.build_schedule();
        assert_eq!(schedule.len(), 50);
        assert!(
            schedule
                .windows(2)
                .all(|w| w[0].scheduled_start <= w[1].scheduled_start)
        );
        assert!(schedule.iter().all(|entry| {
            entry.scheduled_start >= start && entry.scheduled_start < start + Duration::days(30)
        }));
    }

    #[test]
    fn test_single_hour_run_fires_exactly_one_incident() {
        let start = window_start();
        let engine =
            SimulationEngine::new(one_incident_config(), start, start + Duration::hours(1))
                .unwrap();
        let mut sink = MemorySink::new();
        let summary = engine.run(&mut sink).unwrap();

        assert_eq!(summary.incidents, 1);
        let index = sink.index.as_ref().expect("index written");
        assert_eq!(index.incidents.len(), 1);
        assert_eq!(index.incidents[0].incident_type, "memory_leak");
        assert_eq!(index.incidents[0].event_count, 27);
        for source in Source::ALL {
            assert!(!sink.records(source).is_empty(), "{source} stream empty");
        }
    }

    #[test]
    fn test_streams_are_time_ordered_after_drain() {
        let start = window_start();
        let engine =
            SimulationEngine::new(one_incident_config(), start, start + Duration::hours(1))
                .unwrap();
        let mut sink = MemorySink::new();
        engine.run(&mut sink).unwrap();

        for source in Source::ALL {
            let records = sink.records(source);
            assert!(
                records
                    .windows(2)
                    .all(|w| w[0].timestamp <= w[1].timestamp),
                "{source} stream not monotonic"
            );
        }
    }

    struct FailingGenerator(Source);

    impl SourceGenerator for FailingGenerator {
        fn source(&self) -> Source {
            self.0
        }

        fn generate_for_incident(
            &self,
            _incident: &faultline_core::Incident,
            _rng: &mut StdRng,
        ) -> Result<Vec<WireRecord>, GeneratorError> {
            Err(GeneratorError::new(self.0.as_str(), "synthetic failure"))
        }

        fn generate_normal_operation(
            &self,
            _timestamp: DateTime<Utc>,
            _services: &[String],
            _count: usize,
            _rng: &mut StdRng,
        ) -> Result<Vec<WireRecord>, GeneratorError> {
            Err(GeneratorError::new(self.0.as_str(), "synthetic failure"))
        }
    }

    #[test]
    fn test_generator_failure_degrades_but_run_completes() {
        let start = window_start();
        let config = one_incident_config();
        let engine = SimulationEngine::new(config.clone(), start, start + Duration::hours(1))
            .unwrap()
            .with_generators(vec![
                Box::new(FailingGenerator(Source::Kubernetes)),
                Box::new(crate::sources::SentryGenerator::new(&config)),
                Box::new(crate::sources::CloudwatchGenerator::new(&config)),
                Box::new(crate::sources::GrafanaGenerator::new(&config)),
            ]);

        let mut sink = MemorySink::new();
        let summary = engine.run(&mut sink).unwrap();

        // The failing source contributes nothing; the run still finishes
        // and the other three streams are intact.
        assert_eq!(summary.incidents, 1);
        assert!(sink.records(Source::Kubernetes).is_empty());
        assert!(!sink.records(Source::Sentry).is_empty());
        assert!(sink.index.is_some());
    }
}
