//! Temporal Pattern Library
//!
//! Stateless transforms from a point in simulated time (plus an optional
//! incident-progress fraction) to a scalar multiplier or a sequence of
//! timestamps. All randomness comes through an explicit `&mut StdRng`, all
//! durations are seconds, and negative computed values clamp to zero.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Default causal-chain propagation delay ranges, in seconds.
pub const DEFAULT_PROPAGATION_DELAYS: [(f64, f64); 3] = [(5.0, 30.0), (10.0, 60.0), (30.0, 120.0)];

/// How a service recovers after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Health jumps 0 -> 1 in a single step.
    Immediate,
    /// Logarithmic climb sampled every 30 seconds: fast at first, then slower.
    Gradual,
    /// Six equal steps, e.g. pods coming back one by one.
    Stepped,
}

fn secs(s: f64) -> Duration {
    Duration::milliseconds((s * 1000.0).round() as i64)
}

/// Traffic multiplier for a point in time: product of a day-of-week factor
/// and an hour-of-day factor.
pub fn traffic_multiplier(t: DateTime<Utc>) -> f64 {
    let mut multiplier: f64 = 1.0;

    let weekday = t.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        multiplier *= 0.6;
    }

    let hour = t.hour();
    multiplier *= match hour {
        0..=5 => 0.2,   // overnight
        6..=8 => 0.6,   // morning ramp-up
        9..=11 => 1.5,  // morning peak
        12..=13 => 1.3, // lunch
        14..=17 => 1.6, // afternoon peak
        18..=20 => 1.0, // evening
        _ => 0.5,       // late evening
    };

    if weekday == Weekday::Mon {
        multiplier *= 1.3;
    }
    if weekday == Weekday::Fri && hour >= 15 {
        multiplier *= 0.8;
    }

    multiplier.max(0.0)
}

/// Calendar-keyed seasonal multiplier.
pub fn seasonal_multiplier(t: DateTime<Utc>) -> f64 {
    match (t.month(), t.day()) {
        (11, 23..=27) => 3.5, // Black Friday / Cyber Monday window
        (12, _) => 2.5,
        (9, _) => 1.5,
        (7 | 8, _) => 0.8,
        _ => 1.0,
    }
}

/// Burst of `duration * intensity` timestamps drawn from a Gaussian centered
/// on `center` (sigma = duration/6), clamped into
/// `[center - duration/2, center + duration/2]` and sorted.
pub fn burst(
    rng: &mut StdRng,
    center: DateTime<Utc>,
    duration_secs: f64,
    intensity: f64,
) -> Vec<DateTime<Utc>> {
    let count = (duration_secs * intensity) as usize;
    let Ok(dist) = Normal::new(0.0, duration_secs / 6.0) else {
        return Vec::new();
    };

    let half = duration_secs / 2.0;
    let mut timestamps: Vec<DateTime<Utc>> = (0..count)
        .map(|_| {
            let offset = dist.sample(rng).clamp(-half, half);
            center + secs(offset)
        })
        .collect();
    timestamps.sort();
    timestamps
}

/// Degradation timeline from `start` to `end`: `(timestamp, severity)` pairs
/// with `severity = progress^2` and a sampling interval shrinking from 60s
/// toward 12s as severity rises.
pub fn degradation(
    rng: &mut StdRng,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, f64)> {
    let total = (end - start).num_milliseconds() as f64;
    if total <= 0.0 {
        return Vec::new();
    }

    let mut pattern = Vec::new();
    let mut current = start;
    while current <= end {
        let progress = (current - start).num_milliseconds() as f64 / total;
        let severity = (progress * progress).max(0.0);
        pattern.push((current, severity));

        let interval = 60.0 * (1.0 - severity * 0.8);
        current += secs(interval * rng.random_range(0.8..1.2));
    }
    pattern
}

/// Recovery curve after a failure: `(timestamp, health)` pairs with health
/// rising from 0.0 to 1.0.
pub fn recovery(
    failure_time: DateTime<Utc>,
    mode: RecoveryMode,
    duration_secs: f64,
) -> Vec<(DateTime<Utc>, f64)> {
    match mode {
        RecoveryMode::Immediate => vec![
            (failure_time, 0.0),
            (failure_time + Duration::seconds(1), 1.0),
        ],
        RecoveryMode::Gradual => {
            let total = duration_secs * 1000.0;
            if total <= 0.0 {
                return vec![(failure_time, 1.0)];
            }
            let end = failure_time + secs(duration_secs);
            let mut pattern = Vec::new();
            let mut current = failure_time;
            while current <= end {
                let progress = (current - failure_time).num_milliseconds() as f64 / total;
                let health = ((1.0 + progress * 9.0).ln() / 10f64.ln()).max(0.0);
                pattern.push((current, health));
                current += Duration::seconds(30);
            }
            pattern
        }
        RecoveryMode::Stepped => {
            const STEPS: usize = 5;
            (0..=STEPS)
                .map(|i| {
                    let fraction = i as f64 / STEPS as f64;
                    (failure_time + secs(duration_secs * fraction), fraction)
                })
                .collect()
        }
    }
}

/// Causally chained timestamps: the root time followed by up to
/// `num_effects` offsets, each drawn uniformly from the matching
/// `(min, max)` delay range.
pub fn causal_chain(
    rng: &mut StdRng,
    root_time: DateTime<Utc>,
    num_effects: usize,
    delays: &[(f64, f64)],
) -> Vec<DateTime<Utc>> {
    let mut timestamps = vec![root_time];
    for &(min_delay, max_delay) in delays.iter().take(num_effects) {
        let delay = rng.random_range(min_delay..max_delay);
        let last = *timestamps.last().unwrap_or(&root_time);
        timestamps.push(last + secs(delay));
    }
    timestamps
}

/// Sinusoidal periodic pattern (scheduled tasks, GC cycles):
/// `(timestamp, intensity)` with `intensity = 1 + amplitude * sin(2*pi*phase)`
/// and the phase advancing by `period/86400` per step.
pub fn periodic(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    period_secs: f64,
    amplitude: f64,
) -> Vec<(DateTime<Utc>, f64)> {
    if period_secs <= 0.0 {
        return Vec::new();
    }

    let mut pattern = Vec::new();
    let mut current = start;
    let mut phase = 0.0f64;
    while current <= end {
        let intensity = (1.0 + amplitude * (2.0 * std::f64::consts::PI * phase).sin()).max(0.0);
        pattern.push((current, intensity));

        current += secs(period_secs);
        phase += period_secs / 86_400.0;
    }
    pattern
}
