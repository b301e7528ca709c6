//! Deterministic Identifier Minting
//!
//! Every identifier in a run (incident ids, correlation ids, per-source
//! event ids, pod names, trace ids) is derived from the engine's seeded RNG
//! rather than `Uuid::new_v4`, so two runs with the same seed produce the
//! same ids. UUIDs are still RFC 4122 v4 on the wire; only the random bytes
//! come from the caller's RNG.

use rand::Rng;
use rand::rngs::StdRng;
use uuid::Uuid;

/// Lowercase hex string of `len` characters drawn from the RNG.
pub fn hex(rng: &mut StdRng, len: usize) -> String {
    let mut out = String::with_capacity(len);
    while out.len() < len {
        let byte: u8 = rng.random();
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(len);
    out
}

/// `<prefix>_<12 hex>` — the id shape used for incidents and events.
pub fn prefixed(rng: &mut StdRng, prefix: &str, len: usize) -> String {
    format!("{prefix}_{}", hex(rng, len))
}

pub fn incident_id(rng: &mut StdRng) -> String {
    prefixed(rng, "inc", 12)
}

pub fn correlation_id(rng: &mut StdRng) -> String {
    prefixed(rng, "corr", 16)
}

/// A v4 UUID whose random bytes come from the seeded RNG.
pub fn uuid(rng: &mut StdRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

/// Simple (dashless) form of a deterministic v4 UUID.
pub fn uuid_simple(rng: &mut StdRng) -> String {
    uuid(rng).simple().to_string()
}

/// Distributed-tracing id in the `8-4-4-12` hex-segment shape.
pub fn trace_id(rng: &mut StdRng) -> String {
    format!(
        "{}-{}-{}-{}",
        hex(rng, 8),
        hex(rng, 4),
        hex(rng, 4),
        hex(rng, 12)
    )
}

pub fn span_id(rng: &mut StdRng) -> String {
    hex(rng, 16)
}

/// Kubernetes pod name: `<service>-<replica>-<5 hex>`.
pub fn pod_name(rng: &mut StdRng, service: &str) -> String {
    let replica = rng.random_range(0..=10u32);
    format!("{service}-{replica}-{}", hex(rng, 5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_ids_are_deterministic_under_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        assert_eq!(incident_id(&mut a), incident_id(&mut b));
        assert_eq!(correlation_id(&mut a), correlation_id(&mut b));
        assert_eq!(uuid(&mut a), uuid(&mut b));
        assert_eq!(pod_name(&mut a, "user-service"), pod_name(&mut b, "user-service"));
    }

    #[test]
    fn test_id_shapes() {
        let mut rng = StdRng::seed_from_u64(1);

        let inc = incident_id(&mut rng);
        assert!(inc.starts_with("inc_"));
        assert_eq!(inc.len(), "inc_".len() + 12);

        let corr = correlation_id(&mut rng);
        assert!(corr.starts_with("corr_"));
        assert_eq!(corr.len(), "corr_".len() + 16);

        let trace = trace_id(&mut rng);
        assert_eq!(trace.split('-').map(str::len).collect::<Vec<_>>(), vec![8, 4, 4, 12]);

        assert_eq!(span_id(&mut rng).len(), 16);
    }

    #[test]
    fn test_uuid_version_preserved() {
        let mut rng = StdRng::seed_from_u64(3);
        let id = uuid(&mut rng);
        assert_eq!(id.get_version_num(), 4);
    }
}
