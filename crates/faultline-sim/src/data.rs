//! Realistic Payload Data
//!
//! Small draws used by all four source generators: addresses, identifiers,
//! naming, latency/status distributions, and canned error text. Everything
//! takes the caller's seeded RNG so payload contents replay under a fixed
//! seed.

use faultline_core::ids;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, LogNormal};
use serde_json::{Value, json};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
    "python-requests/2.31.0",
    "Go-http-client/1.1",
];

/// Mix of internal (RFC 1918) and public-cloud looking addresses.
pub fn ip_address(rng: &mut StdRng) -> String {
    if rng.random_bool(0.7) {
        format!(
            "10.{}.{}.{}",
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(1..255u8)
        )
    } else {
        let prefix = ["54", "52", "34", "3", "18"].choose(rng).unwrap_or(&"54");
        format!(
            "{prefix}.{}.{}.{}",
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(1..255u8)
        )
    }
}

pub fn user_agent(rng: &mut StdRng) -> String {
    USER_AGENTS.choose(rng).unwrap_or(&USER_AGENTS[0]).to_string()
}

pub fn request_id(rng: &mut StdRng) -> String {
    format!("req_{}", ids::hex(rng, 12))
}

pub fn container_id(rng: &mut StdRng) -> String {
    ids::hex(rng, 12)
}

pub fn user_id(rng: &mut StdRng) -> String {
    format!("user_{}", ids::hex(rng, 12))
}

/// `ip-10-0-12-34.a.compute.internal` style node name.
pub fn node_name(rng: &mut StdRng) -> String {
    let az = ["a", "b", "c"].choose(rng).unwrap_or(&"a");
    format!(
        "ip-10-{}-{}-{}.{az}.compute.internal",
        rng.random_range(0..255u8),
        rng.random_range(0..255u8),
        rng.random_range(1..255u8)
    )
}

pub fn image_name(rng: &mut StdRng, service: &str) -> String {
    let registry = "012345678910.dkr.ecr.us-east-1.amazonaws.com";
    let tag = format!(
        "v{}.{}.{}",
        rng.random_range(1..=5u32),
        rng.random_range(0..=20u32),
        rng.random_range(0..=50u32)
    );
    format!("{registry}/company/{service}:{tag}")
}

/// HTTP status with a realistic success-heavy distribution.
pub fn http_status_code(rng: &mut StdRng, success_rate: f64) -> u16 {
    if rng.random_bool(success_rate) {
        let roll: f64 = rng.random();
        match roll {
            r if r < 0.85 => 200,
            r if r < 0.93 => 201,
            r if r < 0.98 => 204,
            _ => 304,
        }
    } else {
        *[400, 401, 403, 404, 429, 500, 502, 503, 504]
            .choose(rng)
            .unwrap_or(&500)
    }
}

/// Request latency in milliseconds with a log-normal tail.
pub fn latency_ms(rng: &mut StdRng) -> f64 {
    match LogNormal::new(3.8, 0.6) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 45.0,
    }
}

pub fn sql_query(rng: &mut StdRng) -> String {
    let queries = [
        "SELECT * FROM users WHERE id = $1",
        "SELECT id, status FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT 20",
        "UPDATE sessions SET last_seen = now() WHERE token = $1",
        "INSERT INTO audit_log (actor, action, created_at) VALUES ($1, $2, now())",
        "SELECT count(*) FROM products WHERE category = $1",
    ];
    queries.choose(rng).unwrap_or(&queries[0]).to_string()
}

/// Canned error text keyed by error type, with randomized specifics.
pub fn error_message(rng: &mut StdRng, error_type: &str) -> String {
    match error_type {
        "ConnectionError" | "NetworkError" => format!(
            "Failed to establish connection to {}:5432",
            ip_address(rng)
        ),
        "TimeoutError" => format!(
            "Request timeout after {} seconds",
            rng.random_range(30..120u32)
        ),
        "MemoryError" | "OutOfMemoryError" | "AllocationFailedException" => format!(
            "Cannot allocate {}MB of memory",
            rng.random_range(100..500u32)
        ),
        "PoolTimeoutError" | "DatabaseConnectionError" | "PSQLException" => format!(
            "QueuePool limit of {} overflow {} reached",
            rng.random_range(10..50u32),
            rng.random_range(5..20u32)
        ),
        "ConfigurationError" | "ImportError" | "ModuleNotFoundError" => {
            "Missing required environment variable: DATABASE_URL".to_string()
        }
        other => format!("{other}: An unexpected error occurred"),
    }
}

/// Minimal stack frames for an error event, innermost last.
pub fn stack_frames(rng: &mut StdRng, service: &str) -> Vec<Value> {
    let module = service.replace('-', "_");
    let line_base = rng.random_range(20..400u32);
    vec![
        json!({
            "filename": format!("app/{module}/handlers.py"),
            "function": "handle_request",
            "lineno": line_base,
            "in_app": true
        }),
        json!({
            "filename": format!("app/{module}/service.py"),
            "function": "execute",
            "lineno": line_base + rng.random_range(1..40u32),
            "in_app": true
        }),
        json!({
            "filename": "sqlalchemy/pool/base.py",
            "function": "connect",
            "lineno": rng.random_range(200..900u32),
            "in_app": false
        }),
    ]
}

/// Breadcrumb trail leading up to an error event.
pub fn breadcrumbs(rng: &mut StdRng, count: usize) -> Vec<Value> {
    let categories = ["http", "query", "cache", "auth", "navigation"];
    (0..count)
        .map(|_| {
            let category = categories.choose(rng).unwrap_or(&"http");
            json!({
                "category": category,
                "level": "info",
                "message": match *category {
                    "http" => format!("GET /api/v1/resource -> {}", http_status_code(rng, 0.95)),
                    "query" => sql_query(rng),
                    "cache" => format!("cache lookup key={}", ids::hex(rng, 8)),
                    "auth" => "session validated".to_string(),
                    _ => "route change".to_string(),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_draws_are_deterministic() {
        let mut a = StdRng::seed_from_u64(21);
        let mut b = StdRng::seed_from_u64(21);
        assert_eq!(ip_address(&mut a), ip_address(&mut b));
        assert_eq!(
            error_message(&mut a, "TimeoutError"),
            error_message(&mut b, "TimeoutError")
        );
        assert_eq!(http_status_code(&mut a, 0.95), http_status_code(&mut b, 0.95));
    }

    #[test]
    fn test_status_codes_are_valid_http() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            let code = http_status_code(&mut rng, 0.95);
            assert!((200..=504).contains(&code));
        }
    }

    #[test]
    fn test_breadcrumb_count() {
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(breadcrumbs(&mut rng, 7).len(), 7);
    }

    #[test]
    fn test_latency_positive() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            assert!(latency_ms(&mut rng) > 0.0);
        }
    }
}
