//! Simulation Configuration
//!
//! Service topology, incident catalog, and generation parameters, loaded
//! from a TOML document or built from the defaults below. The config is an
//! explicit struct passed by value into the engine constructor — there is
//! no hidden shared state. Catalogs use `BTreeMap` so iteration order (and
//! therefore everything derived from it under a fixed seed) is stable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::incident::Severity;

/// Complete configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub generation: GenerationParams,
    /// Service name -> topology entry.
    pub services: BTreeMap<String, ServiceSpec>,
    /// Incident type -> catalog entry.
    pub incidents: BTreeMap<String, IncidentSpec>,
}

/// One service in the simulated topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub resources: ResourceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu: String,
    pub memory: String,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            cpu: "500m".to_string(),
            memory: "512Mi".to_string(),
        }
    }
}

/// One incident type in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentSpec {
    /// Relative probability weight when drawing the schedule.
    #[serde(default = "default_probability")]
    pub probability: f64,
    /// Inclusive `[min, max]` duration range in minutes.
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: [u32; 2],
    #[serde(default)]
    pub severity: Severity,
    /// Candidate root-cause services; one is drawn per incident.
    #[serde(default)]
    pub affected_services: Vec<String>,
}

/// Engine-level generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Background log volume at multiplier 1.0.
    #[serde(default = "default_logs_per_minute")]
    pub normal_logs_per_minute: f64,
    /// Incident count for a 30-day window; scaled linearly for others.
    #[serde(default = "default_total_incidents")]
    pub total_incidents: u32,
    /// Base seconds between background batches at multiplier 1.0.
    #[serde(default = "default_base_interval")]
    pub base_interval_seconds: f64,
    /// Master seed; fixes every random draw of the run.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_namespace() -> String {
    "production".to_string()
}

fn default_probability() -> f64 {
    0.05
}

fn default_duration_minutes() -> [u32; 2] {
    [10, 60]
}

fn default_logs_per_minute() -> f64 {
    600.0
}

fn default_total_incidents() -> u32 {
    50
}

fn default_base_interval() -> f64 {
    60.0
}

fn default_seed() -> u64 {
    42
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            normal_logs_per_minute: default_logs_per_minute(),
            total_incidents: default_total_incidents(),
            base_interval_seconds: default_base_interval(),
            seed: default_seed(),
        }
    }
}

impl SimulationConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|cause| ConfigError::Read {
            path: path.to_path_buf(),
            cause,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|cause| ConfigError::Parse {
            path: path.to_path_buf(),
            cause,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fail-fast validation; called before the engine starts running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::EmptyServiceCatalog);
        }
        if self.incidents.is_empty() {
            return Err(ConfigError::EmptyIncidentCatalog);
        }

        let mut total_weight = 0.0;
        for (incident_type, spec) in &self.incidents {
            let [min, max] = spec.duration_minutes;
            if min == 0 || min > max {
                return Err(ConfigError::InvalidDurationRange {
                    incident_type: incident_type.clone(),
                    min,
                    max,
                });
            }
            if spec.probability < 0.0 {
                return Err(ConfigError::NegativeProbability {
                    incident_type: incident_type.clone(),
                    probability: spec.probability,
                });
            }
            total_weight += spec.probability;
        }
        if total_weight <= 0.0 {
            return Err(ConfigError::ZeroProbabilityMass);
        }

        if self.generation.normal_logs_per_minute <= 0.0 {
            return Err(ConfigError::NonPositiveParameter {
                name: "normal_logs_per_minute",
                value: self.generation.normal_logs_per_minute,
            });
        }
        if self.generation.base_interval_seconds <= 0.0 {
            return Err(ConfigError::NonPositiveParameter {
                name: "base_interval_seconds",
                value: self.generation.base_interval_seconds,
            });
        }

        Ok(())
    }

    /// Service names in stable (sorted) order.
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

impl Default for SimulationConfig {
    /// Built-in e-commerce topology used when no config file is given.
    fn default() -> Self {
        let mut services = BTreeMap::new();

        let app = |endpoints: &[&str], image: &str| ServiceSpec {
            namespace: "production".to_string(),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            image: Some(image.to_string()),
            resources: ResourceSpec::default(),
        };

        services.insert(
            "api-gateway".to_string(),
            app(&["/api/v1/route", "/health"], "company/api-gateway:v3.2.1"),
        );
        services.insert(
            "user-service".to_string(),
            app(
                &["/api/v1/users", "/api/v1/auth/login", "/health"],
                "company/user-service:v2.5.0",
            ),
        );
        services.insert(
            "order-service".to_string(),
            app(
                &["/api/v1/orders", "/api/v1/orders/status", "/health"],
                "company/order-service:v1.14.2",
            ),
        );
        services.insert(
            "payment-service".to_string(),
            app(
                &["/api/v1/payments", "/api/v1/refunds", "/health"],
                "company/payment-service:v4.0.3",
            ),
        );
        services.insert(
            "product-service".to_string(),
            app(
                &["/api/v1/products", "/api/v1/search", "/health"],
                "company/product-service:v2.1.7",
            ),
        );
        services.insert(
            "notification-service".to_string(),
            app(
                &["/api/v1/notify", "/health"],
                "company/notification-service:v1.3.0",
            ),
        );
        services.insert(
            "postgres-primary".to_string(),
            ServiceSpec {
                namespace: "data".to_string(),
                endpoints: Vec::new(),
                image: Some("postgres:15.4".to_string()),
                resources: ResourceSpec {
                    cpu: "2000m".to_string(),
                    memory: "8Gi".to_string(),
                },
            },
        );
        services.insert(
            "redis-cache".to_string(),
            ServiceSpec {
                namespace: "data".to_string(),
                endpoints: Vec::new(),
                image: Some("redis:7.2".to_string()),
                resources: ResourceSpec {
                    cpu: "1000m".to_string(),
                    memory: "4Gi".to_string(),
                },
            },
        );

        let mut incidents = BTreeMap::new();
        incidents.insert(
            "memory_leak".to_string(),
            IncidentSpec {
                probability: 0.2,
                duration_minutes: [30, 90],
                severity: Severity::Critical,
                affected_services: vec![
                    "user-service".to_string(),
                    "order-service".to_string(),
                    "payment-service".to_string(),
                ],
            },
        );
        incidents.insert(
            "deployment_failure".to_string(),
            IncidentSpec {
                probability: 0.15,
                duration_minutes: [10, 30],
                severity: Severity::High,
                affected_services: vec![
                    "user-service".to_string(),
                    "product-service".to_string(),
                    "notification-service".to_string(),
                ],
            },
        );
        incidents.insert(
            "database_connection_pool_exhaustion".to_string(),
            IncidentSpec {
                probability: 0.15,
                // The scripted recipe spans 28 minutes of absolute offsets;
                // shorter durations would push samples past end_time.
                duration_minutes: [30, 45],
                severity: Severity::Critical,
                affected_services: vec!["user-service".to_string(), "order-service".to_string()],
            },
        );
        incidents.insert(
            "service_degradation".to_string(),
            IncidentSpec {
                probability: 0.3,
                duration_minutes: [10, 60],
                severity: Severity::High,
                affected_services: vec![
                    "api-gateway".to_string(),
                    "order-service".to_string(),
                    "product-service".to_string(),
                ],
            },
        );
        incidents.insert(
            "cache_miss_storm".to_string(),
            IncidentSpec {
                probability: 0.2,
                duration_minutes: [10, 40],
                severity: Severity::Medium,
                affected_services: vec!["product-service".to_string(), "redis-cache".to_string()],
            },
        );

        Self {
            generation: GenerationParams::default(),
            services,
            incidents,
        }
    }
}
