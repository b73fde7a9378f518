//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the feeding service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Structured telemetry and diagnostic logging.
    pub telemetry: TelemetryConfig,

    /// Analysis task execution tiers.
    pub executor: ExecutorConfig,

    /// Feeding record storage.
    pub storage: StorageConfig,

    /// Report output settings.
    pub reports: ReportConfig,

    /// Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed the subprocess timeout so tier 3 can still answer.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Global on/off switch for structured event emission.
    pub enabled: bool,

    /// Service name stamped on every event.
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Diagnostic log format ("pretty" or "json").
    pub log_format: String,

    /// Remote collection endpoint. Events go to the local console when unset.
    pub collect_url: Option<String>,

    /// Customer identifier injected into delivered events.
    pub customer_id: String,

    /// Deployment environment injected into delivered events.
    pub environment: String,

    /// Per-event delivery timeout for the remote transport.
    pub delivery_timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "bird-feeding-api".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            collect_url: None,
            customer_id: "demo".to_string(),
            environment: "development".to_string(),
            delivery_timeout_secs: 5,
        }
    }
}

/// Task executor configuration. Immutable once the executor is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// External analyzer executable for the subprocess tier.
    pub task_binary_path: Option<PathBuf>,

    /// Arguments placed before the exchange-file path (e.g. `["-jar", "analyzer.jar"]`).
    pub launcher_args: Vec<String>,

    /// Hard timeout for the subprocess tier in seconds.
    pub max_subprocess_seconds: u64,

    /// Attempt the in-process native bridge.
    pub native_bridge_enabled: bool,

    /// Directory for exchange files. System temp dir when unset.
    pub exchange_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            task_binary_path: None,
            launcher_args: Vec::new(),
            max_subprocess_seconds: 30,
            native_bridge_enabled: true,
            exchange_dir: None,
        }
    }
}

/// Feeding record storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file the store is loaded from and flushed to. In-memory only when unset.
    pub path: Option<String>,

    /// Maximum records returned by a listing.
    pub list_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            list_limit: 50,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Destination used when a report request names no path.
    pub default_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from("reports/feeding_report.txt"),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics endpoint.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
