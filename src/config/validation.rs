//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check cross-section constraints (subprocess timeout vs request timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationIssue>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every issue.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        issues.push(ValidationIssue::new("timeouts.request_secs", "must be > 0"));
    }

    let executor = &config.executor;
    if executor.max_subprocess_seconds == 0 {
        issues.push(ValidationIssue::new(
            "executor.max_subprocess_seconds",
            "must be > 0",
        ));
    } else if executor.max_subprocess_seconds >= config.timeouts.request_secs {
        issues.push(ValidationIssue::new(
            "executor.max_subprocess_seconds",
            format!(
                "must be below timeouts.request_secs ({})",
                config.timeouts.request_secs
            ),
        ));
    }

    if executor.task_binary_path.is_none() && !executor.launcher_args.is_empty() {
        issues.push(ValidationIssue::new(
            "executor.launcher_args",
            "set without executor.task_binary_path",
        ));
    }

    let telemetry = &config.telemetry;
    if telemetry.service_name.trim().is_empty() {
        issues.push(ValidationIssue::new("telemetry.service_name", "must not be empty"));
    }
    if !LOG_LEVELS.contains(&telemetry.log_level.to_lowercase().as_str()) {
        issues.push(ValidationIssue::new(
            "telemetry.log_level",
            format!("unknown level '{}'", telemetry.log_level),
        ));
    }
    if !LOG_FORMATS.contains(&telemetry.log_format.as_str()) {
        issues.push(ValidationIssue::new(
            "telemetry.log_format",
            format!("unknown format '{}'", telemetry.log_format),
        ));
    }
    if let Some(url) = &telemetry.collect_url {
        if reqwest::Url::parse(url).is_err() {
            issues.push(ValidationIssue::new(
                "telemetry.collect_url",
                format!("'{}' is not a URL", url),
            ));
        }
    }
    if telemetry.delivery_timeout_secs == 0 {
        issues.push(ValidationIssue::new(
            "telemetry.delivery_timeout_secs",
            "must be > 0",
        ));
    }

    if config.storage.list_limit == 0 {
        issues.push(ValidationIssue::new("storage.list_limit", "must be > 0"));
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::new(
            "metrics.address",
            format!("'{}' is not a socket address", config.metrics.address),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
