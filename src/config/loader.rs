//! Configuration loading from disk or a remote artifact store.

use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Remote fetch error: {0}")]
    Remote(String),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    Remote(String),
    Defaults,
}

/// Outcome of [`resolve_config`].
///
/// `fallbacks` describes each source that was skipped. Resolution runs before
/// the subscriber exists, so the caller logs them once logging is up.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ServiceConfig,
    pub source: ConfigSource,
    pub fallbacks: Vec<String>,
}

impl ResolvedConfig {
    fn new(config: ServiceConfig, source: ConfigSource, fallbacks: Vec<String>) -> Self {
        Self {
            config,
            source,
            fallbacks,
        }
    }
}

/// Parse and validate a TOML document.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Fetch and validate configuration from a remote artifact store.
///
/// The artifact body is the same TOML document a local file would hold.
pub async fn fetch_remote_config(url: &str) -> Result<ServiceConfig, ConfigError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ConfigError::Remote(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ConfigError::Remote(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ConfigError::Remote(format!(
            "artifact store returned {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ConfigError::Remote(e.to_string()))?;
    parse_config(&body)
}

/// Resolve configuration: local file, then remote artifact, then defaults.
///
/// A missing source falls through. A source that exists but fails to parse
/// or validate is returned as an error.
pub async fn resolve_config(
    path: Option<&Path>,
    remote_url: Option<&str>,
) -> Result<ResolvedConfig, ConfigError> {
    let mut fallbacks = Vec::new();

    if let Some(path) = path {
        if path.exists() {
            let config = load_config(path)?;
            let source = ConfigSource::File(path.display().to_string());
            return Ok(ResolvedConfig::new(config, source, fallbacks));
        }
        fallbacks.push(format!("config file not found: {}", path.display()));
    }

    if let Some(url) = remote_url {
        match fetch_remote_config(url).await {
            Ok(config) => {
                let source = ConfigSource::Remote(url.to_string());
                return Ok(ResolvedConfig::new(config, source, fallbacks));
            }
            Err(ConfigError::Remote(reason)) => {
                fallbacks.push(format!("could not fetch remote config from {url}: {reason}"));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(ResolvedConfig::new(
        ServiceConfig::default(),
        ConfigSource::Defaults,
        fallbacks,
    ))
}
