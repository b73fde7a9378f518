//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: a store that cannot be loaded is fatal
//! - The executor and telemetry context are built once and shared

use std::sync::Arc;
use thiserror::Error;

use crate::config::{ServiceConfig, StorageConfig};
use crate::executor::TaskExecutor;
use crate::http::AppState;
use crate::observability::Telemetry;
use crate::store::{FeedingStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open feeding store: {0}")]
    Store(#[from] StoreError),
}

/// Open the feeding store, loading the persistence file when configured.
pub fn open_store(config: &StorageConfig) -> Result<FeedingStore, StoreError> {
    match &config.path {
        Some(path) => FeedingStore::load_from_file(path),
        None => Ok(FeedingStore::new(None)),
    }
}

/// Build the shared application state from a resolved configuration.
pub fn build_state(config: ServiceConfig) -> Result<AppState, StartupError> {
    let store = open_store(&config.storage)?;
    let telemetry = Arc::new(Telemetry::from_config(&config.telemetry));
    let executor = Arc::new(TaskExecutor::from_config(&config.executor));

    tracing::info!(
        telemetry_enabled = telemetry.is_enabled(),
        service_name = %telemetry.service_name(),
        records = store.count(),
        subprocess_binary = ?config.executor.task_binary_path,
        "Subsystems initialized"
    );

    Ok(AppState::new(config, telemetry, executor, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state_with_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.storage.path = Some(dir.path().join("feedings.json").to_string_lossy().into_owned());

        let state = build_state(config).unwrap();
        assert_eq!(state.store.count(), 0);
        assert!(!state.telemetry.is_enabled());
    }

    #[test]
    fn test_corrupt_store_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedings.json");
        std::fs::write(&path, "not json").unwrap();

        let config = StorageConfig {
            path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(open_store(&config), Err(StoreError::Json(_))));
    }
}
