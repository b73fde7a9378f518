//! Subprocess tier: external analyzer executable.
//!
//! # Protocol
//! ```text
//! <binary> [launcher_args..] <exchange-file>
//!   exchange-file: JSON array of feeding records
//!   stdout:        {"patterns": {..}, "recommendations": [..],
//!                   "analysis_engine": "..", "processed_by": ".."}
//!   exit code:     0
//! ```
//!
//! Anything else (non-zero exit, timeout, unparseable stdout, an `error`
//! key) is a tier failure. The exchange file is owned by one `run` call
//! and removed before it returns on every path.

use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ExecutorConfig;
use crate::executor::tier::{PreparedTask, Tier, TierStatus};
use crate::executor::types::{TaskResult, TierFailure, TierKind};

const STDERR_EXCERPT: usize = 512;

pub struct SubprocessTier {
    binary: Option<PathBuf>,
    launcher_args: Vec<String>,
    timeout: Duration,
    exchange_dir: Option<PathBuf>,
}

impl SubprocessTier {
    pub fn new(binary: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary,
            launcher_args: Vec::new(),
            timeout,
            exchange_dir: None,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            binary: config.task_binary_path.clone(),
            launcher_args: config.launcher_args.clone(),
            timeout: Duration::from_secs(config.max_subprocess_seconds),
            exchange_dir: config.exchange_dir.clone(),
        }
    }

    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    pub fn with_exchange_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exchange_dir = Some(dir.into());
        self
    }

    /// Stage the payload on the blocking pool.
    async fn stage_exchange_file(&self, payload: &[u8]) -> Result<NamedTempFile, TierFailure> {
        let dir = self.exchange_dir.clone();
        let payload = payload.to_vec();
        tokio::task::spawn_blocking(move || write_exchange_file(dir.as_deref(), &payload))
            .await
            .map_err(|e| TierFailure::Runtime(format!("exchange file task failed: {e}")))?
    }

    async fn invoke(&self, binary: &Path, exchange: &Path) -> Result<Vec<u8>, TierFailure> {
        let child = Command::new(binary)
            .args(&self.launcher_args)
            .arg(exchange)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TierFailure::Unavailable(format!("failed to spawn {}: {}", binary.display(), e))
            })?;

        // On timeout the wait future is dropped, which drops and kills the child.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(TierFailure::Timeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(TierFailure::Runtime(format!(
                "{} exited with {}: {}",
                binary.display(),
                output.status,
                excerpt
            )));
        }

        Ok(output.stdout)
    }
}

/// Write `payload` to a fresh exchange file in `dir`, or the system temp dir.
pub fn write_exchange_file(dir: Option<&Path>, payload: &[u8]) -> Result<NamedTempFile, TierFailure> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("feeding-task-").suffix(".json");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(payload)?;
    file.flush()?;
    Ok(file)
}

/// Interpret analyzer stdout.
pub fn parse_analyzer_output(stdout: &[u8]) -> Result<TaskResult, TierFailure> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| TierFailure::MalformedOutput(format!("stdout is not JSON: {e}")))?;

    let Value::Object(data) = value else {
        return Err(TierFailure::MalformedOutput(
            "stdout is not a JSON object".to_string(),
        ));
    };

    if let Some(error) = data.get("error") {
        return Err(TierFailure::Runtime(format!("analyzer reported error: {error}")));
    }
    if !data.get("patterns").is_some_and(Value::is_object) {
        return Err(TierFailure::MalformedOutput(
            "missing 'patterns' object".to_string(),
        ));
    }

    Ok(TaskResult::succeeded(TierKind::Subprocess, data))
}

#[async_trait]
impl Tier for SubprocessTier {
    fn kind(&self) -> TierKind {
        TierKind::Subprocess
    }

    async fn run(&self, task: &PreparedTask) -> Result<TaskResult, TierFailure> {
        let binary = self
            .binary
            .as_deref()
            .ok_or_else(|| TierFailure::Unavailable("no task binary configured".to_string()))?;

        let exchange = self.stage_exchange_file(&task.encoded_payload).await?;
        let started = Instant::now();
        tracing::debug!(
            task = %task.task_name(),
            binary = %binary.display(),
            exchange = %exchange.path().display(),
            "Invoking external analyzer"
        );

        let stdout = self.invoke(binary, exchange.path()).await?;
        let result = parse_analyzer_output(&stdout)?;

        tracing::debug!(
            task = %task.task_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "External analyzer finished"
        );
        Ok(result)
    }

    fn status(&self) -> TierStatus {
        let (state, detail) = match &self.binary {
            None => ("unconfigured", None),
            Some(path) if path.is_absolute() && !path.exists() => {
                ("missing", Some(path.display().to_string()))
            }
            Some(path) => ("configured", Some(path.display().to_string())),
        };
        TierStatus {
            tier: TierKind::Subprocess,
            state,
            detail,
        }
    }
}
