//! Storage reporting.
//!
//! The `storage_stats` command shells out to `df -h` and keeps the header
//! plus the lines for the configured mount points.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::StorageConfig;

/// Errors that can occur while building a storage report.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("df exited with status {0}")]
    CommandFailed(String),

    #[error("df produced no output")]
    EmptyOutput,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for storage report backends.
#[async_trait]
pub trait StorageReporter: Send + Sync {
    /// Produce a human-readable storage summary.
    async fn report(&self) -> Result<String, StorageError>;
}

/// Reporter backed by the `df` command.
pub struct DfStorageReporter {
    config: StorageConfig,
}

impl DfStorageReporter {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StorageReporter for DfStorageReporter {
    async fn report(&self) -> Result<String, StorageError> {
        let output = Command::new("df").arg("-h").output().await?;

        if !output.status.success() {
            return Err(StorageError::CommandFailed(output.status.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        filter_report(&stdout, &self.config.paths)
    }
}

/// Keep the header line plus the lines mentioning any configured path.
fn filter_report(df_output: &str, paths: &[String]) -> Result<String, StorageError> {
    let mut lines = df_output.lines();
    let header = lines.next().ok_or(StorageError::EmptyOutput)?;

    let mut report = vec![header.to_string()];
    for line in lines {
        if paths.iter().any(|p| line.contains(p.as_str())) {
            report.push(line.to_string());
        }
    }

    Ok(report.join("\n"))
}
