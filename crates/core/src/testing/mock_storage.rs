//! Mock storage reporter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{StorageError, StorageReporter};

/// Mock implementation of the `StorageReporter` trait.
pub struct MockStorageReporter {
    report: String,
    next_error: Arc<RwLock<Option<StorageError>>>,
}

impl MockStorageReporter {
    pub fn new(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Fail the next report with `error`.
    pub async fn fail_next(&self, error: StorageError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl StorageReporter for MockStorageReporter {
    async fn report(&self) -> Result<String, StorageError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(self.report.clone()),
        }
    }
}
