use std::sync::Arc;

use crate::store::{ForecastStore, StoreError};

/// Removes forecast rows superseded by a newer fetch of the same
/// (location, timestamp). Reads stay correct without it; it only bounds
/// table growth.
pub struct RetentionSweeper {
    store: Arc<dyn ForecastStore>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn ForecastStore>) -> Self {
        Self { store }
    }

    pub async fn sweep(&self) -> Result<u64, StoreError> {
        let deleted = self.store.purge_stale().await?;
        tracing::info!(deleted, "purged stale forecast rows");
        Ok(deleted)
    }
}
