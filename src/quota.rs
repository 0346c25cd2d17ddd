//! Storage quota accounting.
//!
//! Used storage is the sum of `size` over all file items. The figure is
//! cached and must be invalidated after every write to the item store.

use tokio::sync::RwLock;
use tracing::debug;

use crate::db::Database;
use crate::error::QuotaShortfall;
use crate::item::ItemRepository;
use crate::{Result, StowageError};

/// Current usage against the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    /// Bytes consumed by file items.
    pub used: u64,
    /// Configured ceiling.
    pub max: u64,
}

impl StorageUsage {
    /// Bytes still available.
    pub fn available(&self) -> u64 {
        self.max.saturating_sub(self.used)
    }
}

/// Tracks used bytes against the configured maximum.
#[derive(Debug)]
pub struct QuotaAccountant {
    db: Database,
    max_bytes: u64,
    cached_used: RwLock<Option<u64>>,
}

impl QuotaAccountant {
    /// Create an accountant enforcing `max_bytes`.
    pub fn new(db: Database, max_bytes: u64) -> Self {
        Self {
            db,
            max_bytes,
            cached_used: RwLock::new(None),
        }
    }

    /// Bytes currently consumed by all file items.
    pub async fn used_bytes(&self) -> Result<u64> {
        if let Some(used) = *self.cached_used.read().await {
            return Ok(used);
        }

        let mut cached = self.cached_used.write().await;
        if let Some(used) = *cached {
            return Ok(used);
        }

        let used = ItemRepository::new(self.db.pool()).total_file_size().await?;
        debug!(used, "Recomputed storage usage");
        *cached = Some(used);
        Ok(used)
    }

    /// Bytes still available under the ceiling.
    pub async fn remaining(&self) -> Result<u64> {
        Ok(self.usage().await?.available())
    }

    /// Used and maximum bytes.
    pub async fn usage(&self) -> Result<StorageUsage> {
        Ok(StorageUsage {
            used: self.used_bytes().await?,
            max: self.max_bytes,
        })
    }

    /// Fail with `QuotaExceeded` if adding `required` bytes would pass the ceiling.
    ///
    /// Reaching the ceiling exactly is allowed. `skipped` is carried into the
    /// error for reporting.
    pub async fn ensure_fits(&self, required: u64, skipped: usize) -> Result<StorageUsage> {
        let usage = self.usage().await?;

        if usage.used.saturating_add(required) > usage.max {
            return Err(StowageError::QuotaExceeded(QuotaShortfall {
                current_used: usage.used,
                available: usage.available(),
                required,
                skipped,
            }));
        }

        Ok(usage)
    }

    /// Drop the cached figure so the next read recomputes it.
    pub async fn invalidate(&self) {
        *self.cached_used.write().await = None;
    }
}

/// Format a byte count as megabytes with two decimals.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}
