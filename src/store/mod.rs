pub mod duckdb;
pub mod schema;

use crate::record::RouteRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("watermark error: {0}")]
    Watermark(String),
}

impl From<::duckdb::Error> for StoreError {
    fn from(e: ::duckdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Read side of the operational store.
///
/// Rows are returned in non-decreasing `updated_at` order. `fetch_changed_at`
/// exists so a run that hits its batch cap on a timestamp tie can pull every
/// row sharing that timestamp before advancing the watermark; a tie is never
/// split across runs.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn fetch_changed_since(
        &self,
        watermark: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<RouteRecord>, StoreError>;

    async fn fetch_changed_at(
        &self,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<RouteRecord>, StoreError>;
}

/// Write side of the analytics store. `bulk_write` is all-or-nothing per
/// call: either every record is durably written or none are.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn bulk_write(&self, records: &[RouteRecord]) -> Result<(), StoreError>;
}

/// Persistence for the replication watermark. `write` must be durable before
/// it returns; the replicator relies on that to resume correctly after a
/// restart.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn read(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
    async fn write(&self, timestamp: DateTime<Utc>) -> Result<(), StoreError>;
}
