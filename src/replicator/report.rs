use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Summary of one replication run. Produced for every completed run and
/// consumed by the caller for logging and backoff decisions; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_failed: usize,
    pub start_watermark: Option<DateTime<Utc>>,
    pub end_watermark: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub errors: Vec<String>,
}

impl RunReport {
    pub(crate) fn empty(
        run_id: Uuid,
        watermark: Option<DateTime<Utc>>,
        duration: Duration,
    ) -> Self {
        Self {
            run_id,
            rows_read: 0,
            rows_written: 0,
            rows_failed: 0,
            start_watermark: watermark,
            end_watermark: watermark,
            duration,
            errors: Vec::new(),
        }
    }

    /// True when the run moved the watermark forward.
    pub fn advanced(&self) -> bool {
        self.end_watermark > self.start_watermark
    }
}
