pub mod report;

pub use report::RunReport;

use crate::store::{SourceStore, StoreError, TargetStore, WatermarkStore};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReplicateError {
    /// The operational store could not be read. Transient; the watermark is
    /// untouched and the next run re-reads the same batch.
    #[error("source unavailable: {0}")]
    SourceUnavailable(StoreError),

    /// The watermark could not be read at the start of a run. Transient and
    /// retry-safe; nothing has been written yet.
    #[error("watermark unavailable: {0}")]
    WatermarkUnavailable(StoreError),

    /// The bulk write to the analytics store failed. The watermark is
    /// untouched; rows that did land are tolerated as duplicates on retry.
    #[error("target write failed ({rows} rows): {source}")]
    TargetWriteFailed { rows: usize, source: StoreError },

    /// The batch was written but the watermark could not be persisted. This
    /// is the one non-idempotent failure: a blind retry replays the whole
    /// batch. Surfaced loudly rather than silently retried.
    #[error("watermark persist failed after writing {rows_written} rows (watermark {watermark}): {source}")]
    WatermarkPersist {
        rows_written: usize,
        watermark: DateTime<Utc>,
        source: StoreError,
    },

    /// Another run is already in flight; the trigger is rejected, never
    /// queued.
    #[error("a replication run is already in flight")]
    AlreadyRunning,

    /// Shutdown was requested before the commit step; the run aborted
    /// without writing anything.
    #[error("run cancelled before commit")]
    Cancelled,
}

impl ReplicateError {
    /// Whether a retry on the next interval is safe without operator
    /// involvement.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReplicateError::SourceUnavailable(_)
                | ReplicateError::WatermarkUnavailable(_)
                | ReplicateError::TargetWriteFailed { .. }
                | ReplicateError::AlreadyRunning
                | ReplicateError::Cancelled
        )
    }
}

/// Micro-batch replicator from the operational store to the analytics store.
///
/// Each run copies rows with `updated_at` strictly after the persisted
/// watermark, in change-time order, as one atomic write-and-advance unit.
/// Delivery is at-least-once: the target may see a batch twice if the
/// watermark write fails or the process dies between write and persist, and
/// the append-only target keeps `route_id` + `updated_at` so consumers can
/// deduplicate if exact counts matter.
pub struct Replicator {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    watermarks: Arc<dyn WatermarkStore>,
    batch_size: usize,
    run_guard: tokio::sync::Mutex<()>,
    runs_completed: AtomicU64,
    records_replicated: AtomicU64,
}

impl Replicator {
    pub fn new(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        watermarks: Arc<dyn WatermarkStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            target,
            watermarks,
            batch_size,
            run_guard: tokio::sync::Mutex::new(()),
            runs_completed: AtomicU64::new(0),
            records_replicated: AtomicU64::new(0),
        }
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn records_replicated(&self) -> u64 {
        self.records_replicated.load(Ordering::Relaxed)
    }

    /// Execute one replication run. Rejects the call if another run is in
    /// flight.
    pub async fn run_once(&self) -> Result<RunReport, ReplicateError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| ReplicateError::AlreadyRunning)?;
        self.execute_run(None).await
    }

    /// Run continuously until `shutdown` flips to true. Ticks are measured
    /// from when each iteration starts, and a slow run delays the next tick
    /// rather than overlapping it. A shutdown observed mid-run lets the run
    /// finish (or abort before commit) before the loop exits.
    pub async fn run_forever(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ReplicateError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "replicator loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }

                    let result = {
                        let _guard = match self.run_guard.try_lock() {
                            Ok(guard) => guard,
                            Err(_) => {
                                warn!("previous run still in flight, deferring to next interval");
                                continue;
                            }
                        };
                        self.execute_run(Some(&shutdown)).await
                    };

                    match result {
                        Ok(report) => {
                            if report.rows_read == 0 {
                                info!(run_id = %report.run_id, "no new rows to replicate");
                            }
                        }
                        Err(ReplicateError::Cancelled) => {
                            info!("run aborted before commit, shutting down");
                            break;
                        }
                        Err(e @ ReplicateError::WatermarkPersist { .. }) => {
                            // Retrying blindly would replay the whole batch;
                            // an operator has to reconcile the target first.
                            error!(error = %e, "watermark persist failed, operator attention required");
                        }
                        Err(e) => {
                            warn!(error = %e, "replication run failed, retrying next interval");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            runs = self.runs_completed(),
            records = self.records_replicated(),
            "replicator loop stopped"
        );
        Ok(())
    }

    async fn execute_run(
        &self,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<RunReport, ReplicateError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let start_watermark = self
            .watermarks
            .read()
            .await
            .map_err(ReplicateError::WatermarkUnavailable)?;

        let mut batch = self
            .source
            .fetch_changed_since(start_watermark, self.batch_size)
            .await
            .map_err(ReplicateError::SourceUnavailable)?;

        if batch.is_empty() {
            let report = RunReport::empty(run_id, start_watermark, started.elapsed());
            info!(run_id = %run_id, "run complete, no changed rows");
            self.runs_completed.fetch_add(1, Ordering::Relaxed);
            return Ok(report);
        }

        // The cap may have cut through a group of rows sharing the max
        // change-time. Advancing the watermark past a split tie would drop
        // the remainder forever, so pull every row at that timestamp and
        // accept the bounded overshoot.
        if batch.len() >= self.batch_size {
            let max_ts = batch[batch.len() - 1].updated_at;
            let ties = self
                .source
                .fetch_changed_at(max_ts)
                .await
                .map_err(ReplicateError::SourceUnavailable)?;
            batch.retain(|r| r.updated_at < max_ts);
            batch.extend(ties);
        }

        // The watermark only ever moves to a change-time actually observed
        // in this run. The tie re-query can come back empty when a writer
        // bumps the tied rows between the two reads; those rows carry later
        // change-times now and surface on a subsequent run.
        let end_watermark = match batch.iter().map(|r| r.updated_at).max() {
            Some(ts) => ts,
            None => {
                let report = RunReport::empty(run_id, start_watermark, started.elapsed());
                info!(run_id = %run_id, "run complete, tied rows changed between reads");
                self.runs_completed.fetch_add(1, Ordering::Relaxed);
                return Ok(report);
            }
        };
        let rows_read = batch.len();

        // Cooperative cancellation point: nothing has been written yet.
        if let Some(rx) = shutdown {
            if *rx.borrow() {
                return Err(ReplicateError::Cancelled);
            }
        }

        self.target
            .bulk_write(&batch)
            .await
            .map_err(|source| ReplicateError::TargetWriteFailed {
                rows: rows_read,
                source,
            })?;

        self.watermarks.write(end_watermark).await.map_err(|source| {
            ReplicateError::WatermarkPersist {
                rows_written: rows_read,
                watermark: end_watermark,
                source,
            }
        })?;

        let report = RunReport {
            run_id,
            rows_read,
            rows_written: rows_read,
            rows_failed: 0,
            start_watermark,
            end_watermark: Some(end_watermark),
            duration: started.elapsed(),
            errors: Vec::new(),
        };

        info!(
            run_id = %run_id,
            rows = rows_read,
            watermark = %end_watermark,
            duration_ms = report.duration.as_millis() as u64,
            "run complete"
        );

        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.records_replicated
            .fetch_add(rows_read as u64, Ordering::Relaxed);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RouteRecord;
    use crate::store::duckdb::DuckDbStore;
    use chrono::{NaiveDate, TimeZone};

    fn make_record(route_id: i64, updated_at: DateTime<Utc>) -> RouteRecord {
        RouteRecord {
            route_id,
            airline_code: "AF".to_string(),
            flight_number: format!("AF{}", route_id),
            origin_airport: "CDG".to_string(),
            origin_city: "Paris".to_string(),
            origin_country: "FR".to_string(),
            origin_region: "Europe".to_string(),
            destination_airport: "NRT".to_string(),
            destination_country: "JP".to_string(),
            destination_region: "Asia".to_string(),
            distance_km: 9700.0,
            seats: 280,
            aircraft_type: "77W".to_string(),
            flight_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            updated_at,
        }
    }

    async fn setup() -> (Arc<DuckDbStore>, Arc<DuckDbStore>, Replicator) {
        let source = Arc::new(DuckDbStore::in_memory("routes_ops").unwrap());
        let target = Arc::new(DuckDbStore::in_memory("routes_analytics").unwrap());
        source.init_schema().await.unwrap();
        target.init_schema().await.unwrap();

        let replicator = Replicator::new(
            source.clone() as Arc<dyn SourceStore>,
            target.clone() as Arc<dyn TargetStore>,
            target.clone() as Arc<dyn WatermarkStore>,
            100,
        );
        (source, target, replicator)
    }

    #[tokio::test]
    async fn test_first_run_copies_everything() {
        let (source, target, replicator) = setup().await;
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        let records: Vec<RouteRecord> = (0..10)
            .map(|i| make_record(i, t0 + chrono::Duration::seconds(i)))
            .collect();
        source.insert_routes(&records).await.unwrap();

        let report = replicator.run_once().await.unwrap();
        assert_eq!(report.rows_read, 10);
        assert_eq!(report.rows_written, 10);
        assert_eq!(report.start_watermark, None);
        assert_eq!(
            report.end_watermark,
            Some(t0 + chrono::Duration::seconds(9))
        );
        assert_eq!(target.count_rows().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_empty_run_leaves_watermark_untouched() {
        let (_source, target, replicator) = setup().await;

        let report = replicator.run_once().await.unwrap();
        assert_eq!(report.rows_read, 0);
        assert!(!report.advanced());
        assert!(WatermarkStore::read(target.as_ref()).await.unwrap().is_none());
        assert_eq!(target.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_incremental_runs_only_copy_new_rows() {
        let (source, target, replicator) = setup().await;
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        source
            .insert_routes(&[make_record(1, t0)])
            .await
            .unwrap();
        replicator.run_once().await.unwrap();

        source
            .insert_routes(&[make_record(2, t0 + chrono::Duration::seconds(30))])
            .await
            .unwrap();
        let report = replicator.run_once().await.unwrap();

        assert_eq!(report.rows_read, 1);
        assert_eq!(report.start_watermark, Some(t0));
        assert_eq!(target.count_rows().await.unwrap(), 2);
        assert_eq!(replicator.records_replicated(), 2);
    }

    #[tokio::test]
    async fn test_run_forever_stops_on_shutdown() {
        let (source, target, replicator) = setup().await;
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        source
            .insert_routes(&[make_record(1, t0)])
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_fut = replicator.run_forever(Duration::from_millis(20), shutdown_rx);

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            shutdown_tx.send(true).unwrap();
        };

        let (result, _) = tokio::join!(loop_fut, stopper);
        result.unwrap();

        assert_eq!(target.count_rows().await.unwrap(), 1);
        assert!(replicator.runs_completed() >= 1);
    }
}
