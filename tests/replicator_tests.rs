//! Replicator behavior against scriptable in-memory stores, covering the
//! failure paths the DuckDB-backed tests cannot inject.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use flightlake::record::RouteRecord;
use flightlake::replicator::{ReplicateError, Replicator};
use flightlake::store::{SourceStore, StoreError, TargetStore, WatermarkStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn make_record(route_id: i64, updated_at: DateTime<Utc>) -> RouteRecord {
    RouteRecord {
        route_id,
        airline_code: "BA".to_string(),
        flight_number: format!("BA{}", route_id),
        origin_airport: "LHR".to_string(),
        origin_city: "London".to_string(),
        origin_country: "GB".to_string(),
        origin_region: "Europe".to_string(),
        destination_airport: "JFK".to_string(),
        destination_country: "US".to_string(),
        destination_region: "North America".to_string(),
        distance_km: 5541.0,
        seats: 250,
        aircraft_type: "77W".to_string(),
        flight_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        updated_at,
    }
}

#[derive(Default)]
struct MockSource {
    rows: Mutex<Vec<RouteRecord>>,
    fail: AtomicBool,
    fetch_delay: Option<Duration>,
    // Simulates a writer bumping the tied rows between the capped fetch and
    // the tie re-query, so the re-query finds nothing at that timestamp.
    vanish_ties: AtomicBool,
}

impl MockSource {
    fn push(&self, record: RouteRecord) {
        self.rows.lock().unwrap().push(record);
    }
}

#[async_trait]
impl SourceStore for MockSource {
    async fn fetch_changed_since(
        &self,
        watermark: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<RouteRecord>, StoreError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("source down".to_string()));
        }

        let mut rows: Vec<RouteRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| watermark.map_or(true, |w| r.updated_at > w))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.updated_at, r.route_id));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_changed_at(
        &self,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<RouteRecord>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("source down".to_string()));
        }
        if self.vanish_ties.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        let mut rows: Vec<RouteRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.updated_at == timestamp)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.route_id);
        Ok(rows)
    }
}

#[derive(Default)]
struct MockTarget {
    written: Mutex<Vec<RouteRecord>>,
    fail: AtomicBool,
}

impl MockTarget {
    fn written_ids(&self) -> Vec<i64> {
        self.written.lock().unwrap().iter().map(|r| r.route_id).collect()
    }
}

#[async_trait]
impl TargetStore for MockTarget {
    async fn bulk_write(&self, records: &[RouteRecord]) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database("target down".to_string()));
        }
        self.written.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

#[derive(Default)]
struct MockWatermark {
    value: Mutex<Option<DateTime<Utc>>>,
    fail_write: AtomicBool,
}

#[async_trait]
impl WatermarkStore for MockWatermark {
    async fn read(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(*self.value.lock().unwrap())
    }

    async fn write(&self, timestamp: DateTime<Utc>) -> Result<(), StoreError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(StoreError::Watermark("persist failed".to_string()));
        }
        *self.value.lock().unwrap() = Some(timestamp);
        Ok(())
    }
}

fn build(
    source: Arc<MockSource>,
    target: Arc<MockTarget>,
    watermarks: Arc<MockWatermark>,
    batch_size: usize,
) -> Replicator {
    Replicator::new(
        source as Arc<dyn SourceStore>,
        target as Arc<dyn TargetStore>,
        watermarks as Arc<dyn WatermarkStore>,
        batch_size,
    )
}

#[tokio::test]
async fn repeated_runs_converge_in_batches() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    for i in 0..10 {
        source.push(make_record(i, t0 + chrono::Duration::seconds(i)));
    }

    let replicator = build(source, target.clone(), watermarks.clone(), 3);

    let mut total = 0;
    loop {
        let report = replicator.run_once().await.unwrap();
        total += report.rows_written;
        if report.rows_read == 0 {
            break;
        }
    }

    assert_eq!(total, 10);
    assert_eq!(target.written_ids(), (0..10).collect::<Vec<i64>>());
    assert_eq!(
        *watermarks.value.lock().unwrap(),
        Some(t0 + chrono::Duration::seconds(9))
    );
}

#[tokio::test]
async fn source_failure_leaves_everything_untouched() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    source.fail.store(true, Ordering::SeqCst);

    let replicator = build(source.clone(), target.clone(), watermarks.clone(), 10);

    let err = replicator.run_once().await.unwrap_err();
    assert!(matches!(err, ReplicateError::SourceUnavailable(_)));
    assert!(err.is_transient());
    assert!(target.written_ids().is_empty());
    assert!(watermarks.value.lock().unwrap().is_none());
}

#[tokio::test]
async fn target_failure_leaves_watermark_untouched() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    source.push(make_record(1, t0));
    target.fail.store(true, Ordering::SeqCst);

    let replicator = build(source, target.clone(), watermarks.clone(), 10);

    let err = replicator.run_once().await.unwrap_err();
    assert!(matches!(err, ReplicateError::TargetWriteFailed { .. }));
    assert!(watermarks.value.lock().unwrap().is_none());

    // Recovery: the same batch is picked up on the next run.
    target.fail.store(false, Ordering::SeqCst);
    let report = replicator.run_once().await.unwrap();
    assert_eq!(report.rows_written, 1);
    assert_eq!(target.written_ids(), vec![1]);
}

#[tokio::test]
async fn watermark_persist_failure_causes_replay() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    source.push(make_record(1, t0));
    watermarks.fail_write.store(true, Ordering::SeqCst);

    let replicator = build(source, target.clone(), watermarks.clone(), 10);

    let err = replicator.run_once().await.unwrap_err();
    match err {
        ReplicateError::WatermarkPersist { rows_written, watermark, .. } => {
            assert_eq!(rows_written, 1);
            assert_eq!(watermark, t0);
        }
        other => panic!("expected WatermarkPersist, got {:?}", other),
    }
    // The batch landed even though the watermark did not.
    assert_eq!(target.written_ids(), vec![1]);

    // At-least-once: the next successful run replays the same batch.
    watermarks.fail_write.store(false, Ordering::SeqCst);
    replicator.run_once().await.unwrap();
    assert_eq!(target.written_ids(), vec![1, 1]);
    assert_eq!(*watermarks.value.lock().unwrap(), Some(t0));
}

#[tokio::test]
async fn empty_source_runs_are_idempotent() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());

    let replicator = build(source, target.clone(), watermarks.clone(), 10);

    for _ in 0..3 {
        let report = replicator.run_once().await.unwrap();
        assert_eq!(report.rows_read, 0);
        assert!(!report.advanced());
    }
    assert!(target.written_ids().is_empty());
    assert!(watermarks.value.lock().unwrap().is_none());
}

#[tokio::test]
async fn timestamp_ties_never_split_across_runs() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let t2 = t1 + chrono::Duration::seconds(10);

    source.push(make_record(1, t1));
    source.push(make_record(2, t2));
    source.push(make_record(3, t2));

    // Cap of 2 cuts through the tie at t2; the run must still carry both
    // t2 rows so the watermark can advance to t2 without losing row 3.
    let replicator = build(source, target.clone(), watermarks.clone(), 2);

    let report = replicator.run_once().await.unwrap();
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.end_watermark, Some(t2));
    assert_eq!(target.written_ids(), vec![1, 2, 3]);

    let report = replicator.run_once().await.unwrap();
    assert_eq!(report.rows_read, 0);
}

#[tokio::test]
async fn tie_group_larger_than_batch_size_is_copied_whole() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let tie = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    for i in 0..8 {
        source.push(make_record(i, tie));
    }

    let replicator = build(source, target.clone(), watermarks.clone(), 3);

    let report = replicator.run_once().await.unwrap();
    assert_eq!(report.rows_written, 8);
    assert_eq!(report.end_watermark, Some(tie));
    assert_eq!(target.written_ids(), (0..8).collect::<Vec<i64>>());
}

#[tokio::test]
async fn vanished_tie_requery_leaves_watermark_untouched() {
    let source = Arc::new(MockSource::default());
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let tie = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    source.push(make_record(1, tie));
    source.push(make_record(2, tie));
    source.vanish_ties.store(true, Ordering::SeqCst);

    // The capped fetch fills the batch with the tie group, then the
    // re-query finds nothing at that timestamp. The run must report zero
    // rows and must not invent a watermark.
    let replicator = build(source.clone(), target.clone(), watermarks.clone(), 2);

    let report = replicator.run_once().await.unwrap();
    assert_eq!(report.rows_read, 0);
    assert_eq!(report.rows_written, 0);
    assert!(!report.advanced());
    assert!(target.written_ids().is_empty());
    assert!(watermarks.value.lock().unwrap().is_none());

    // Once the rows are visible again they replicate normally.
    source.vanish_ties.store(false, Ordering::SeqCst);
    let report = replicator.run_once().await.unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.end_watermark, Some(tie));
    assert_eq!(target.written_ids(), vec![1, 2]);
}

#[tokio::test]
async fn shutdown_mid_run_cancels_before_commit() {
    let source = Arc::new(MockSource {
        fetch_delay: Some(Duration::from_millis(150)),
        ..MockSource::default()
    });
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    source.push(make_record(1, t0));

    let replicator = build(source, target.clone(), watermarks.clone(), 10);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let loop_fut = replicator.run_forever(Duration::from_millis(10), shutdown_rx);

    // Flip the shutdown flag while the first run is still inside its source
    // fetch; the run must abort before writing anything.
    let stopper = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
    };

    let (result, _) = tokio::join!(loop_fut, stopper);
    result.unwrap();

    assert!(target.written_ids().is_empty());
    assert!(watermarks.value.lock().unwrap().is_none());
}

#[tokio::test]
async fn concurrent_trigger_is_rejected_not_queued() {
    let source = Arc::new(MockSource {
        fetch_delay: Some(Duration::from_millis(100)),
        ..MockSource::default()
    });
    let target = Arc::new(MockTarget::default());
    let watermarks = Arc::new(MockWatermark::default());
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    source.push(make_record(1, t0));

    let replicator = Arc::new(build(source, target.clone(), watermarks, 10));

    let a = {
        let replicator = replicator.clone();
        tokio::spawn(async move { replicator.run_once().await })
    };
    // Give the first run time to take the guard before the second trigger.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = replicator.run_once().await;

    assert!(matches!(second, Err(ReplicateError::AlreadyRunning)));
    let first = a.await.unwrap().unwrap();
    assert_eq!(first.rows_written, 1);
    assert_eq!(target.written_ids(), vec![1]);
}
