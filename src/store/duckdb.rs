use super::schema;
use super::{SourceStore, StoreError, TargetStore, WatermarkStore};
use crate::record::RouteRecord;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::types::ValueRef;
use duckdb::Connection;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Column list shared by every record-returning SELECT. Dates and timestamps
/// go over the wire as strings/micros because that round-trips cleanly.
const RECORD_SELECT: &str = "SELECT route_id, airline_code, flight_number, origin_airport, \
     origin_city, origin_country, origin_region, destination_airport, \
     destination_country, destination_region, distance_km, seats, aircraft_type, \
     strftime(flight_date, '%Y-%m-%d'), flight_year, flight_month, epoch_us(updated_at)";

/// Result of an ad-hoc query, used by the benchmark harness to time and
/// compare engines without knowing the shape of each query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// DuckDB-backed store. One instance fronts one database file (or an
/// in-memory database in tests) and one route table inside it; the same type
/// serves as the operational source, the analytics target, and the watermark
/// store depending on which database it was opened against.
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
    path: Option<PathBuf>,
}

impl DuckDbStore {
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Connection(format!("failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database, used by tests.
    pub fn in_memory(table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            path: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Path of the backing database file, absent for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the route table, its change-time index, and the watermark side
    /// table in this database.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(&schema::create_route_table_sql(&table), [])?;
            conn.execute(&schema::create_updated_at_index_sql(&table), [])?;
            conn.execute(schema::CREATE_WATERMARK_TABLE_SQL, [])?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }

    /// Insert records into this store's route table inside one transaction.
    /// Shared by the target-side `bulk_write` and the seeding path.
    pub async fn insert_routes(&self, records: &[RouteRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let conn = self.conn.clone();
        let table = self.table.clone();
        let records = records.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO {table} (route_id, airline_code, flight_number, \
                     origin_airport, origin_city, origin_country, origin_region, \
                     destination_airport, destination_country, destination_region, \
                     distance_km, seats, aircraft_type, flight_date, flight_year, \
                     flight_month, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS DATE), ?, ?, \
                     to_timestamp(? / 1000000.0))"
                ))?;

                for record in &records {
                    stmt.execute(duckdb::params![
                        record.route_id,
                        record.airline_code,
                        record.flight_number,
                        record.origin_airport,
                        record.origin_city,
                        record.origin_country,
                        record.origin_region,
                        record.destination_airport,
                        record.destination_country,
                        record.destination_region,
                        record.distance_km,
                        record.seats,
                        record.aircraft_type,
                        record.flight_date.to_string(),
                        record.flight_year(),
                        record.flight_month(),
                        record.updated_at.timestamp_micros(),
                    ])?;
                }
            }
            tx.commit()?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }

    /// Execute an arbitrary read query, returning every cell as JSON.
    pub async fn query_rows(&self, sql: &str) -> Result<QueryOutput, StoreError> {
        let conn = self.conn.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(&sql)?;

            let mut out_rows = Vec::new();
            {
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let column_count = row.as_ref().column_count();
                    let mut cells = Vec::with_capacity(column_count);
                    for i in 0..column_count {
                        cells.push(value_ref_to_json(row.get_ref(i)?));
                    }
                    out_rows.push(cells);
                }
            }

            let columns = stmt
                .column_names()
                .iter()
                .map(|name| name.to_string())
                .collect();

            Ok::<QueryOutput, StoreError>(QueryOutput {
                columns,
                rows: out_rows,
            })
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }

    /// Row count of this store's route table.
    pub async fn count_rows(&self) -> Result<usize, StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {table}"),
                [],
                |row| row.get(0),
            )?;
            Ok::<usize, StoreError>(count as usize)
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }
}

#[async_trait]
impl SourceStore for DuckDbStore {
    async fn fetch_changed_since(
        &self,
        watermark: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<RouteRecord>, StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut records = Vec::new();

            match watermark {
                Some(watermark) => {
                    let mut stmt = conn.prepare(&format!(
                        "{RECORD_SELECT} FROM {table} \
                         WHERE updated_at > to_timestamp(? / 1000000.0) \
                         ORDER BY updated_at, route_id LIMIT ?"
                    ))?;
                    let rows = stmt.query_map(
                        duckdb::params![watermark.timestamp_micros(), limit as i64],
                        row_to_record,
                    )?;
                    for row in rows {
                        records.push(row?);
                    }
                }
                None => {
                    let mut stmt = stmt_all_rows(&conn, &table)?;
                    let rows = stmt.query_map(duckdb::params![limit as i64], row_to_record)?;
                    for row in rows {
                        records.push(row?);
                    }
                }
            }

            Ok::<Vec<RouteRecord>, StoreError>(records)
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }

    async fn fetch_changed_at(
        &self,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<RouteRecord>, StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(&format!(
                "{RECORD_SELECT} FROM {table} \
                 WHERE updated_at = to_timestamp(? / 1000000.0) \
                 ORDER BY route_id"
            ))?;

            let rows = stmt.query_map(
                duckdb::params![timestamp.timestamp_micros()],
                row_to_record,
            )?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok::<Vec<RouteRecord>, StoreError>(records)
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }
}

fn stmt_all_rows<'a>(
    conn: &'a Connection,
    table: &str,
) -> Result<duckdb::Statement<'a>, duckdb::Error> {
    conn.prepare(&format!(
        "{RECORD_SELECT} FROM {table} ORDER BY updated_at, route_id LIMIT ?"
    ))
}

#[async_trait]
impl TargetStore for DuckDbStore {
    async fn bulk_write(&self, records: &[RouteRecord]) -> Result<(), StoreError> {
        self.insert_routes(records).await
    }
}

#[async_trait]
impl WatermarkStore for DuckDbStore {
    async fn read(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt =
                conn.prepare("SELECT epoch_us(watermark) FROM sync_watermark WHERE id = 1")?;
            let mut rows = stmt.query([])?;

            if let Some(row) = rows.next()? {
                let micros: i64 = row.get(0)?;
                let watermark = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                    StoreError::Watermark(format!("invalid stored watermark: {} us", micros))
                })?;
                Ok(Some(watermark))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }

    async fn write(&self, timestamp: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO sync_watermark (id, watermark, updated_at) \
                 VALUES (1, to_timestamp(? / 1000000.0), to_timestamp(? / 1000000.0))",
                duckdb::params![
                    timestamp.timestamp_micros(),
                    Utc::now().timestamp_micros()
                ],
            )?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Database(format!("task join error: {}", e)))?
    }
}

fn row_to_record(row: &duckdb::Row<'_>) -> Result<RouteRecord, duckdb::Error> {
    let flight_date_str: String = row.get(13)?;
    let flight_date = NaiveDate::parse_from_str(&flight_date_str, "%Y-%m-%d").map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(13, duckdb::types::Type::Text, Box::new(e))
    })?;

    let updated_micros: i64 = row.get(16)?;
    let updated_at = DateTime::from_timestamp_micros(updated_micros).ok_or_else(|| {
        duckdb::Error::FromSqlConversionFailure(
            16,
            duckdb::types::Type::BigInt,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid timestamp",
            )),
        )
    })?;

    Ok(RouteRecord {
        route_id: row.get(0)?,
        airline_code: row.get(1)?,
        flight_number: row.get(2)?,
        origin_airport: row.get(3)?,
        origin_city: row.get(4)?,
        origin_country: row.get(5)?,
        origin_region: row.get(6)?,
        destination_airport: row.get(7)?,
        destination_country: row.get(8)?,
        destination_region: row.get(9)?,
        distance_km: row.get(10)?,
        seats: row.get(11)?,
        aircraft_type: row.get(12)?,
        flight_date,
        updated_at,
    })
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => json!(b),
        ValueRef::TinyInt(i) => json!(i),
        ValueRef::SmallInt(i) => json!(i),
        ValueRef::Int(i) => json!(i),
        ValueRef::BigInt(i) => json!(i),
        ValueRef::HugeInt(i) => match i64::try_from(i) {
            Ok(v) => json!(v),
            Err(_) => json!(i.to_string()),
        },
        ValueRef::UTinyInt(i) => json!(i),
        ValueRef::USmallInt(i) => json!(i),
        ValueRef::UInt(i) => json!(i),
        ValueRef::UBigInt(i) => json!(i),
        ValueRef::Float(f) => json!(f),
        ValueRef::Double(f) => json!(f),
        ValueRef::Text(bytes) => json!(String::from_utf8_lossy(bytes)),
        other => json!(format!("{:?}", other)),
    }
}
