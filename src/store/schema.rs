//! Table definitions for the two route tables and the watermark side table.
//!
//! Both tables carry the same logical schema; which one a database plays is
//! decided by configuration, not by the DDL.

pub const ROUTE_TABLE_COLUMNS: &[&str] = &[
    "route_id",
    "airline_code",
    "flight_number",
    "origin_airport",
    "origin_city",
    "origin_country",
    "origin_region",
    "destination_airport",
    "destination_country",
    "destination_region",
    "distance_km",
    "seats",
    "aircraft_type",
    "flight_date",
    "flight_year",
    "flight_month",
    "updated_at",
];

pub fn create_route_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            route_id BIGINT NOT NULL,
            airline_code VARCHAR NOT NULL,
            flight_number VARCHAR NOT NULL,
            origin_airport VARCHAR NOT NULL,
            origin_city VARCHAR NOT NULL,
            origin_country VARCHAR NOT NULL,
            origin_region VARCHAR NOT NULL,
            destination_airport VARCHAR NOT NULL,
            destination_country VARCHAR NOT NULL,
            destination_region VARCHAR NOT NULL,
            distance_km DOUBLE NOT NULL,
            seats BIGINT NOT NULL,
            aircraft_type VARCHAR NOT NULL,
            flight_date DATE NOT NULL,
            flight_year INTEGER NOT NULL,
            flight_month INTEGER NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )"
    )
}

pub fn create_updated_at_index_sql(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS idx_{table}_updated_at ON {table}(updated_at)")
}

/// Single-row table holding the replication watermark. The `CHECK (id = 1)`
/// keeps it single-row so `INSERT OR REPLACE` is a durable upsert.
pub const CREATE_WATERMARK_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS sync_watermark (
        id INTEGER PRIMARY KEY DEFAULT 1,
        watermark TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CHECK (id = 1)
    )";
