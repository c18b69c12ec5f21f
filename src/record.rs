use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single enriched flight route row, the unit of replication between the
/// operational and analytics stores.
///
/// `updated_at` is the change-time column: the replicator orders and
/// watermarks on it, and external writers are expected to bump it on every
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub route_id: i64,
    pub airline_code: String,
    pub flight_number: String,
    pub origin_airport: String,
    pub origin_city: String,
    pub origin_country: String,
    pub origin_region: String,
    pub destination_airport: String,
    pub destination_country: String,
    pub destination_region: String,
    pub distance_km: f64,
    pub seats: i64,
    pub aircraft_type: String,
    pub flight_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl RouteRecord {
    pub fn flight_year(&self) -> i32 {
        self.flight_date.year()
    }

    pub fn flight_month(&self) -> u32 {
        self.flight_date.month()
    }
}

/// Distance segmentation used by the seeder and the catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceCategory {
    ShortHaul,
    MediumHaul,
    LongHaul,
    UltraLongHaul,
}

impl DistanceCategory {
    pub fn for_distance(distance_km: f64) -> Self {
        if distance_km < 500.0 {
            DistanceCategory::ShortHaul
        } else if distance_km < 1500.0 {
            DistanceCategory::MediumHaul
        } else if distance_km < 4000.0 {
            DistanceCategory::LongHaul
        } else {
            DistanceCategory::UltraLongHaul
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceCategory::ShortHaul => "Short-haul (<500km)",
            DistanceCategory::MediumHaul => "Medium-haul (500-1500km)",
            DistanceCategory::LongHaul => "Long-haul (1500-4000km)",
            DistanceCategory::UltraLongHaul => "Ultra-long-haul (>4000km)",
        }
    }

    /// Typical seat capacity for a route of this length. Longer routes get
    /// larger aircraft; the exact figures follow the enrichment settings the
    /// sample data was originally generated with.
    pub fn typical_seats(&self) -> i64 {
        match self {
            DistanceCategory::ShortHaul => 140,
            DistanceCategory::MediumHaul => 180,
            DistanceCategory::LongHaul => 250,
            DistanceCategory::UltraLongHaul => 350,
        }
    }
}
