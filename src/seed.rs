//! Deterministic sample-data generation for the operational store.
//!
//! One row per route per month over a trailing history window, with strictly
//! increasing change-times so replication order is well defined. The route
//! table is a fixed cross-section of real-world city pairs spanning every
//! distance category; determinism keeps demo runs and tests reproducible.

use crate::record::{DistanceCategory, RouteRecord};
use chrono::{Datelike, Duration, NaiveDate, Utc};

struct SeedRoute {
    airline_code: &'static str,
    flight_number: &'static str,
    origin_airport: &'static str,
    origin_city: &'static str,
    origin_country: &'static str,
    origin_region: &'static str,
    destination_airport: &'static str,
    destination_country: &'static str,
    destination_region: &'static str,
    distance_km: f64,
}

const SEED_ROUTES: &[SeedRoute] = &[
    SeedRoute {
        airline_code: "BA",
        flight_number: "BA117",
        origin_airport: "LHR",
        origin_city: "London",
        origin_country: "GB",
        origin_region: "Europe",
        destination_airport: "JFK",
        destination_country: "US",
        destination_region: "North America",
        distance_km: 5541.0,
    },
    SeedRoute {
        airline_code: "AF",
        flight_number: "AF276",
        origin_airport: "CDG",
        origin_city: "Paris",
        origin_country: "FR",
        origin_region: "Europe",
        destination_airport: "NRT",
        destination_country: "JP",
        destination_region: "Asia",
        distance_km: 9712.0,
    },
    SeedRoute {
        airline_code: "LH",
        flight_number: "LH400",
        origin_airport: "FRA",
        origin_city: "Frankfurt",
        origin_country: "DE",
        origin_region: "Europe",
        destination_airport: "JFK",
        destination_country: "US",
        destination_region: "North America",
        distance_km: 6206.0,
    },
    SeedRoute {
        airline_code: "QF",
        flight_number: "QF9",
        origin_airport: "PER",
        origin_city: "Perth",
        origin_country: "AU",
        origin_region: "Oceania",
        destination_airport: "LHR",
        destination_country: "GB",
        destination_region: "Europe",
        distance_km: 14499.0,
    },
    SeedRoute {
        airline_code: "AA",
        flight_number: "AA2402",
        origin_airport: "DFW",
        origin_city: "Dallas",
        origin_country: "US",
        origin_region: "North America",
        destination_airport: "ORD",
        destination_country: "US",
        destination_region: "North America",
        distance_km: 1290.0,
    },
    SeedRoute {
        airline_code: "DL",
        flight_number: "DL2389",
        origin_airport: "ATL",
        origin_city: "Atlanta",
        origin_country: "US",
        origin_region: "North America",
        destination_airport: "MCO",
        destination_country: "US",
        destination_region: "North America",
        distance_km: 645.0,
    },
    SeedRoute {
        airline_code: "EK",
        flight_number: "EK202",
        origin_airport: "DXB",
        origin_city: "Dubai",
        origin_country: "AE",
        origin_region: "Middle East",
        destination_airport: "JFK",
        destination_country: "US",
        destination_region: "North America",
        distance_km: 11022.0,
    },
    SeedRoute {
        airline_code: "SQ",
        flight_number: "SQ321",
        origin_airport: "SIN",
        origin_city: "Singapore",
        origin_country: "SG",
        origin_region: "Asia",
        destination_airport: "LHR",
        destination_country: "GB",
        destination_region: "Europe",
        distance_km: 10885.0,
    },
    SeedRoute {
        airline_code: "JL",
        flight_number: "JL515",
        origin_airport: "HND",
        origin_city: "Tokyo",
        origin_country: "JP",
        origin_region: "Asia",
        destination_airport: "CTS",
        destination_country: "JP",
        destination_region: "Asia",
        distance_km: 820.0,
    },
    SeedRoute {
        airline_code: "LA",
        flight_number: "LA800",
        origin_airport: "SCL",
        origin_city: "Santiago",
        origin_country: "CL",
        origin_region: "South America",
        destination_airport: "GRU",
        destination_country: "BR",
        destination_region: "South America",
        distance_km: 2582.0,
    },
    SeedRoute {
        airline_code: "ET",
        flight_number: "ET500",
        origin_airport: "ADD",
        origin_city: "Addis Ababa",
        origin_country: "ET",
        origin_region: "Africa",
        destination_airport: "LOS",
        destination_country: "NG",
        destination_region: "Africa",
        distance_km: 3552.0,
    },
    SeedRoute {
        airline_code: "WN",
        flight_number: "WN1221",
        origin_airport: "LAS",
        origin_city: "Las Vegas",
        origin_country: "US",
        origin_region: "North America",
        destination_airport: "LAX",
        destination_country: "US",
        destination_region: "North America",
        distance_km: 380.0,
    },
];

fn aircraft_for(category: DistanceCategory) -> &'static str {
    match category {
        DistanceCategory::ShortHaul => "E90",
        DistanceCategory::MediumHaul => "320",
        DistanceCategory::LongHaul => "738",
        DistanceCategory::UltraLongHaul => "77W",
    }
}

fn month_start_back(today: NaiveDate, months_back: u32) -> NaiveDate {
    let total = today.year() * 12 + today.month0() as i32 - months_back as i32;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12) as u32;
    // The first of a month always exists.
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(today)
}

/// Generate one record per seed route per month for the trailing `months`
/// window, ending at the current month. Change-times are strictly
/// increasing in generation order.
pub fn generate_routes(months: u32) -> Vec<RouteRecord> {
    let today = Utc::now().date_naive();
    let base = Utc::now() - Duration::seconds((months as i64) * (SEED_ROUTES.len() as i64));

    let mut records = Vec::with_capacity(months as usize * SEED_ROUTES.len());
    let mut sequence: i64 = 0;

    for month_offset in (0..months).rev() {
        let flight_date = month_start_back(today, month_offset);
        for route in SEED_ROUTES {
            let category = DistanceCategory::for_distance(route.distance_km);
            let seats = category.typical_seats() + sequence % 25;

            records.push(RouteRecord {
                route_id: sequence + 1,
                airline_code: route.airline_code.to_string(),
                flight_number: route.flight_number.to_string(),
                origin_airport: route.origin_airport.to_string(),
                origin_city: route.origin_city.to_string(),
                origin_country: route.origin_country.to_string(),
                origin_region: route.origin_region.to_string(),
                destination_airport: route.destination_airport.to_string(),
                destination_country: route.destination_country.to_string(),
                destination_region: route.destination_region.to_string(),
                distance_km: route.distance_km,
                seats,
                aircraft_type: aircraft_for(category).to_string(),
                flight_date,
                updated_at: base + Duration::seconds(sequence),
            });
            sequence += 1;
        }
    }

    records
}
