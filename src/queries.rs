//! The analytical query catalog shared by the benchmark harness and the CLI.
//!
//! Every query is a SQL template with a `{table}` placeholder so the same
//! statement can run against either the operational or the analytics table.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct QueryDef {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub use_case: &'static str,
    #[serde(skip)]
    sql_template: &'static str,
}

impl QueryDef {
    /// Render the query against a concrete table.
    pub fn render(&self, table: &str) -> String {
        self.sql_template.replace("{table}", table)
    }
}

pub fn catalog() -> &'static [QueryDef] {
    CATALOG
}

pub fn get(key: &str) -> Option<&'static QueryDef> {
    CATALOG.iter().find(|q| q.key == key)
}

pub fn by_category() -> BTreeMap<&'static str, Vec<&'static QueryDef>> {
    let mut categories: BTreeMap<&'static str, Vec<&'static QueryDef>> = BTreeMap::new();
    for query in CATALOG {
        categories.entry(query.category).or_default().push(query);
    }
    categories
}

static CATALOG: &[QueryDef] = &[
    QueryDef {
        key: "top_10_hubs",
        name: "Top 10 Busiest Hubs",
        description: "Identify airports handling the most seat capacity",
        category: "Hub Analysis",
        use_case: "Network planning - which hubs need expansion?",
        sql_template: "\
            SELECT
                origin_airport,
                origin_city,
                origin_country,
                COUNT(DISTINCT flight_number) AS num_routes,
                SUM(seats) AS total_seats,
                AVG(seats) AS avg_seats_per_flight
            FROM {table}
            WHERE flight_date >= CURRENT_DATE - INTERVAL 12 MONTH
            GROUP BY origin_airport, origin_city, origin_country
            ORDER BY total_seats DESC, origin_airport
            LIMIT 10",
    },
    QueryDef {
        key: "regional_capacity",
        name: "Regional Capacity Distribution",
        description: "Analyze airline capacity across world regions",
        category: "Regional Analysis",
        use_case: "Market analysis - where is capacity concentrated?",
        sql_template: "\
            SELECT
                origin_region,
                destination_region,
                COUNT(*) AS route_count,
                SUM(seats) AS total_capacity,
                AVG(distance_km) AS avg_distance,
                SUM(seats * distance_km) AS capacity_kilometers
            FROM {table}
            WHERE flight_date >= CURRENT_DATE - INTERVAL 6 MONTH
            GROUP BY origin_region, destination_region
            ORDER BY total_capacity DESC, origin_region, destination_region",
    },
    QueryDef {
        key: "underserved_routes",
        name: "Underserved Routes",
        description: "Find routes with low frequency or small aircraft",
        category: "Route Analysis",
        use_case: "Opportunity identification - routes needing more service",
        sql_template: "\
            SELECT
                origin_airport,
                destination_airport,
                distance_km,
                COUNT(*) AS flights_per_month,
                AVG(seats) AS avg_seats,
                SUM(seats) AS monthly_capacity
            FROM {table}
            WHERE flight_date >= CURRENT_DATE - INTERVAL 3 MONTH
            GROUP BY origin_airport, destination_airport, distance_km
            HAVING COUNT(*) < 5 OR AVG(seats) < 150
            ORDER BY distance_km DESC, origin_airport, destination_airport
            LIMIT 50",
    },
    QueryDef {
        key: "capacity_trends",
        name: "Capacity Trends Over Time",
        description: "Track how airline capacity changes month-over-month",
        category: "Time Series Analysis",
        use_case: "Trend analysis - identifying growth/decline patterns",
        sql_template: "\
            SELECT
                flight_year,
                flight_month,
                origin_region,
                COUNT(DISTINCT airline_code) AS num_airlines,
                COUNT(*) AS num_flights,
                SUM(seats) AS total_seats,
                AVG(distance_km) AS avg_distance
            FROM {table}
            WHERE flight_date >= CURRENT_DATE - INTERVAL 24 MONTH
            GROUP BY flight_year, flight_month, origin_region
            ORDER BY flight_year, flight_month, origin_region",
    },
    QueryDef {
        key: "distance_analysis",
        name: "Long-Haul vs Short-Haul Analysis",
        description: "Compare capacity distribution by flight distance categories",
        category: "Distance Segmentation",
        use_case: "Fleet planning - understanding distance-based demand",
        sql_template: "\
            SELECT
                CASE
                    WHEN distance_km < 500 THEN 'Short-haul (<500km)'
                    WHEN distance_km < 1500 THEN 'Medium-haul (500-1500km)'
                    WHEN distance_km < 4000 THEN 'Long-haul (1500-4000km)'
                    ELSE 'Ultra-long-haul (>4000km)'
                END AS distance_category,
                COUNT(*) AS num_routes,
                AVG(seats) AS avg_seats,
                SUM(seats) AS total_seats,
                AVG(distance_km) AS avg_distance
            FROM {table}
            WHERE flight_date >= CURRENT_DATE - INTERVAL 12 MONTH
            GROUP BY distance_category
            ORDER BY distance_category",
    },
];
