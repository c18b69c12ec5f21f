use super::{load_or_default, open_stores, CliError};
use crate::queries;
use std::path::PathBuf;

/// List the query catalog, or show and execute a single query by key.
pub async fn run(config_path: Option<PathBuf>, show: Option<String>) -> Result<(), CliError> {
    match show {
        Some(key) => show_query(config_path, &key).await,
        None => {
            list_catalog();
            Ok(())
        }
    }
}

fn list_catalog() {
    for (category, entries) in queries::by_category() {
        println!("{}", category);
        for query in entries {
            println!("  {:<22} {}", query.key, query.description);
            println!("  {:<22} use case: {}", "", query.use_case);
        }
        println!();
    }
    println!("Run 'flightlake queries --show <key>' to execute one against the analytics store.");
}

async fn show_query(config_path: Option<PathBuf>, key: &str) -> Result<(), CliError> {
    let query = match queries::get(key) {
        Some(query) => query,
        None => {
            eprintln!("Unknown query '{}'. Available keys:", key);
            for query in queries::catalog() {
                eprintln!("  {}", query.key);
            }
            std::process::exit(1);
        }
    };

    let config = load_or_default(config_path)?;
    let (_, analytics) = open_stores(&config)?;

    let sql = query.render(analytics.table());
    println!("-- {} ({})\n{}\n", query.name, query.category, sql);

    let output = analytics.query_rows(&sql).await?;
    println!("{}", output.columns.join(" | "));
    for row in &output.rows {
        let cells: Vec<String> = row.iter().map(format_cell).collect();
        println!("{}", cells.join(" | "));
    }
    println!("\n{} row(s)", output.row_count());
    Ok(())
}

fn format_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
