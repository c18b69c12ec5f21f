use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flightlake")]
#[command(about = "Operational-to-analytics flight route replication demo", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create both stores, optionally loading sample data
    Init {
        #[arg(long)]
        seed: bool,
    },
    /// Replicate changed rows from the operational to the analytics store
    Sync {
        /// Run a single replication pass and exit
        #[arg(long)]
        once: bool,
        /// Override the configured interval, e.g. "30s" or "5m"
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Benchmark the query catalog on both stores
    Bench {
        /// Write the full report as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the query catalog, or run one query by key
    Queries {
        #[arg(long)]
        show: Option<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flightlake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = flightlake::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Init { seed } => {
            flightlake::cli::init::init(config_path, seed).await?;
        }
        Commands::Sync { once, interval } => {
            flightlake::cli::sync::sync(config_path, once, interval).await?;
        }
        Commands::Bench { output } => {
            flightlake::cli::bench::bench(config_path, output).await?;
        }
        Commands::Queries { show } => {
            flightlake::cli::queries::run(config_path, show).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                flightlake::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
