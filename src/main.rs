use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pint_tracker::calculate;
use pint_tracker::config::{AppConfig, GeocoderSettings};
use pint_tracker::geocode::{Geocoder, GeocoderConfig, GoogleGeocoder, OfflineGeocoder};
use pint_tracker::ingest::{self, RawRow};
use pint_tracker::ledger::FriendLedger;
use pint_tracker::models::{FriendTotal, SessionRecord};
use pint_tracker::storage::{
    read_geo_snapshot, write_geo_snapshot, EntityType, JsonlReader, JsonlWriter, StorageConfig,
};

#[derive(Parser)]
#[command(name = "pint-tracker")]
#[command(about = "Drinking-session tracker with ranked statistics")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port number
        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Generate the full statistics report
    Report {
        /// Read records from this JSONL file instead of the data directory
        #[arg(long)]
        input: Option<PathBuf>,

        /// Write the report JSON here instead of the derived directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip coordinate lookups; use only cached coordinates
        #[arg(long)]
        offline: bool,
    },

    /// Load raw spreadsheet rows (JSON array) into the data directory
    Load {
        /// Path to the raw rows file
        input: PathBuf,
    },
}

fn build_geocoder(settings: &GeocoderSettings) -> Result<Arc<dyn Geocoder>> {
    if !settings.enabled {
        tracing::info!("Geocoding disabled; serving cached coordinates only");
        return Ok(Arc::new(OfflineGeocoder));
    }

    let api_key = settings.resolved_api_key();
    if api_key.is_empty() {
        tracing::warn!("No geocoding API key configured; serving cached coordinates only");
        return Ok(Arc::new(OfflineGeocoder));
    }

    let geocoder = GoogleGeocoder::new(GeocoderConfig {
        base_url: settings.base_url.clone(),
        api_key,
        timeout: settings.timeout(),
    })?;
    Ok(Arc::new(geocoder))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting pint-tracker v{}", env!("CARGO_PKG_VERSION"));

    let config_path = PathBuf::from(&cli.config);
    let config = if config_path.exists() {
        AppConfig::from_file(&config_path)?
    } else {
        tracing::debug!("No config file at {:?}; using defaults", config_path);
        AppConfig::default()
    };

    let storage = StorageConfig::new(PathBuf::from(&cli.data_dir));

    match cli.command {
        Commands::Serve { host, port } => {
            let records =
                JsonlReader::<SessionRecord>::for_entity(&storage, EntityType::Record).read_all()?;
            let ledger = FriendLedger::from_records(&records);
            tracing::info!(
                "Loaded {} records covering {} friends",
                records.len(),
                ledger.entries().len()
            );

            let snapshot = read_geo_snapshot(&storage)?;
            let geocoder = build_geocoder(&config.geocoder)?;

            let state = pint_tracker::api::state::AppState {
                storage: Arc::new(storage),
                ledger: Arc::new(tokio::sync::RwLock::new(ledger)),
                geo: Arc::new(tokio::sync::RwLock::new(snapshot)),
                geocoder,
            };
            let app = pint_tracker::api::build_router(state, &config.server.cors_origin);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Report {
            input,
            output,
            offline,
        } => {
            let records = match input {
                Some(path) => JsonlReader::<SessionRecord>::new(path).read_all()?,
                None => JsonlReader::<SessionRecord>::for_entity(&storage, EntityType::Record)
                    .read_all()?,
            };
            let snapshot = read_geo_snapshot(&storage)?;
            let geocoder: Arc<dyn Geocoder> = if offline {
                Arc::new(OfflineGeocoder)
            } else {
                build_geocoder(&config.geocoder)?
            };

            let outcome =
                calculate::generate_report(&records, &snapshot, geocoder.as_ref()).await?;
            if outcome.geo_snapshot != snapshot {
                write_geo_snapshot(&storage, &outcome.geo_snapshot)?;
            }

            let json = serde_json::to_string_pretty(&outcome.report)?;
            let path = output.unwrap_or_else(|| storage.derived_dir().join("report.json"));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, json)?;
            println!("Report written to {:?}", path);

            println!("\n=== Report Summary ===");
            println!("Total pints:  {}", outcome.report.total_quantity);
            println!("Locations:    {}", outcome.report.location_info.len());
            println!("Friends:      {}", outcome.report.friends_info.len());
            if let Some(err) = outcome.geocode_error {
                println!("Geocoding degraded: {}", err);
            }
        }
        Commands::Load { input } => {
            let contents = std::fs::read_to_string(&input)?;
            let rows: Vec<RawRow> = serde_json::from_str(&contents)?;
            let records = ingest::normalize_rows(&rows, &config.ingest)?;

            let writer = JsonlWriter::<SessionRecord>::for_entity(&storage, EntityType::Record);
            writer.write_all(&records)?;

            let ledger = FriendLedger::from_records(&records);
            let totals_writer =
                JsonlWriter::<FriendTotal>::for_entity(&storage, EntityType::FriendTotal);
            totals_writer.write_all(&ledger.entries())?;

            println!("\n=== Load Summary ===");
            println!("Raw rows:     {}", rows.len());
            println!("Records:      {}", records.len());
            println!("Friends:      {}", ledger.entries().len());
        }
    }

    Ok(())
}
