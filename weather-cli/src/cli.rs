use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use weather_core::{Config, WeatherError, WeatherStore, ingest};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather ingestion and query API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the weather table if it does not exist yet.
    InitDb,

    /// Fetch the current weather for one city and store it.
    Ingest {
        /// City to fetch; defaults to CITY_NAME or the configured default.
        #[arg(long)]
        city: Option<String>,
    },

    /// Serve the read-only query API.
    Serve {
        /// Bind address; defaults to API_HOST.
        #[arg(long)]
        host: Option<String>,

        /// Bind port; defaults to API_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load().context("Failed to load configuration")?;
        let db_path = config.database.path();
        let store = WeatherStore::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        match self.command {
            Command::InitDb => {
                store.ensure_schema().context("Failed to create tables")?;
                info!(database = %db_path.display(), "Tables created");
            }
            Command::Ingest { city } => {
                let record = ingest::run(&config, &store, city.as_deref())
                    .await
                    .map_err(describe_ingest_error)?;

                println!(
                    "Saved #{} {}: {:.1}°C, {}% humidity, {} ({})",
                    record.id,
                    record.city_name,
                    record.temperature,
                    record.humidity,
                    record.description,
                    record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                );
            }
            Command::Serve { host, port } => {
                store.ensure_schema().context("Failed to create tables")?;

                let host = host.unwrap_or(config.server.host);
                let port = port.unwrap_or(config.server.port);
                server::serve(store, &host, port)
                    .await
                    .with_context(|| format!("Query API failed on {host}:{port}"))?;
            }
        }

        Ok(())
    }
}

/// Label ingestion failures for the diagnostic; both kinds exit non-zero.
fn describe_ingest_error(err: WeatherError) -> anyhow::Error {
    let label = if err.is_validation() { "Validation error" } else { "Unexpected error" };
    anyhow::Error::new(err).context(label)
}
