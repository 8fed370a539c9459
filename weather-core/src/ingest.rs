//! One-shot ingestion: fetch the current weather for a city and store it.

use tracing::info;

use crate::{
    config::Config,
    error::Result,
    model::WeatherRecord,
    provider::{OpenWeatherProvider, WeatherSource},
    store::WeatherStore,
};

/// Run a full ingestion against OpenWeather using `config`.
///
/// The schema is ensured first, then the client is built; a missing API key fails
/// here, before any request is sent or any row is written.
pub async fn run(
    config: &Config,
    store: &WeatherStore,
    city: Option<&str>,
) -> Result<WeatherRecord> {
    store.ensure_schema()?;

    let city = city.unwrap_or(&config.default_city);
    let source = OpenWeatherProvider::from_config(config)?;

    ingest(&source, store, city).await
}

/// Fetch one observation from `source` and persist it. Nothing is written on fetch failure.
pub async fn ingest(
    source: &dyn WeatherSource,
    store: &WeatherStore,
    city: &str,
) -> Result<WeatherRecord> {
    info!(city, "Fetching current weather");
    let observation = source.fetch(city).await?;
    info!(
        city = %observation.city_name,
        temperature = observation.temperature,
        humidity = observation.humidity,
        description = %observation.description,
        "Weather fetched"
    );

    let stored = store.insert(observation)?;
    info!(id = stored.id, timestamp = %stored.timestamp, "Weather record saved");
    Ok(stored)
}
