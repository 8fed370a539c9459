//! Core library for weather ingestion and querying.
//!
//! This crate defines:
//! - Configuration from file and environment
//! - The OpenWeather client behind the `WeatherSource` trait
//! - SQLite storage of weather records
//! - The one-shot ingestion job
//!
//! It is used by `weather-cli`, which exposes ingestion and the query API as commands.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod provider;
pub mod store;

pub use config::Config;
pub use error::WeatherError;
pub use model::{NewWeatherRecord, WeatherRecord};
pub use provider::{OpenWeatherProvider, WeatherSource};
pub use store::WeatherStore;
