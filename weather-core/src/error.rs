//! Error taxonomy shared by the weather source, the store and the ingestion job.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Weather source unavailable")]
    SourceUnavailable(#[source] reqwest::Error),

    #[error("City '{0}' not found")]
    CityNotFound(String),

    #[error("Invalid API credential")]
    InvalidCredential,

    #[error("Weather source returned HTTP {status}: {body}")]
    Source { status: u16, body: String },

    #[error("Malformed response from weather source: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl WeatherError {
    /// Whether this failure comes from configuration, input or the upstream source,
    /// as opposed to an unexpected local failure.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;
