use crate::{error::Result, model::NewWeatherRecord};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Something that can report the current weather for a city.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Fetch one observation. Failures are never retried here.
    async fn fetch(&self, city_name: &str) -> Result<NewWeatherRecord>;
}
