//! Read-only HTTP API over stored weather records.
//!
//! Routes:
//! - `GET /health`: fixed status payload, never touches storage.
//! - `GET /weather/{city_name}`: most recent record for the city, or 404.
//! - `GET /weather/history/{city_name}`: all records for the city, newest first, or 404.
//!
//! City names are matched exactly as stored.

use actix_web::{
    App, HttpResponse, HttpServer, ResponseError,
    error::BlockingError,
    http::StatusCode,
    middleware::Logger,
    web::{self, get, scope},
};
use serde::Serialize;
use tracing::{error, info};
use weather_core::{WeatherError, WeatherRecord, WeatherStore};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No weather data found for city '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] WeatherError),

    #[error("Blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match self {
            Self::NotFound(_) => self.to_string(),
            _ => {
                error!(error = %self, "Query failed");
                "Internal server error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { detail })
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(Health { status: "operational" })
}

async fn latest(
    store: web::Data<WeatherStore>,
    city_name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let city = city_name.into_inner();
    let store = store.get_ref().clone();
    let lookup = city.clone();

    let record: Option<WeatherRecord> = web::block(move || store.latest(&lookup)).await??;

    match record {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Err(ApiError::NotFound(city)),
    }
}

async fn history(
    store: web::Data<WeatherStore>,
    city_name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let city = city_name.into_inner();
    let store = store.get_ref().clone();
    let lookup = city.clone();

    let records = web::block(move || store.history(&lookup)).await??;

    if records.is_empty() {
        return Err(ApiError::NotFound(city));
    }
    Ok(HttpResponse::Ok().json(records))
}

/// Register all routes. The app must carry a `web::Data<WeatherStore>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", get().to(health)).service(
        scope("/weather")
            .route("/history/{city_name}", get().to(history))
            .route("/{city_name}", get().to(latest)),
    );
}

/// Serve the API until the process is stopped.
pub async fn serve(store: WeatherStore, host: &str, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(store);

    info!("Query API listening on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
