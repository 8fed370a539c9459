use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{
    config::Config,
    error::{Result, WeatherError},
    model::NewWeatherRecord,
};

use super::WeatherSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the OpenWeather "current weather" endpoint.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    lang: String,
    http: Client,
}

impl std::fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherProvider {
    /// Build a client, failing immediately when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            WeatherError::Configuration(
                "OPENWEATHER_API_KEY is not set in the environment".to_string(),
            )
        })?;

        Self::new(api_key, &config.openweather.base_url, &config.openweather.lang)
    }

    pub fn new(api_key: &str, base_url: &str, lang: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(WeatherError::Configuration("API key must not be empty".to_string()));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WeatherError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            lang: lang.to_string(),
            http,
        })
    }

    #[instrument(skip(self), level = "info")]
    async fn fetch_current(&self, city_name: &str) -> Result<NewWeatherRecord> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city_name),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::SourceUnavailable(e.without_url()))?;

        // The request URL carries the API key; reqwest errors are stripped of it above.
        let status = res.status();
        debug!(%status, "OpenWeather responded");

        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::CityNotFound(city_name.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(WeatherError::InvalidCredential);
        }

        if status.is_success() {
            let body = res
                .text()
                .await
                .map_err(|e| WeatherError::SourceUnavailable(e.without_url()))?;
            parse_current(&body)
        } else {
            let body = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OpenWeather request failed");
            Err(WeatherError::Source { status: status.as_u16(), body: truncate_body(&body) })
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
}

fn parse_current(body: &str) -> Result<NewWeatherRecord> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;

    let description = parsed
        .weather
        .into_iter()
        .next()
        .map(|w| w.description)
        .ok_or_else(|| WeatherError::MalformedResponse("no weather conditions".to_string()))?;

    if parsed.name.trim().is_empty() {
        return Err(WeatherError::MalformedResponse("empty city name".to_string()));
    }
    if description.trim().is_empty() {
        return Err(WeatherError::MalformedResponse("empty weather description".to_string()));
    }

    Ok(NewWeatherRecord {
        city_name: parsed.name,
        temperature: parsed.main.temp,
        humidity: parsed.main.humidity,
        description,
    })
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    async fn fetch(&self, city_name: &str) -> Result<NewWeatherRecord> {
        if city_name.trim().is_empty() {
            return Err(WeatherError::InvalidInput("city name must not be empty".to_string()));
        }
        self.fetch_current(city_name).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/data/2.5/weather";

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("test_key", &format!("{}{}", server.uri(), ENDPOINT), "pt_br")
            .unwrap()
    }

    fn curitiba_body() -> serde_json::Value {
        serde_json::json!({
            "name": "Curitiba",
            "main": {"temp": 19.5, "feels_like": 19.0, "humidity": 82},
            "weather": [
                {"id": 803, "main": "Clouds", "description": "nublado"},
                {"id": 500, "main": "Rain", "description": "chuva leve"}
            ],
            "dt": 1740823200
        })
    }

    #[tokio::test]
    async fn maps_success_body_to_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .and(query_param("q", "curitiba"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "pt_br"))
            .respond_with(ResponseTemplate::new(200).set_body_json(curitiba_body()))
            .expect(1)
            .mount(&server)
            .await;

        let record = provider(&server).fetch("curitiba").await.unwrap();

        assert_eq!(
            record,
            NewWeatherRecord {
                city_name: "Curitiba".into(),
                temperature: 19.5,
                humidity: 82,
                description: "nublado".into(),
            }
        );
    }

    #[tokio::test]
    async fn not_found_is_city_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Atlantis").await.unwrap_err();
        assert!(matches!(err, WeatherError::CityNotFound(ref c) if c == "Atlantis"));
    }

    #[tokio::test]
    async fn unauthorized_is_invalid_credential() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Curitiba").await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCredential));
    }

    #[tokio::test]
    async fn other_status_carries_code() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Curitiba").await.unwrap_err();
        match err {
            WeatherError::Source { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_fields_are_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Curitiba",
                "main": {"temp": 19.5},
                "weather": [{"description": "nublado"}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Curitiba").await.unwrap_err();
        assert!(matches!(err, WeatherError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_conditions_are_malformed() {
        let server = MockServer::start().await;

        let mut body = curitiba_body();
        body["weather"] = serde_json::json!([]);
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Curitiba").await.unwrap_err();
        assert!(matches!(err, WeatherError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Curitiba").await.unwrap_err();
        assert!(matches!(err, WeatherError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn connection_failure_is_source_unavailable() {
        // Nothing listens on port 1.
        let provider =
            OpenWeatherProvider::new("test_key", "http://127.0.0.1:1/data/2.5/weather", "pt_br")
                .unwrap();

        let err = provider.fetch("Curitiba").await.unwrap_err();
        assert!(matches!(err, WeatherError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn transport_error_does_not_reveal_api_key() {
        let provider =
            OpenWeatherProvider::new("s3cr3t_key", "http://127.0.0.1:1/data/2.5/weather", "pt_br")
                .unwrap();

        let err = provider.fetch("Curitiba").await.unwrap_err();
        let rendered = format!("{:#}", anyhow::Error::new(err));

        assert!(rendered.starts_with("Weather source unavailable"));
        assert!(!rendered.contains("s3cr3t_key"), "credential leaked: {rendered}");
    }

    /// Serves one response whose body is cut short of its Content-Length.
    async fn truncated_response(status_line: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!("{status_line}\r\nContent-Length: 1000\r\n\r\n{{\"cod\"");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.flush().await;
        });
        format!("http://{addr}/data/2.5/weather")
    }

    #[tokio::test]
    async fn status_is_classified_even_when_body_is_unreadable() {
        let url = truncated_response("HTTP/1.1 404 Not Found").await;
        let provider = OpenWeatherProvider::new("test_key", &url, "pt_br").unwrap();
        let err = provider.fetch("Atlantis").await.unwrap_err();
        assert!(matches!(err, WeatherError::CityNotFound(_)), "{err:?}");

        let url = truncated_response("HTTP/1.1 401 Unauthorized").await;
        let provider = OpenWeatherProvider::new("test_key", &url, "pt_br").unwrap();
        let err = provider.fetch("Curitiba").await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCredential), "{err:?}");
    }

    #[tokio::test]
    async fn empty_city_is_rejected_without_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(curitiba_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server).fetch("  ").await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidInput(_)));
    }

    #[test]
    fn missing_api_key_fails_at_construction() {
        let err = OpenWeatherProvider::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, WeatherError::Configuration(ref msg) if msg.contains("OPENWEATHER_API_KEY")));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let provider =
            OpenWeatherProvider::new("s3cr3t", "http://localhost/weather", "pt_br").unwrap();
        assert!(!format!("{provider:?}").contains("s3cr3t"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }
}
