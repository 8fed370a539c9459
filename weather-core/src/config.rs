use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const ENV_CONFIG_PATH: &str = "WEATHER_CONFIG";
pub const ENV_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_BASE_URL: &str = "OPENWEATHER_BASE_URL";
pub const ENV_LANG: &str = "OPENWEATHER_LANG";
pub const ENV_CITY: &str = "CITY_NAME";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DB_DIR: &str = "DB_DIR";
pub const ENV_API_HOST: &str = "API_HOST";
pub const ENV_API_PORT: &str = "API_PORT";

pub const DEFAULT_CITY: &str = "Florianópolis";
pub const OPENWEATHER_CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Where the SQLite database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding the database file. `None` means the platform data dir.
    pub dir: Option<PathBuf>,
    /// Database name; the file is `<dir>/<name>.sqlite3`.
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { dir: None, name: "weather_db".to_string() }
    }
}

impl DatabaseConfig {
    pub fn path(&self) -> PathBuf {
        let dir = self.dir.clone().unwrap_or_else(|| {
            ProjectDirs::from("dev", "weather-task", "weather")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });
        dir.join(format!("{}.sqlite3", self.name))
    }
}

/// Upstream OpenWeather settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    /// Mandatory for ingestion; checked when the client is built.
    pub api_key: Option<String>,
    pub base_url: String,
    pub lang: String,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENWEATHER_CURRENT_URL.to_string(),
            lang: "pt_br".to_string(),
        }
    }
}

/// Bind address of the query API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

/// Top-level configuration.
///
/// Example TOML:
/// default_city = "Curitiba"
///
/// [database]
/// dir = "/var/lib/weather"
///
/// [openweather]
/// lang = "en"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_city: String,
    pub database: DatabaseConfig,
    pub openweather: OpenWeatherConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_city: DEFAULT_CITY.to_string(),
            database: DatabaseConfig::default(),
            openweather: OpenWeatherConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, then the config file if present, then the process environment.
    pub fn load() -> Result<Self> {
        let path = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => Self::config_file_path()?,
        };
        Self::load_from(&path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit file and environment lookup.
    pub fn load_from<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_env(env)?;
        Ok(cfg)
    }

    /// Override fields from environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(ENV_API_KEY) {
            self.openweather.api_key = Some(key);
        }
        if let Some(url) = var(ENV_BASE_URL) {
            self.openweather.base_url = url;
        }
        if let Some(lang) = var(ENV_LANG) {
            self.openweather.lang = lang;
        }
        if let Some(city) = var(ENV_CITY) {
            self.default_city = city;
        }
        if let Some(name) = var(ENV_DB_NAME) {
            self.database.name = name;
        }
        if let Some(dir) = var(ENV_DB_DIR) {
            self.database.dir = Some(PathBuf::from(dir));
        }
        if let Some(host) = var(ENV_API_HOST) {
            self.server.host = host;
        }
        if let Some(port) = var(ENV_API_PORT) {
            self.server.port = port
                .parse()
                .with_context(|| format!("{ENV_API_PORT} must be a port number, got '{port}'"))?;
        }

        Ok(())
    }

    /// Path to the optional config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.openweather.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}
