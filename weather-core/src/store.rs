//! SQLite-backed storage of weather observations.
//!
//! Rows are insert-only. A single `WeatherStore` is opened per process and cloned into
//! whoever needs it; every operation holds the connection only for its own duration.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};
use std::{fs, path::Path, sync::Arc};
use tracing::{debug, info};

use crate::{
    error::{Result, WeatherError},
    model::{NewWeatherRecord, WeatherRecord},
};

const SELECT_COLUMNS: &str =
    "SELECT id, city_name, temperature, humidity, description, timestamp FROM weather_data";

#[derive(Clone)]
pub struct WeatherStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for WeatherStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherStore").finish_non_exhaustive()
    }
}

impl WeatherStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Does not create the schema; call [`WeatherStore::ensure_schema`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                WeatherError::Configuration(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        info!(path = %path.display(), "Opening weather database");
        let conn = Connection::open(path)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Scoped access to the connection; released when the guard drops.
    fn session(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Create the table and index if missing. Never touches existing rows.
    pub fn ensure_schema(&self) -> Result<()> {
        self.session().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city_name TEXT NOT NULL,
                temperature REAL NOT NULL,
                humidity INTEGER NOT NULL,
                description TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_data_city_ts
                ON weather_data(city_name, timestamp DESC);
            "#,
        )?;
        debug!("weather_data schema ready");
        Ok(())
    }

    /// Store a record stamped with the current time.
    pub fn insert(&self, record: NewWeatherRecord) -> Result<WeatherRecord> {
        self.insert_at(record, Utc::now())
    }

    /// Store a record with an explicit timestamp.
    pub fn insert_at(
        &self,
        record: NewWeatherRecord,
        timestamp: DateTime<Utc>,
    ) -> Result<WeatherRecord> {
        let conn = self.session();
        conn.execute(
            "INSERT INTO weather_data (city_name, temperature, humidity, description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.city_name,
                record.temperature,
                record.humidity,
                record.description,
                encode_timestamp(&timestamp),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        // Reported with the precision it was stored with.
        let timestamp = decode_timestamp(&encode_timestamp(&timestamp))?;
        debug!(id, city = %record.city_name, "Inserted weather record");
        Ok(WeatherRecord::from_new(id, record, timestamp))
    }

    /// Most recent record for exactly `city_name`. Ties on timestamp go to the highest id.
    pub fn latest(&self, city_name: &str) -> Result<Option<WeatherRecord>> {
        let conn = self.session();
        let row = conn
            .query_row(
                &format!(
                    "{SELECT_COLUMNS} WHERE city_name = ?1 ORDER BY timestamp DESC, id DESC LIMIT 1"
                ),
                params![city_name],
                RawRow::from_row,
            )
            .optional()?;

        row.map(RawRow::into_record).transpose()
    }

    /// All records for exactly `city_name`, newest first. Empty when none exist.
    pub fn history(&self, city_name: &str) -> Result<Vec<WeatherRecord>> {
        let conn = self.session();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE city_name = ?1 ORDER BY timestamp DESC, id DESC"
        ))?;

        let rows = stmt
            .query_map(params![city_name], RawRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RawRow::into_record).collect()
    }

    /// Number of stored records across all cities.
    pub fn count(&self) -> Result<u64> {
        let count: i64 =
            self.session().query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Row as read from SQLite, before the timestamp text is parsed.
struct RawRow {
    id: i64,
    city_name: String,
    temperature: f64,
    humidity: u8,
    description: String,
    timestamp: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            city_name: row.get(1)?,
            temperature: row.get(2)?,
            humidity: row.get(3)?,
            description: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<WeatherRecord> {
        Ok(WeatherRecord {
            id: self.id,
            city_name: self.city_name,
            temperature: self.temperature,
            humidity: self.humidity,
            description: self.description,
            timestamp: decode_timestamp(&self.timestamp)?,
        })
    }
}

// Fixed-width UTC text, so ORDER BY on the column is chronological.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| {
        WeatherError::Storage(rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            Box::new(e),
        ))
    })
}
