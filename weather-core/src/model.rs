use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An observation as produced by a weather source, before it is stored.
///
/// `id` and `timestamp` do not exist yet; the store assigns both on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWeatherRecord {
    pub city_name: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: u8,
    pub description: String,
}

/// A stored observation. Records are never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: i64,
    pub city_name: String,
    pub temperature: f64,
    pub humidity: u8,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl WeatherRecord {
    pub fn from_new(id: i64, record: NewWeatherRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            city_name: record.city_name,
            temperature: record.temperature,
            humidity: record.humidity,
            description: record.description,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_wire_field_names() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let record = WeatherRecord::from_new(
            7,
            NewWeatherRecord {
                city_name: "Curitiba".into(),
                temperature: 18.0,
                humidity: 80,
                description: "nublado".into(),
            },
            ts,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["city_name"], "Curitiba");
        assert_eq!(json["temperature"], 18.0);
        assert_eq!(json["humidity"], 80);
        assert_eq!(json["description"], "nublado");
        assert_eq!(json["timestamp"], "2025-03-01T10:00:00Z");
    }
}
