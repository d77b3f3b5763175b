use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod actors;
pub mod analyzers;
pub mod config;
pub mod error;
pub mod observers;
pub mod parse;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod sinks;
pub mod stream;
pub mod tree;

pub use error::{PipelineError, PipelineResult};

/// Kind of measurement a sensor reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Temp,
    Humidity,
    Battery,
    #[default]
    Unknown,
}

impl SensorType {
    /// Parse a type tag as it appears in raw input; anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "temp" => SensorType::Temp,
            "humidity" => SensorType::Humidity,
            "battery" => SensorType::Battery,
            _ => SensorType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temp => "temp",
            SensorType::Humidity => "humidity",
            SensorType::Battery => "battery",
            SensorType::Unknown => "unknown",
        }
    }

    /// `Unknown` carries no routing information; everything else does.
    pub fn is_known(&self) -> bool {
        !matches!(self, SensorType::Unknown)
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical sensor observation, produced by the parsers
///
/// Numeric fields use `0` to mean "absent"; the `has_*` accessors encode
/// that convention so downstream aggregation never averages in missing data.
/// Records are immutable once parsed and are passed between subsystems by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    pub serial: String,

    #[serde(rename = "type")]
    pub kind: SensorType,

    /// Temperature in °C, normalized (raw values above 100 are scaled down)
    pub temperature: f64,

    /// Relative humidity in %, normalized
    pub humidity: f64,

    pub battery_level: f64,
    pub battery_max: f64,
    pub battery_min: f64,

    /// Device state, lower-cased during normalization
    pub state: String,

    pub manufacturer: String,
    pub error: String,
    pub voltage: f64,

    /// Wall clock at parse time
    pub timestamp: DateTime<Utc>,
}

impl Default for SensorRecord {
    fn default() -> Self {
        Self {
            serial: String::new(),
            kind: SensorType::Unknown,
            temperature: 0.0,
            humidity: 0.0,
            battery_level: 0.0,
            battery_max: 0.0,
            battery_min: 0.0,
            state: String::new(),
            manufacturer: String::new(),
            error: String::new(),
            voltage: 0.0,
            timestamp: Utc::now(),
        }
    }
}

impl SensorRecord {
    pub fn has_temperature(&self) -> bool {
        self.temperature > 0.0
    }

    pub fn has_humidity(&self) -> bool {
        self.humidity > 0.0
    }

    pub fn has_battery(&self) -> bool {
        self.battery_level > 0.0 && self.battery_max > 0.0
    }

    /// Battery charge as a percentage of its maximum, if both fields are present
    pub fn battery_percent(&self) -> Option<f64> {
        if self.has_battery() {
            Some(self.battery_level / self.battery_max * 100.0)
        } else {
            None
        }
    }
}
