//! Runtime configuration
//!
//! Everything is optional: an absent file or an absent field falls back to
//! the built-in defaults, so the pipeline runs with zero configuration.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::trace;

use crate::actors::Thresholds;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyzers: AnalyzerThresholds,

    #[serde(default)]
    pub alerts: AlertThresholds,

    #[serde(default)]
    pub observers: ObserverThresholds,

    #[serde(default)]
    pub anomaly: AnomalyBounds,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Worker pool size; defaults to the logical processor count.
    pub pool_parallelism: Option<usize>,

    #[serde(default)]
    pub sinks: SinkConfig,

    /// Serial-prefix → manufacturer name overrides (single-character keys).
    pub manufacturers: Option<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analyzers: AnalyzerThresholds::default(),
            alerts: AlertThresholds::default(),
            observers: ObserverThresholds::default(),
            anomaly: AnomalyBounds::default(),
            queue_capacity: default_queue_capacity(),
            pool_parallelism: None,
            sinks: SinkConfig::default(),
            manufacturers: None,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct AnalyzerThresholds {
    #[serde(default = "default_temp_warning")]
    pub temp_warning: f64,

    #[serde(default = "default_temp_critical")]
    pub temp_critical: f64,

    #[serde(default = "default_humidity_low")]
    pub humidity_low: f64,

    #[serde(default = "default_humidity_high")]
    pub humidity_high: f64,

    /// Charge ratio, not a percentage.
    #[serde(default = "default_battery_low_ratio")]
    pub battery_low_ratio: f64,
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        Self {
            temp_warning: default_temp_warning(),
            temp_critical: default_temp_critical(),
            humidity_low: default_humidity_low(),
            humidity_high: default_humidity_high(),
            battery_low_ratio: default_battery_low_ratio(),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct AlertThresholds {
    #[serde(default = "default_alert_temp_high")]
    pub temp_high: f64,

    #[serde(default = "default_alert_temp_low")]
    pub temp_low: f64,

    #[serde(default = "default_alert_humidity_high")]
    pub humidity_high: f64,

    #[serde(default = "default_alert_humidity_low")]
    pub humidity_low: f64,

    /// Percentage of `battery_max`.
    #[serde(default = "default_alert_battery_low")]
    pub battery_low: f64,
}

impl AlertThresholds {
    pub fn to_thresholds(self) -> Thresholds {
        Thresholds {
            temp_high: self.temp_high,
            temp_low: self.temp_low,
            humidity_high: self.humidity_high,
            humidity_low: self.humidity_low,
            battery_low: self.battery_low,
        }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temp_high: default_alert_temp_high(),
            temp_low: default_alert_temp_low(),
            humidity_high: default_alert_humidity_high(),
            humidity_low: default_alert_humidity_low(),
            battery_low: default_alert_battery_low(),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct ObserverThresholds {
    #[serde(default = "default_temp_warning")]
    pub temp_warning: f64,

    #[serde(default = "default_temp_critical")]
    pub temp_critical: f64,

    #[serde(default = "default_battery_low_ratio")]
    pub battery_low_ratio: f64,
}

impl Default for ObserverThresholds {
    fn default() -> Self {
        Self {
            temp_warning: default_temp_warning(),
            temp_critical: default_temp_critical(),
            battery_low_ratio: default_battery_low_ratio(),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct AnomalyBounds {
    #[serde(default = "default_anomaly_temp_low")]
    pub temp_low: f64,

    #[serde(default = "default_temp_critical")]
    pub temp_high: f64,

    #[serde(default = "default_humidity_low")]
    pub humidity_low: f64,

    #[serde(default = "default_humidity_high")]
    pub humidity_high: f64,
}

impl Default for AnomalyBounds {
    fn default() -> Self {
        Self {
            temp_low: default_anomaly_temp_low(),
            temp_high: default_temp_critical(),
            humidity_low: default_humidity_low(),
            humidity_high: default_humidity_high(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SinkConfig {
    /// Human-readable output on stdout.
    #[serde(default = "default_true")]
    pub console: bool,

    /// Text log file, created/truncated on startup.
    pub text_log: Option<PathBuf>,

    /// JSON log file, created/truncated on startup.
    pub json_log: Option<PathBuf>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            console: true,
            text_log: None,
            json_log: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    100
}

fn default_temp_warning() -> f64 {
    25.0
}

fn default_temp_critical() -> f64 {
    30.0
}

fn default_humidity_low() -> f64 {
    30.0
}

fn default_humidity_high() -> f64 {
    70.0
}

fn default_battery_low_ratio() -> f64 {
    0.2
}

fn default_alert_temp_high() -> f64 {
    30.0
}

fn default_alert_temp_low() -> f64 {
    10.0
}

fn default_alert_humidity_high() -> f64 {
    80.0
}

fn default_alert_humidity_low() -> f64 {
    20.0
}

fn default_alert_battery_low() -> f64 {
    30.0
}

fn default_anomaly_temp_low() -> f64 {
    15.0
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
