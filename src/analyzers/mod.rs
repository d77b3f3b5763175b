//! Per-type statistical analyzers
//!
//! Each analyzer is a stateful accumulator for one sensor type, producing a
//! plain-text report on demand. The manager dispatches records by type; the
//! battery analyzer, when registered, additionally receives every record
//! because battery fields ride along on records of any type.

pub mod battery;
pub mod humidity;
pub mod temperature;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use crate::{SensorRecord, SensorType};

pub use battery::BatteryAnalyzer;
pub use humidity::HumidityAnalyzer;
pub use temperature::TemperatureAnalyzer;

/// Stateful per-type accumulator
pub trait Analyzer: Send {
    /// Human-readable label used to key reports.
    fn label(&self) -> &'static str;

    fn ingest(&mut self, record: &SensorRecord);

    fn report(&self) -> String;
}

/// Owns one analyzer per sensor type behind a single mutex
///
/// New analyzer variants plug in through `register` without touching the
/// dispatch logic.
#[derive(Default)]
pub struct AnalyzerManager {
    inner: Mutex<HashMap<SensorType, Box<dyn Analyzer>>>,
}

impl AnalyzerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three built-in analyzers with the given thresholds.
    pub fn with_default_analyzers(
        temp_warning: f64,
        temp_critical: f64,
        humidity_low: f64,
        humidity_high: f64,
        battery_low: f64,
    ) -> Self {
        let manager = Self::new();
        manager.register(
            SensorType::Temp,
            Box::new(TemperatureAnalyzer::new(temp_warning, temp_critical)),
        );
        manager.register(
            SensorType::Humidity,
            Box::new(HumidityAnalyzer::new(humidity_low, humidity_high)),
        );
        manager.register(
            SensorType::Battery,
            Box::new(BatteryAnalyzer::new(battery_low)),
        );
        manager
    }

    pub fn register(&self, kind: SensorType, analyzer: Box<dyn Analyzer>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, analyzer);
    }

    /// Dispatch a record to the analyzer for its type, plus the battery
    /// analyzer (once) when one is registered.
    pub fn analyze(&self, record: &SensorRecord) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(analyzer) = map.get_mut(&record.kind) {
            analyzer.ingest(record);
        }

        if record.kind != SensorType::Battery {
            if let Some(battery) = map.get_mut(&SensorType::Battery) {
                battery.ingest(record);
            }
        }
    }

    /// All reports keyed by analyzer label, in stable order.
    pub fn reports(&self) -> BTreeMap<String, String> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values()
            .map(|a| (a.label().to_string(), a.report()))
            .collect()
    }

    /// Report of a single analyzer by sensor type.
    pub fn report_for(&self, kind: SensorType) -> Option<String> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&kind).map(|a| a.report())
    }
}
