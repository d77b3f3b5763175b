//! Temperature trend analyzer

use crate::SensorRecord;

use super::Analyzer;

/// Collects positive temperature readings and classifies the running maximum
/// against warning/critical thresholds.
pub struct TemperatureAnalyzer {
    warning_threshold: f64,
    critical_threshold: f64,
    samples: Vec<f64>,
}

impl TemperatureAnalyzer {
    /// Defaults: warn above 25°C, critical above 30°C.
    pub fn new(warning_threshold: f64, critical_threshold: f64) -> Self {
        Self {
            warning_threshold,
            critical_threshold,
            samples: Vec::new(),
        }
    }

    fn status(&self, max: f64) -> &'static str {
        if max > self.critical_threshold {
            "CRITICAL"
        } else if max > self.warning_threshold {
            "Warning"
        } else {
            "Normal"
        }
    }
}

impl Default for TemperatureAnalyzer {
    fn default() -> Self {
        Self::new(25.0, 30.0)
    }
}

impl Analyzer for TemperatureAnalyzer {
    fn label(&self) -> &'static str {
        "Temperature"
    }

    fn ingest(&mut self, record: &SensorRecord) {
        if record.has_temperature() {
            self.samples.push(record.temperature);
        }
    }

    fn report(&self) -> String {
        if self.samples.is_empty() {
            return "Temperature Analysis\nno temperature samples collected\n".to_string();
        }

        let count = self.samples.len();
        let sum: f64 = self.samples.iter().sum();
        let min = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self
            .samples
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        format!(
            "Temperature Analysis\n\
             Samples: {count}\n\
             Average: {:.2}°C\n\
             Minimum: {:.2}°C\n\
             Maximum: {:.2}°C\n\
             Status: {}\n",
            sum / count as f64,
            min,
            max,
            self.status(max)
        )
    }
}
