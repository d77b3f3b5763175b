//! Humidity range analyzer

use crate::SensorRecord;

use super::Analyzer;

/// Collects positive humidity readings and classifies the observed range.
pub struct HumidityAnalyzer {
    low_threshold: f64,
    high_threshold: f64,
    samples: Vec<f64>,
}

impl HumidityAnalyzer {
    /// Defaults: too dry below 30%, too humid above 70%.
    pub fn new(low_threshold: f64, high_threshold: f64) -> Self {
        Self {
            low_threshold,
            high_threshold,
            samples: Vec::new(),
        }
    }

    fn status(&self, min: f64, max: f64) -> &'static str {
        if min < self.low_threshold {
            "Too Dry"
        } else if max > self.high_threshold {
            "Too Humid"
        } else {
            "Normal"
        }
    }
}

impl Default for HumidityAnalyzer {
    fn default() -> Self {
        Self::new(30.0, 70.0)
    }
}

impl Analyzer for HumidityAnalyzer {
    fn label(&self) -> &'static str {
        "Humidity"
    }

    fn ingest(&mut self, record: &SensorRecord) {
        if record.has_humidity() {
            self.samples.push(record.humidity);
        }
    }

    fn report(&self) -> String {
        if self.samples.is_empty() {
            return "Humidity Analysis\nno humidity samples collected\n".to_string();
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
            "Humidity Analysis\n\
             Samples: {count}\n\
             Average: {:.2}%\n\
             Minimum: {:.2}%\n\
             Maximum: {:.2}%\n\
             Status: {}\n",
            sum / count as f64,
            min,
            max,
            self.status(min, max)
        )
    }
}
