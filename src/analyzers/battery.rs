//! Battery charge analyzer

use crate::SensorRecord;

use super::Analyzer;

/// Collects battery charge ratios (`level / max`) from any record carrying
/// battery data and lists the sensors below the low-charge threshold.
pub struct BatteryAnalyzer {
    low_threshold: f64,
    samples: Vec<(String, f64)>,
}

impl BatteryAnalyzer {
    /// Default threshold: ratio below 0.2 counts as low.
    pub fn new(low_threshold: f64) -> Self {
        Self {
            low_threshold,
            samples: Vec::new(),
        }
    }
}

impl Default for BatteryAnalyzer {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Analyzer for BatteryAnalyzer {
    fn label(&self) -> &'static str {
        "Battery"
    }

    fn ingest(&mut self, record: &SensorRecord) {
        if record.has_battery() {
            self.samples.push((
                record.serial.clone(),
                record.battery_level / record.battery_max,
            ));
        }
    }

    fn report(&self) -> String {
        if self.samples.is_empty() {
            return "Battery Analysis\nno battery samples collected\n".to_string();
        }

        let count = self.samples.len();
        let sum: f64 = self.samples.iter().map(|(_, ratio)| ratio).sum();

        let mut report = format!(
            "Battery Analysis\n\
             Samples: {count}\n\
             Average charge: {:.1}%\n",
            sum / count as f64 * 100.0
        );

        let low: Vec<String> = self
            .samples
            .iter()
            .filter(|(_, ratio)| *ratio < self.low_threshold)
            .map(|(serial, ratio)| format!("{serial} ({:.1}%)", ratio * 100.0))
            .collect();

        if low.is_empty() {
            report.push_str("All batteries above threshold\n");
        } else {
            report.push_str(&format!(
                "Low battery sensors (below {:.0}%): {}\n",
                self.low_threshold * 100.0,
                low.join(", ")
            ));
        }

        report
    }
}
