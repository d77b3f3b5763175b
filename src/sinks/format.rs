//! Record formatters

use chrono::Local;

use crate::SensorRecord;

use super::Formatter;

fn header_line() -> String {
    format!(
        "Sensor Monitoring Log - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Human-readable single-line rendering
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn header(&self) -> String {
        header_line()
    }

    fn format(&self, record: &SensorRecord) -> String {
        let mut line = format!(
            "[{}] serial={} type={}",
            record.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            record.serial,
            record.kind
        );

        if record.has_temperature() {
            line.push_str(&format!(" temp={:.2}°C", record.temperature));
        }

        if record.has_humidity() {
            line.push_str(&format!(" hum={:.2}%", record.humidity));
        }

        if let Some(percent) = record.battery_percent() {
            line.push_str(&format!(" bat={percent:.1}%"));
        }

        if !record.state.is_empty() {
            line.push_str(&format!(" state={}", record.state));
        }

        if !record.manufacturer.is_empty() {
            line.push_str(&format!(" manufacturer={}", record.manufacturer));
        }

        if !record.error.is_empty() {
            line.push_str(&format!(" error={}", record.error));
        }

        line
    }
}

/// One JSON object per line
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn header(&self) -> String {
        header_line()
    }

    fn format(&self, record: &SensorRecord) -> String {
        serde_json::to_string(record)
            .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
    }
}
