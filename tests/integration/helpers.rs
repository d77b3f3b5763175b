//! Helper functions for integration tests

use vedetta::config::Config;
use vedetta::pipeline::Pipeline;

/// Configuration with the console sink muted so test output stays readable.
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.sinks.console = false;
    config
}

pub fn build_pipeline() -> Pipeline {
    Pipeline::from_config(&quiet_config()).expect("pipeline construction cannot fail without file sinks")
}

/// Standard-format line for a temperature sensor.
///
/// `temperature` is the raw centi-degree form, e.g. `2450` for 24.5°C.
pub fn temp_line(serial: &str, temperature: u32, battery: u32) -> String {
    format!("serial:{serial}temp:{temperature}type:tempbat:{battery}batmax:100state:OK")
}

/// Standard-format line for a humidity sensor.
pub fn humidity_line(serial: &str, humidity: u32) -> String {
    format!("serial:{serial}hum:{humidity}type:humidity")
}
