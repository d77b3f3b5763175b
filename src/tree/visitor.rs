//! Read-only traversals over the sensor tree

use std::collections::HashSet;

use super::{AggregatedStats, GroupNode, LeafNode};

/// Stateful tree traversal producing a textual report
///
/// `reset` is always invoked before a traversal starts, so a visitor value
/// can be reused across runs. A leaf linked into several groups is presented
/// once per membership; visitors that count leaves de-duplicate by serial.
pub trait Visitor {
    fn reset(&mut self);
    fn visit_group(&mut self, group: &GroupNode, stats: &AggregatedStats);
    fn visit_leaf(&mut self, leaf: &LeafNode, stats: &AggregatedStats);
    fn result(&self) -> String;
}

/// Classifies sensors by battery charge
///
/// Bands: below 30% critical, below 50% warning, otherwise healthy.
/// Leaves without data points are skipped.
#[derive(Debug, Default)]
pub struct HealthVisitor {
    seen: HashSet<String>,
    healthy: usize,
    warning: Vec<String>,
    critical: Vec<String>,
    no_data: usize,
}

impl HealthVisitor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Visitor for HealthVisitor {
    fn reset(&mut self) {
        self.seen.clear();
        self.healthy = 0;
        self.warning.clear();
        self.critical.clear();
        self.no_data = 0;
    }

    fn visit_group(&mut self, _group: &GroupNode, _stats: &AggregatedStats) {}

    fn visit_leaf(&mut self, leaf: &LeafNode, stats: &AggregatedStats) {
        if !self.seen.insert(leaf.serial.clone()) {
            return;
        }

        if stats.data_point_count == 0 {
            self.no_data += 1;
        } else if stats.battery_level < 30.0 {
            self.critical.push(leaf.name.clone());
        } else if stats.battery_level < 50.0 {
            self.warning.push(leaf.name.clone());
        } else {
            self.healthy += 1;
        }
    }

    fn result(&self) -> String {
        let mut report = String::from("=== Sensor Health Report ===\n");
        report.push_str(&format!(
            "Healthy: {} | Warning: {} | Critical: {} | No data: {}\n",
            self.healthy,
            self.warning.len(),
            self.critical.len(),
            self.no_data
        ));

        if !self.warning.is_empty() {
            report.push_str(&format!("Warning sensors: {}\n", self.warning.join(", ")));
        }

        if !self.critical.is_empty() {
            report.push_str(&format!("Critical sensors: {}\n", self.critical.join(", ")));
        }

        report
    }
}

/// Reports readings outside configured temperature and humidity bands
///
/// Groups are ignored; only leaf histories are inspected.
#[derive(Debug)]
pub struct AnomalyVisitor {
    temp_low: f64,
    temp_high: f64,
    humidity_low: f64,
    humidity_high: f64,
    seen: HashSet<String>,
    findings: Vec<String>,
}

impl AnomalyVisitor {
    pub fn new() -> Self {
        Self::with_thresholds(15.0, 30.0, 30.0, 70.0)
    }

    pub fn with_thresholds(
        temp_low: f64,
        temp_high: f64,
        humidity_low: f64,
        humidity_high: f64,
    ) -> Self {
        Self {
            temp_low,
            temp_high,
            humidity_low,
            humidity_high,
            seen: HashSet::new(),
            findings: Vec::new(),
        }
    }
}

impl Default for AnomalyVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for AnomalyVisitor {
    fn reset(&mut self) {
        self.seen.clear();
        self.findings.clear();
    }

    fn visit_group(&mut self, _group: &GroupNode, _stats: &AggregatedStats) {}

    fn visit_leaf(&mut self, leaf: &LeafNode, stats: &AggregatedStats) {
        if stats.data_point_count == 0 || !self.seen.insert(leaf.serial.clone()) {
            return;
        }

        for record in &leaf.history {
            if record.has_temperature() {
                if record.temperature > self.temp_high {
                    self.findings.push(format!(
                        "{}: temperature {}°C above {}°C",
                        leaf.name, record.temperature, self.temp_high
                    ));
                } else if record.temperature < self.temp_low {
                    self.findings.push(format!(
                        "{}: temperature {}°C below {}°C",
                        leaf.name, record.temperature, self.temp_low
                    ));
                }
            }

            if record.has_humidity() {
                if record.humidity > self.humidity_high {
                    self.findings.push(format!(
                        "{}: humidity {}% above {}%",
                        leaf.name, record.humidity, self.humidity_high
                    ));
                } else if record.humidity < self.humidity_low {
                    self.findings.push(format!(
                        "{}: humidity {}% below {}%",
                        leaf.name, record.humidity, self.humidity_low
                    ));
                }
            }
        }
    }

    fn result(&self) -> String {
        let mut report = String::from("=== Anomaly Report ===\n");

        if self.findings.is_empty() {
            report.push_str("No anomalies detected.\n");
        } else {
            for finding in &self.findings {
                report.push_str(finding);
                report.push('\n');
            }
        }

        report
    }
}
