//! Line parsers for raw sensor input
//!
//! A raw line is a concatenation of `key:value` tokens with no separators,
//! e.g. `serial:111temp:2450type:tempbat:80batmax:100state:OK`. Format
//! selection is by exclusive prefix: `serial:` lines are Standard format,
//! `manufac:`/`manu:` lines are ManufacturerFirst format. Both formats share
//! the same key/value scanner; they differ only in which prefix they accept.
//!
//! Parsing is pure: no shared state, no I/O. Values that fail numeric
//! coercion become `0` (absent) rather than an error, so a malformed field
//! never poisons the rest of the record.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{SensorRecord, SensorType};

/// Known keys, longest first so that e.g. `batmax:` is never read as `bat`
/// followed by garbage. Keys are matched case-insensitively and must be
/// immediately followed by `:`.
const KEYS: &[&str] = &[
    "serialnumber",
    "batterylevel",
    "manufacturer",
    "batlevel",
    "manufac",
    "serial",
    "batmax",
    "batmin",
    "error",
    "state",
    "manu",
    "temp",
    "type",
    "hum",
    "bat",
    "v2",
    "v3",
    "v",
];

/// Map a raw key alias onto the canonical record field it populates.
fn canonical_field(key: &str) -> &'static str {
    match key {
        "serial" | "serialnumber" => "serial",
        "temp" => "temperature",
        "hum" => "humidity",
        "bat" | "batlevel" | "batterylevel" => "battery_level",
        "batmax" => "battery_max",
        "batmin" => "battery_min",
        "state" => "state",
        "manu" | "manufac" | "manufacturer" => "manufacturer",
        "type" => "type",
        "error" => "error",
        "v" | "v2" | "v3" => "voltage",
        _ => "",
    }
}

/// Check whether a known key (followed by `:`) starts at `pos`.
fn key_at(raw: &str, pos: usize) -> Option<&'static str> {
    let rest = &raw.as_bytes()[pos..];
    for key in KEYS {
        let len = key.len();
        if rest.len() > len
            && rest[len] == b':'
            && rest[..len].eq_ignore_ascii_case(key.as_bytes())
        {
            return Some(key);
        }
    }
    None
}

/// Split a raw line into `(key, value)` pairs.
///
/// A value extends from its key's `:` up to the start of the next known key
/// or the end of the line. Text before the first key is ignored. Values are
/// whitespace-trimmed but otherwise verbatim.
pub fn scan_fields(raw: &str) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    let mut current: Option<(&'static str, usize)> = None;

    let mut pos = 0;
    while pos < raw.len() {
        if let Some(key) = key_at(raw, pos) {
            if let Some((prev, value_start)) = current.take() {
                fields.push((prev, raw[value_start..pos].trim().to_string()));
            }
            pos += key.len() + 1;
            current = Some((key, pos));
        } else {
            pos += 1;
        }
    }

    if let Some((key, value_start)) = current {
        fields.push((key, raw[value_start..].trim().to_string()));
    }

    fields
}

fn parse_number(value: &str) -> f64 {
    value.trim().parse().unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply the canonical normalization rules in place.
///
/// - temperatures above 100 arrive in centi-degrees and are scaled down
/// - humidity above 100 arrives in tenths of a percent
/// - `state` is ASCII lower-cased
/// - an empty serial with a known manufacturer gets a synthetic
///   `Unknown-<8 hex>` identity so the record stays addressable downstream
pub fn normalize(record: &mut SensorRecord) {
    if record.temperature > 100.0 {
        record.temperature = round2(record.temperature / 100.0);
    }

    if record.humidity > 100.0 {
        record.humidity = round2(record.humidity / 10.0);
    }

    record.state = record.state.to_ascii_lowercase();

    if record.serial.is_empty() && !record.manufacturer.is_empty() {
        let id = Uuid::new_v4().simple().to_string();
        record.serial = format!("Unknown-{}", &id[..8]);
    }
}

/// Scan a line into a fresh record and normalize it.
///
/// First occurrence wins when multiple keys target the same field (including
/// aliases, e.g. `manu:` followed by `manufacturer:`).
fn build_record(raw: &str) -> SensorRecord {
    let mut record = SensorRecord::default();
    let mut populated: HashSet<&'static str> = HashSet::new();

    for (key, value) in scan_fields(raw) {
        let field = canonical_field(key);
        if field.is_empty() || !populated.insert(field) {
            continue;
        }

        match field {
            "serial" => record.serial = value,
            "type" => record.kind = SensorType::parse(&value),
            "temperature" => record.temperature = parse_number(&value),
            "humidity" => record.humidity = parse_number(&value),
            "battery_level" => record.battery_level = parse_number(&value),
            "battery_max" => record.battery_max = parse_number(&value),
            "battery_min" => record.battery_min = parse_number(&value),
            "state" => record.state = value,
            "manufacturer" => record.manufacturer = value,
            "error" => record.error = value,
            "voltage" => record.voltage = parse_number(&value),
            _ => {}
        }
    }

    normalize(&mut record);
    record
}

fn has_prefix(raw: &str, prefix: &str) -> bool {
    let trimmed = raw.trim_start().as_bytes();
    trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Contract every input format implements
pub trait LineParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap prefix test; `parse` is only called when this returns true.
    fn can_parse(&self, raw: &str) -> bool;

    fn parse(&self, raw: &str) -> SensorRecord;
}

/// Lines that lead with the sensor serial
pub struct StandardParser;

impl LineParser for StandardParser {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn can_parse(&self, raw: &str) -> bool {
        has_prefix(raw, "serial:")
    }

    fn parse(&self, raw: &str) -> SensorRecord {
        build_record(raw)
    }
}

/// Lines that lead with the manufacturer tag
pub struct ManufacturerFirstParser;

impl LineParser for ManufacturerFirstParser {
    fn name(&self) -> &'static str {
        "manufacturer-first"
    }

    fn can_parse(&self, raw: &str) -> bool {
        has_prefix(raw, "manufac:") || has_prefix(raw, "manu:")
    }

    fn parse(&self, raw: &str) -> SensorRecord {
        build_record(raw)
    }
}

/// Ordered set of parsers; the first whose `can_parse` accepts a line wins.
pub struct ParserSet {
    parsers: Vec<Box<dyn LineParser>>,
}

impl ParserSet {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// The two built-in formats, in registration order.
    pub fn with_default_parsers() -> Self {
        let mut set = Self::new();
        set.register(Box::new(StandardParser));
        set.register(Box::new(ManufacturerFirstParser));
        set
    }

    pub fn register(&mut self, parser: Box<dyn LineParser>) {
        self.parsers.push(parser);
    }

    /// First parser accepting the line, or `None` when the line is unparseable.
    pub fn select(&self, raw: &str) -> Option<&dyn LineParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(raw))
            .map(|p| p.as_ref())
    }
}

impl Default for ParserSet {
    fn default() -> Self {
        Self::with_default_parsers()
    }
}
