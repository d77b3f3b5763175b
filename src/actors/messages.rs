//! Message types for actor communication
//!
//! Commands are sent to a specific actor over its mpsc mailbox; request/
//! response commands carry a oneshot reply channel. Records are immutable
//! after parse, so messages move them by value and no state is ever shared
//! across the mailbox boundary.

use tokio::sync::oneshot;

use crate::{SensorRecord, SensorType};

/// Commands accepted by the [`DataStoreActor`](super::store::DataStoreActor)
#[derive(Debug)]
pub enum StoreCommand {
    /// Store a record in the per-sensor history
    Ingest(SensorRecord),

    /// Aggregate statistics across sensors that reported the given type
    Analyze {
        kind: SensorType,
        respond_to: oneshot::Sender<StatsResult>,
    },

    /// Processed-record counter and active sensor count
    Status {
        respond_to: oneshot::Sender<StoreStatus>,
    },

    /// Gracefully shut down after draining queued messages
    Shutdown,
}

/// Aggregate answer to a `StoreCommand::Analyze` request
///
/// `count` is the number of distinct sensors that match, not records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsResult {
    pub count: usize,
    pub temperature: f64,
    pub humidity: f64,
    pub battery_level: f64,
}

/// Answer to a `StoreCommand::Status` request
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStatus {
    pub processed: u64,
    pub active_sensors: usize,
}

/// Commands accepted by the [`AlertActor`](super::alert::AlertActor)
#[derive(Debug)]
pub enum AlertCommand {
    /// Evaluate a record against the per-type thresholds
    Ingest(SensorRecord),

    /// The newline-joined alert log
    Status {
        respond_to: oneshot::Sender<String>,
    },

    /// Gracefully shut down after draining queued messages
    Shutdown,
}

/// Alerting thresholds for one sensor type
///
/// Battery is a percentage of `battery_max` here; the battery *analyzer*
/// uses a charge ratio instead. The two subsystems own their units.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub temp_high: f64,
    pub temp_low: f64,
    pub humidity_high: f64,
    pub humidity_low: f64,
    pub battery_low: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_high: 30.0,
            temp_low: 10.0,
            humidity_high: 80.0,
            humidity_low: 20.0,
            battery_low: 30.0,
        }
    }
}
