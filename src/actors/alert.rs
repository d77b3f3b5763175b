//! AlertActor - evaluates records against thresholds and keeps the alert log
//!
//! Alerts fire at most once per dimension per record, in a fixed order:
//! high temperature, low temperature, high humidity, low humidity, low
//! battery. Each alert line is prefixed with a local-time `HH:MM:SS`
//! timestamp and appended to an ordered log that `Status` returns joined
//! by newlines.

use std::collections::HashMap;

use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, instrument, trace};

use crate::{PipelineError, PipelineResult, SensorRecord, SensorType};

use super::messages::{AlertCommand, Thresholds};
use super::{MAILBOX_CAPACITY, REQUEST_TIMEOUT};

/// Actor state: per-type thresholds plus the ordered alert log
pub struct AlertActor {
    thresholds: HashMap<SensorType, Thresholds>,
    alerts: Vec<String>,
    command_rx: mpsc::Receiver<AlertCommand>,
}

impl AlertActor {
    fn new(
        thresholds: HashMap<SensorType, Thresholds>,
        command_rx: mpsc::Receiver<AlertCommand>,
    ) -> Self {
        Self {
            thresholds,
            alerts: Vec::new(),
            command_rx,
        }
    }

    /// Run the actor's main loop until `Shutdown` or the channel closes.
    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting alert actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                AlertCommand::Ingest(record) => self.evaluate(&record),

                AlertCommand::Status { respond_to } => {
                    let _ = respond_to.send(self.alerts.join("\n"));
                }

                AlertCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        debug!(alerts = self.alerts.len(), "alert actor stopped");
    }

    fn push_alert(&mut self, body: String) {
        let stamped = format!("[{}] {body}", Local::now().format("%H:%M:%S"));
        trace!(alert = %stamped, "alert raised");
        self.alerts.push(stamped);
    }

    fn evaluate(&mut self, record: &SensorRecord) {
        let thresholds = self
            .thresholds
            .get(&record.kind)
            .copied()
            .unwrap_or_default();

        if record.has_temperature() {
            if record.temperature > thresholds.temp_high {
                self.push_alert(format!(
                    "HIGH TEMP ALERT: Sensor {} reported {}°C (threshold: {}°C)",
                    record.serial, record.temperature, thresholds.temp_high
                ));
            } else if record.temperature < thresholds.temp_low {
                self.push_alert(format!(
                    "LOW TEMP ALERT: Sensor {} reported {}°C (threshold: {}°C)",
                    record.serial, record.temperature, thresholds.temp_low
                ));
            }
        }

        if record.has_humidity() {
            if record.humidity > thresholds.humidity_high {
                self.push_alert(format!(
                    "HIGH HUMIDITY ALERT: Sensor {} reported {}% (threshold: {}%)",
                    record.serial, record.humidity, thresholds.humidity_high
                ));
            } else if record.humidity < thresholds.humidity_low {
                self.push_alert(format!(
                    "LOW HUMIDITY ALERT: Sensor {} reported {}% (threshold: {}%)",
                    record.serial, record.humidity, thresholds.humidity_low
                ));
            }
        }

        if let Some(percent) = record.battery_percent() {
            if percent < thresholds.battery_low {
                self.push_alert(format!(
                    "LOW BATTERY ALERT: Sensor {} battery at {percent:.1}% (threshold: {}%)",
                    record.serial, thresholds.battery_low
                ));
            }
        }
    }
}

/// Handle for the AlertActor
#[derive(Clone)]
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    /// Spawn the actor with the given per-type thresholds.
    ///
    /// Types missing from the map fall back to [`Thresholds::default`].
    pub fn spawn(thresholds: HashMap<SensorType, Thresholds>) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(MAILBOX_CAPACITY);

        let actor = AlertActor::new(thresholds, cmd_rx);
        let join = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, join)
    }

    /// Enqueue a record; suspends only while the mailbox is full.
    pub async fn ingest(&self, record: SensorRecord) -> PipelineResult<()> {
        self.sender
            .send(AlertCommand::Ingest(record))
            .await
            .map_err(|_| PipelineError::ActorStopped("ingest"))
    }

    /// The alert log, joined by newlines.
    pub async fn alerts(&self) -> PipelineResult<String> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AlertCommand::Status { respond_to: tx })
            .await
            .map_err(|_| PipelineError::ActorStopped("alerts"))?;

        match timeout(REQUEST_TIMEOUT, rx).await {
            Err(_) => Err(PipelineError::ActorTimeout("alerts")),
            Ok(Err(_)) => Err(PipelineError::ActorStopped("alerts")),
            Ok(Ok(log)) => Ok(log),
        }
    }

    /// Request shutdown; queued messages are drained first.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
    }
}
