//! DataStoreActor - owns the per-sensor record history
//!
//! The actor is the only task that ever touches its storage map, so no lock
//! is needed: the mailbox serializes all access. Within the actor, messages
//! are processed strictly in arrival order, which makes per-sensor history
//! order equal to ingest order.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, instrument, trace};

use crate::{PipelineError, PipelineResult, SensorRecord, SensorType};

use super::messages::{StatsResult, StoreCommand, StoreStatus};
use super::{MAILBOX_CAPACITY, REQUEST_TIMEOUT};

/// Actor state: per-serial histories plus a processed counter
pub struct DataStoreActor {
    storage: HashMap<String, Vec<SensorRecord>>,
    processed: u64,
    command_rx: mpsc::Receiver<StoreCommand>,
}

impl DataStoreActor {
    fn new(command_rx: mpsc::Receiver<StoreCommand>) -> Self {
        Self {
            storage: HashMap::new(),
            processed: 0,
            command_rx,
        }
    }

    /// Run the actor's main loop until `Shutdown` or the channel closes.
    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting data store actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                StoreCommand::Ingest(record) => self.ingest(record),

                StoreCommand::Analyze { kind, respond_to } => {
                    let _ = respond_to.send(self.analyze(kind));
                }

                StoreCommand::Status { respond_to } => {
                    let _ = respond_to.send(StoreStatus {
                        processed: self.processed,
                        active_sensors: self.storage.len(),
                    });
                }

                StoreCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        debug!(
            processed = self.processed,
            sensors = self.storage.len(),
            "data store actor stopped"
        );
    }

    fn ingest(&mut self, record: SensorRecord) {
        if record.serial.is_empty() {
            trace!("dropping record without serial");
            return;
        }

        self.storage
            .entry(record.serial.clone())
            .or_default()
            .push(record);
        self.processed += 1;
    }

    /// Aggregate over every sensor whose history contains at least one
    /// record of `kind`. All records of a matching sensor contribute.
    fn analyze(&self, kind: SensorType) -> StatsResult {
        let matching: Vec<&Vec<SensorRecord>> = self
            .storage
            .values()
            .filter(|history| history.iter().any(|r| r.kind == kind))
            .collect();

        let records = matching.iter().flat_map(|history| history.iter());

        let mut temp_sum = 0.0;
        let mut temp_count = 0usize;
        let mut humidity_sum = 0.0;
        let mut humidity_count = 0usize;
        let mut battery_sum = 0.0;
        let mut battery_count = 0usize;

        for record in records {
            if record.has_temperature() {
                temp_sum += record.temperature;
                temp_count += 1;
            }

            if record.has_humidity() {
                humidity_sum += record.humidity;
                humidity_count += 1;
            }

            if let Some(percent) = record.battery_percent() {
                battery_sum += percent;
                battery_count += 1;
            }
        }

        let mean = |sum: f64, count: usize| if count == 0 { 0.0 } else { sum / count as f64 };

        StatsResult {
            count: matching.len(),
            temperature: mean(temp_sum, temp_count),
            humidity: mean(humidity_sum, humidity_count),
            battery_level: mean(battery_sum, battery_count),
        }
    }
}

/// Handle for the DataStoreActor
///
/// Cloneable; all request/reply operations carry the 5-second deadline.
#[derive(Clone)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn the actor and return its handle plus the task join handle.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(MAILBOX_CAPACITY);

        let actor = DataStoreActor::new(cmd_rx);
        let join = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, join)
    }

    /// Enqueue a record; suspends only while the mailbox is full.
    pub async fn ingest(&self, record: SensorRecord) -> PipelineResult<()> {
        self.sender
            .send(StoreCommand::Ingest(record))
            .await
            .map_err(|_| PipelineError::ActorStopped("ingest"))
    }

    pub async fn analyze(&self, kind: SensorType) -> PipelineResult<StatsResult> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Analyze {
                kind,
                respond_to: tx,
            })
            .await
            .map_err(|_| PipelineError::ActorStopped("analyze"))?;

        match timeout(REQUEST_TIMEOUT, rx).await {
            Err(_) => Err(PipelineError::ActorTimeout("analyze")),
            Ok(Err(_)) => Err(PipelineError::ActorStopped("analyze")),
            Ok(Ok(result)) => Ok(result),
        }
    }

    pub async fn status(&self) -> PipelineResult<StoreStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Status { respond_to: tx })
            .await
            .map_err(|_| PipelineError::ActorStopped("status"))?;

        match timeout(REQUEST_TIMEOUT, rx).await {
            Err(_) => Err(PipelineError::ActorTimeout("status")),
            Ok(Err(_)) => Err(PipelineError::ActorStopped("status")),
            Ok(Ok(status)) => Ok(status),
        }
    }

    /// Request shutdown; queued messages are drained first.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(StoreCommand::Shutdown).await;
    }
}
