//! Actor-based record processing
//!
//! Each actor runs as an independent tokio task draining a bounded mailbox.
//! State is private to the actor and never touched from outside, so no
//! mutex is involved; the mailbox serializes everything.
//!
//! ```text
//!                    ┌─────────────────┐
//!                    │   Coordinator   │
//!                    └────────┬────────┘
//!                             │ Send(record)
//!                ┌────────────┴────────────┐
//!                │                         │
//!        ┌───────▼────────┐       ┌────────▼───────┐
//!        │ DataStoreActor │       │   AlertActor   │
//!        │ (history+stats)│       │ (threshold log)│
//!        └────────────────┘       └────────────────┘
//! ```
//!
//! Request/reply operations carry a oneshot channel inside the command and
//! observe a hard 5-second deadline; on expiry the caller gets
//! [`PipelineError::ActorTimeout`](crate::PipelineError::ActorTimeout).

pub mod alert;
pub mod messages;
pub mod store;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{PipelineResult, SensorRecord, SensorType};

pub use alert::AlertHandle;
pub use messages::{StatsResult, StoreStatus, Thresholds};
pub use store::StoreHandle;

/// Mailbox depth per actor; `Send` suspends the caller while full.
pub(crate) const MAILBOX_CAPACITY: usize = 256;

/// Hard deadline for every request/reply operation.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Both processing actors plus their lifecycle
///
/// `send` fans a record to the data store and alert actors; the caller is
/// suspended no longer than the mailbox enqueue takes. `shutdown` drains
/// the mailboxes, signals termination and waits for both tasks.
pub struct ActorSubsystem {
    store: StoreHandle,
    alert: AlertHandle,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

impl ActorSubsystem {
    /// Spawn both actors with per-type alert thresholds.
    pub fn spawn(thresholds: HashMap<SensorType, Thresholds>) -> Self {
        let (store, store_join) = StoreHandle::spawn();
        let (alert, alert_join) = AlertHandle::spawn(thresholds);

        debug!("actor subsystem started");

        Self {
            store,
            alert,
            joins: Mutex::new(vec![store_join, alert_join]),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn alert(&self) -> &AlertHandle {
        &self.alert
    }

    /// Fan a record out to both actors.
    pub async fn send(&self, record: SensorRecord) -> PipelineResult<()> {
        self.store.ingest(record.clone()).await?;
        self.alert.ingest(record).await
    }

    /// Aggregate statistics for one sensor type from the data store.
    pub async fn analyze_type(&self, kind: SensorType) -> PipelineResult<StatsResult> {
        self.store.analyze(kind).await
    }

    /// Processed counter and active sensor count from the data store.
    pub async fn status(&self) -> PipelineResult<StoreStatus> {
        self.store.status().await
    }

    /// The alert log, newline-joined.
    pub async fn alerts(&self) -> PipelineResult<String> {
        self.alert.alerts().await
    }

    /// Drain both mailboxes, stop the actors and wait for them to exit.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
        self.alert.shutdown().await;

        let joins = {
            let mut guard = self.joins.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        for join in joins {
            if let Err(error) = join.await {
                warn!(%error, "actor task ended abnormally");
            }
        }

        debug!("actor subsystem stopped");
    }
}
