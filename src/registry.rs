//! Process-wide serial → sensor type registry

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::SensorType;

/// Thread-safe map of sensor serials to their last reported type
///
/// All operations take the single internal mutex for the duration of one
/// map access; reads hand out copies, never references into the map.
/// Constructed once and shared via `Arc` by everything that needs lookups.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: Mutex<HashMap<String, SensorType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `serial → kind`, overwriting any previous type for the serial.
    pub fn register(&self, serial: &str, kind: SensorType) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = map.insert(serial.to_string(), kind) {
            if previous != kind {
                trace!(serial, old = %previous, new = %kind, "sensor type changed");
            }
        }
    }

    /// Look up a serial; unregistered serials are `Unknown`.
    pub fn get(&self, serial: &str) -> SensorType {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(serial)
            .copied()
            .unwrap_or(SensorType::Unknown)
    }

    /// Read-only copy of the whole mapping.
    pub fn snapshot(&self) -> HashMap<String, SensorType> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
