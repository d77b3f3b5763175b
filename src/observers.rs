//! Observer fan-out for parsed records
//!
//! Subscribers implement [`Observer`] and are attached by `Arc`; identity
//! (pointer equality) gives set-like de-dup without requiring observers to
//! be comparable. `notify` clones a snapshot of the list before invoking
//! anyone, so attach/detach from other threads never race a broadcast in
//! progress and no lock is held across user callbacks. A failing observer
//! is logged and the loop moves on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::warn;

use crate::{SensorRecord, SensorType};

/// Record subscriber
///
/// Notifications may arrive from any pipeline caller thread; implementations
/// must not assume thread affinity.
pub trait Observer: Send + Sync {
    fn name(&self) -> &str;

    fn notify(&self, record: &SensorRecord) -> anyhow::Result<()>;
}

/// Attach-ordered broadcaster over an observer list
#[derive(Default)]
pub struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer; re-attaching the same `Arc` is a no-op.
    pub fn attach(&self, observer: Arc<dyn Observer>) {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return;
        }

        observers.push(observer);
    }

    pub fn detach(&self, observer: &Arc<dyn Observer>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a record to every observer in attach order.
    ///
    /// Observer failures are logged and do not stop delivery to the rest.
    pub fn notify(&self, record: &SensorRecord) {
        let snapshot: Vec<Arc<dyn Observer>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for observer in snapshot {
            if let Err(error) = observer.notify(record) {
                warn!(observer = observer.name(), %error, "observer failed");
            }
        }
    }
}

/// Logs temperature excursions on `temp` records
pub struct TemperatureWatch {
    warning_threshold: f64,
    critical_threshold: f64,
}

impl TemperatureWatch {
    pub fn new(warning_threshold: f64, critical_threshold: f64) -> Self {
        Self {
            warning_threshold,
            critical_threshold,
        }
    }
}

impl Observer for TemperatureWatch {
    fn name(&self) -> &str {
        "temperature-watch"
    }

    fn notify(&self, record: &SensorRecord) -> anyhow::Result<()> {
        if record.kind != SensorType::Temp || !record.has_temperature() {
            return Ok(());
        }

        if record.temperature > self.critical_threshold {
            warn!(
                serial = %record.serial,
                temperature = record.temperature,
                "critical temperature"
            );
        } else if record.temperature > self.warning_threshold {
            warn!(
                serial = %record.serial,
                temperature = record.temperature,
                "elevated temperature"
            );
        }

        Ok(())
    }
}

/// Logs low battery charge on any record carrying battery data
pub struct BatteryWatch {
    low_threshold: f64,
}

impl BatteryWatch {
    /// `low_threshold` is a charge ratio, e.g. `0.2`.
    pub fn new(low_threshold: f64) -> Self {
        Self { low_threshold }
    }
}

impl Observer for BatteryWatch {
    fn name(&self) -> &str {
        "battery-watch"
    }

    fn notify(&self, record: &SensorRecord) -> anyhow::Result<()> {
        let Some(percent) = record.battery_percent() else {
            return Ok(());
        };

        if percent < self.low_threshold * 100.0 {
            warn!(serial = %record.serial, charge = percent, "battery running low");
        }

        Ok(())
    }
}

/// Counts observed records per sensor type
#[derive(Default)]
pub struct StatsCollector {
    counts: Mutex<HashMap<SensorType, usize>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn count_for(&self, kind: SensorType) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }
}

impl Observer for StatsCollector {
    fn name(&self) -> &str {
        "stats-collector"
    }

    fn notify(&self, record: &SensorRecord) -> anyhow::Result<()> {
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(record.kind)
            .or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingObserver;

    impl Observer for FailingObserver {
        fn name(&self) -> &str {
            "failing"
        }

        fn notify(&self, _record: &SensorRecord) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    fn record(kind: SensorType) -> SensorRecord {
        SensorRecord {
            serial: "1".to_string(),
            kind,
            ..Default::default()
        }
    }

    #[test]
    fn attach_is_set_like_by_identity() {
        let set = ObserverSet::new();
        let collector: Arc<dyn Observer> = Arc::new(StatsCollector::new());

        set.attach(Arc::clone(&collector));
        set.attach(Arc::clone(&collector));
        assert_eq!(set.len(), 1);

        set.detach(&collector);
        assert!(set.is_empty());
    }

    #[test]
    fn failing_observer_does_not_break_the_loop() {
        let set = ObserverSet::new();
        let collector = Arc::new(StatsCollector::new());

        set.attach(Arc::new(FailingObserver));
        set.attach(Arc::clone(&collector) as Arc<dyn Observer>);

        set.notify(&record(SensorType::Temp));
        set.notify(&record(SensorType::Humidity));

        assert_eq!(collector.total(), 2);
        assert_eq!(collector.count_for(SensorType::Temp), 1);
    }

    #[test]
    fn notify_with_no_observers_is_a_noop() {
        let set = ObserverSet::new();
        set.notify(&record(SensorType::Temp));
    }
}
