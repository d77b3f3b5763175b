//! Pipeline coordinator
//!
//! Single entry point for every raw line regardless of execution mode:
//! parse, index into the tree, register the type, feed the analyzers,
//! dispatch to the actors, emit to the sinks, notify the observers. The
//! three drivers (sequential, worker pool, streaming) only change how lines
//! reach `process_record`; the per-record work is identical and safe under
//! concurrent invocation because every component it touches is either
//! internally synchronized or message-passing.
//!
//! Failures are isolated per record: a line that cannot be parsed or a
//! subsystem that rejects a record is logged with the raw line and the
//! pipeline moves on to the next one.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, instrument, trace, warn};

use crate::actors::ActorSubsystem;
use crate::analyzers::AnalyzerManager;
use crate::config::{AnomalyBounds, Config};
use crate::observers::{BatteryWatch, Observer, ObserverSet, StatsCollector, TemperatureWatch};
use crate::parse::ParserSet;
use crate::pool::WorkerPool;
use crate::registry::TypeRegistry;
use crate::sinks::{ConsoleOutput, FileOutput, JsonFormatter, Sink, SinkSet, TextFormatter};
use crate::stream::StreamQueue;
use crate::tree::visitor::AnomalyVisitor;
use crate::tree::SensorTree;
use crate::{PipelineResult, SensorType};

pub struct Pipeline {
    parsers: ParserSet,
    registry: Arc<TypeRegistry>,
    tree: Arc<SensorTree>,
    analyzers: Arc<AnalyzerManager>,
    actors: ActorSubsystem,
    sinks: SinkSet,
    observers: ObserverSet,
    stats: Arc<StatsCollector>,
    anomaly: AnomalyBounds,
}

impl Pipeline {
    /// Wire up every subsystem from the configuration.
    ///
    /// Fails only when a configured file sink cannot be created.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let tree = match &config.manufacturers {
            Some(table) => SensorTree::with_manufacturer_table(
                table
                    .iter()
                    .filter_map(|(prefix, name)| {
                        prefix.chars().next().map(|c| (c, name.clone()))
                    })
                    .collect(),
            ),
            None => SensorTree::new(),
        };

        let analyzers = AnalyzerManager::with_default_analyzers(
            config.analyzers.temp_warning,
            config.analyzers.temp_critical,
            config.analyzers.humidity_low,
            config.analyzers.humidity_high,
            config.analyzers.battery_low_ratio,
        );

        let alert_thresholds = config.alerts.to_thresholds();
        let thresholds: HashMap<SensorType, _> = [
            SensorType::Temp,
            SensorType::Humidity,
            SensorType::Battery,
            SensorType::Unknown,
        ]
        .into_iter()
        .map(|kind| (kind, alert_thresholds))
        .collect();

        let mut sinks = SinkSet::new();
        if config.sinks.console {
            sinks.add(Sink::new(
                "console",
                Box::new(TextFormatter),
                Box::new(ConsoleOutput),
            ));
        }

        if let Some(path) = &config.sinks.text_log {
            let output = FileOutput::create(path)
                .with_context(|| format!("failed to create text log {}", path.display()))?;
            sinks.add(Sink::new("text-log", Box::new(TextFormatter), Box::new(output)));
        }

        if let Some(path) = &config.sinks.json_log {
            let output = FileOutput::create(path)
                .with_context(|| format!("failed to create json log {}", path.display()))?;
            sinks.add(Sink::new("json-log", Box::new(JsonFormatter), Box::new(output)));
        }

        let observers = ObserverSet::new();
        observers.attach(Arc::new(TemperatureWatch::new(
            config.observers.temp_warning,
            config.observers.temp_critical,
        )));
        observers.attach(Arc::new(BatteryWatch::new(
            config.observers.battery_low_ratio,
        )));

        let stats = Arc::new(StatsCollector::new());
        observers.attach(Arc::clone(&stats) as Arc<dyn Observer>);

        debug!("pipeline assembled");

        Ok(Self {
            parsers: ParserSet::with_default_parsers(),
            registry: Arc::new(TypeRegistry::new()),
            tree: Arc::new(tree),
            analyzers: Arc::new(analyzers),
            actors: ActorSubsystem::spawn(thresholds),
            sinks,
            observers,
            stats,
            anomaly: config.anomaly,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn tree(&self) -> &SensorTree {
        &self.tree
    }

    pub fn analyzers(&self) -> &AnalyzerManager {
        &self.analyzers
    }

    pub fn actors(&self) -> &ActorSubsystem {
        &self.actors
    }

    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Anomaly visitor configured with this pipeline's bounds.
    pub fn anomaly_visitor(&self) -> AnomalyVisitor {
        AnomalyVisitor::with_thresholds(
            self.anomaly.temp_low,
            self.anomaly.temp_high,
            self.anomaly.humidity_low,
            self.anomaly.humidity_high,
        )
    }

    /// Run one raw line through the whole fan-out.
    #[instrument(skip(self, raw))]
    pub async fn process_record(&self, raw: &str) {
        let Some(parser) = self.parsers.select(raw) else {
            warn!(line = raw, "no parser accepts line, dropping");
            return;
        };

        let record = parser.parse(raw);
        trace!(serial = %record.serial, kind = %record.kind, parser = parser.name(), "record parsed");

        self.tree.add_record(&record);

        if !record.serial.is_empty() && record.kind.is_known() {
            self.registry.register(&record.serial, record.kind);
        }

        self.analyzers.analyze(&record);

        if let Err(error) = self.actors.send(record.clone()).await {
            warn!(%error, line = raw, "actor dispatch failed, dropping record");
            return;
        }

        self.sinks.display(&record);
        self.observers.notify(&record);
    }

    /// Sequential driver: the caller's task processes each line in turn.
    pub async fn run_sequential(&self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            self.process_record(&line).await;
        }
    }

    /// Worker pool driver: up to `pool.parallelism()` lines in flight.
    ///
    /// Returns once the slowest record has been fully processed.
    pub async fn run_pool(self: Arc<Self>, lines: Vec<String>, pool: &WorkerPool) {
        let results = pool
            .process_batch(lines, |line| {
                let pipeline = Arc::clone(&self);
                async move {
                    pipeline.process_record(&line).await;
                }
            })
            .await;

        for result in results {
            if let Err(error) = result {
                warn!(%error, "pooled record task failed");
            }
        }
    }

    /// Streaming driver: producer enqueues every line, the queue's single
    /// consumer feeds `process_record` in enqueue order, then the queue is
    /// stopped and drained.
    pub async fn run_stream(
        self: Arc<Self>,
        lines: impl IntoIterator<Item = String>,
        queue: &StreamQueue,
    ) -> PipelineResult<()> {
        let pipeline = Arc::clone(&self);
        queue.start(move |raw| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                pipeline.process_record(&raw).await;
                Ok(())
            }
        })?;

        for line in lines {
            queue.produce(line).await?;
        }

        queue.stop().await;
        Ok(())
    }

    /// Ordered teardown of everything the pipeline owns: the actors are
    /// drained and joined, then the sinks are flushed. (The streaming queue
    /// is stopped by its driver; the worker pool has no persistent state.)
    pub async fn shutdown(&self) {
        self.actors.shutdown().await;
        self.sinks.flush_all();
        debug!("pipeline shut down");
    }
}
