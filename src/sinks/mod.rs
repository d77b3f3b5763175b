//! Pluggable record sinks
//!
//! A sink is a (formatter, output) pair: serialization and transport are
//! independent axes, so new formatters and new outputs compose without
//! touching each other. Write failures are logged and the sink keeps
//! accepting records; durability is best-effort. A `display` call that
//! returns has flushed its output.

pub mod format;
pub mod output;

use tracing::warn;

use crate::SensorRecord;

pub use format::{JsonFormatter, TextFormatter};
pub use output::{ConsoleOutput, FileOutput};

/// Serialization axis: a record (or the log header) to a line of text
pub trait Formatter: Send + Sync {
    fn header(&self) -> String;

    fn format(&self, record: &SensorRecord) -> String;
}

/// Transport axis: deliver one line somewhere
pub trait Output: Send + Sync {
    fn write_line(&self, line: &str) -> std::io::Result<()>;

    fn flush(&self) -> std::io::Result<()>;
}

/// One formatter wired to one output
pub struct Sink {
    name: String,
    formatter: Box<dyn Formatter>,
    output: Box<dyn Output>,
}

impl Sink {
    /// Pair a formatter with an output and emit the log header.
    pub fn new(name: &str, formatter: Box<dyn Formatter>, output: Box<dyn Output>) -> Self {
        let sink = Self {
            name: name.to_string(),
            formatter,
            output,
        };

        let header = sink.formatter.header();
        sink.write(&header);
        sink
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, line: &str) {
        let result = self
            .output
            .write_line(line)
            .and_then(|()| self.output.flush());

        if let Err(error) = result {
            warn!(sink = %self.name, %error, "sink write failed");
        }
    }

    pub fn display(&self, record: &SensorRecord) {
        self.write(&self.formatter.format(record));
    }

    pub fn flush(&self) {
        if let Err(error) = self.output.flush() {
            warn!(sink = %self.name, %error, "sink flush failed");
        }
    }
}

/// All configured sinks; every record goes to each of them
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Sink>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Sink) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn display(&self, record: &SensorRecord) {
        for sink in &self.sinks {
            sink.display(record);
        }
    }

    pub fn flush_all(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}
