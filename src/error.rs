//! Error types for pipeline subsystems

use std::fmt;

/// Result type alias for pipeline subsystem operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the pipeline's lifecycle-bearing subsystems
///
/// Per-record parse and sink problems are logged and recovered locally;
/// the variants here are the failures a caller can meaningfully react to.
#[derive(Debug)]
pub enum PipelineError {
    /// An actor request/reply did not complete within the 5-second deadline
    ActorTimeout(&'static str),

    /// The actor's mailbox is gone (actor has terminated)
    ActorStopped(&'static str),

    /// `produce` was called after the streaming queue was stopped
    QueueClosed,

    /// `start` was called while a consumer is already running
    QueueAlreadyRunning,

    /// A sink write or flush failed
    Sink(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ActorTimeout(op) => {
                write!(f, "actor request '{}' timed out after 5s", op)
            }
            PipelineError::ActorStopped(op) => {
                write!(f, "actor request '{}' failed: actor has stopped", op)
            }
            PipelineError::QueueClosed => write!(f, "streaming queue is closed"),
            PipelineError::QueueAlreadyRunning => {
                write!(f, "streaming queue consumer is already running")
            }
            PipelineError::Sink(err) => write!(f, "sink I/O failure: {}", err),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Sink(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Sink(err)
    }
}
