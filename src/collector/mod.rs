//! Sample sources for the fall detector.
//!
//! A source delivers [`AccelerationSample`]s over a bounded channel. The
//! platform sensor subscription is outside this crate; it plugs in through
//! [`PushCollector`]. [`ReplayCollector`] feeds recorded traces.

pub mod push;
pub mod replay;
pub mod types;

use crossbeam_channel::Receiver;

// Re-export commonly used types
pub use push::{PushCollector, SamplePusher};
pub use replay::{load_trace, parse_line, parse_trace, ParsedTrace, ReplayCollector, ReplayPacing};
pub use types::AccelerationSample;

/// Queue depth between a source and the detection loop.
pub const CHANNEL_CAPACITY: usize = 10_000;

/// A stream of accelerometer samples with start/stop lifecycle.
pub trait SampleSource: Send {
    /// Start delivering samples.
    fn start(&mut self) -> Result<(), CollectorError>;

    /// Stop delivering samples. Safe to call more than once.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Receiver the detection loop reads from.
    fn receiver(&self) -> &Receiver<AccelerationSample>;

    /// Samples discarded because the queue was full or the source stopped.
    fn dropped(&self) -> u64 {
        0
    }
}

/// Errors that can occur while collecting samples.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    /// A replay source already delivered its whole trace
    Exhausted,
    Io(String),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::Exhausted => write!(f, "Trace has already been replayed"),
            CollectorError::Io(e) => write!(f, "IO error: {e}"),
            CollectorError::Parse { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for CollectorError {}
