//! Session statistics for the detection loop.
//!
//! Only counters are kept and persisted, never samples or locations.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, DetectionLog, DetectionStats,
    SharedDetectionLog,
};
