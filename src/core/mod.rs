//! Core fall detection.
//!
//! This module contains:
//! - The fixed-capacity magnitude window
//! - Threshold snapshots and the sensitivity mapping
//! - The streaming fall classifier and its thread-safe handle
//! - Offline trace analysis for threshold calibration

pub mod analysis;
pub mod buffer;
pub mod classifier;
pub mod sensitivity;
pub mod shared;

// Re-export commonly used types
pub use analysis::{analyze_trace, MagnitudeStats, SensitivityRun, TraceReport, DEFAULT_FACTORS};
pub use buffer::{MagnitudeBuffer, BUFFER_CAPACITY};
pub use classifier::{DetectorPhase, FallClassifier, FallEvent};
pub use sensitivity::{threshold_for_sensitivity, ClassifierConfig, BASE_THRESHOLD, GRAVITY};
pub use shared::SharedClassifier;
