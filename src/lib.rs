//! Cyclist Fall Alert - fall detection for riders with an SMS alert to an
//! emergency contact.
//!
//! The detector watches a stream of accelerometer samples for a hard impact
//! followed by a short period of stillness. When both appear inside the
//! recent window, and enough time has passed since the previous event, a
//! fall is reported and an alert with the last known position is sent.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Cyclist Fall Alert                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Collector  │──▶│ Classifier  │──▶│ Dispatcher  │──▶ SMS │
//! │  │(push/replay)│   │ (10 sample  │   │  (worker    │        │
//! │  └─────────────┘   │  window)    │   │   thread)   │        │
//! │                    └─────────────┘   └─────────────┘        │
//! │                           │                 │                │
//! │                           ▼                 ▼                │
//! │                    ┌─────────────────────────────┐          │
//! │                    │       Detection Log         │          │
//! │                    └─────────────────────────────┘          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cyclist_fall_alert::{AccelerationSample, FallClassifier, GRAVITY};
//!
//! let mut classifier = FallClassifier::new();
//! let nets = [1.0, 1.0, 1.0, 1.0, 30.0, 1.0, 1.0, 1.0];
//! let events: Vec<_> = nets
//!     .iter()
//!     .enumerate()
//!     .filter_map(|(i, net)| {
//!         classifier.observe(&AccelerationSample::vertical(i as i64 * 20, *net, GRAVITY))
//!     })
//!     .collect();
//! assert_eq!(events.len(), 1);
//! ```

pub mod alert;
pub mod collector;
pub mod config;
pub mod core;
pub mod gateway;
pub mod host;
pub mod monitor;

// Re-export key types at crate root for convenience
pub use alert::{
    AlertDispatcher, AlertError, AlertOutcome, AlertTransport, DeliveryStatus, EmergencyContact,
    GeoPoint, LocationCache, LogTransport, OutboxTransport,
};
pub use collector::{
    AccelerationSample, CollectorError, PushCollector, ReplayCollector, ReplayPacing,
    SampleSource,
};
pub use config::{Config, ConfigError};
pub use core::{
    analyze_trace, threshold_for_sensitivity, ClassifierConfig, FallClassifier, FallEvent,
    SharedClassifier, TraceReport, GRAVITY,
};
pub use gateway::{GatewayConfig, GatewayError};
pub use host::{DetectionHost, RunSummary};
pub use monitor::{DetectionLog, DetectionStats, SharedDetectionLog};

// Gateway client re-exports (when enabled)
#[cfg(feature = "gateway")]
pub use gateway::{BlockingGatewayClient, GatewayClient, SmsGatewayTransport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name, used for directories and alert text.
pub const APP_NAME: &str = "cyclist-fall-alert";

/// Safety notice that can be displayed to users.
pub const SAFETY_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              CYCLIST FALL ALERT - SAFETY NOTICE                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool watches your accelerometer for a hard impact          ║
║  followed by stillness, and texts your emergency contact.        ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Sends one SMS per detected fall with your last position     ║
║    • Waits 5 seconds between alerts                              ║
║    • Keeps only counters on disk, never sensor readings          ║
║                                                                  ║
║  ✗ WHAT IT DOES NOT DO:                                          ║
║    • Call emergency services                                     ║
║    • Retry an alert that failed to send                          ║
║    • Guarantee detection: it can miss falls or raise false ones  ║
║                                                                  ║
║  It is not a medical device. Keep your contact up to date with:  ║
║    fall-alert set-contact --name NAME --number NUMBER            ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_notice_contents() {
        assert!(SAFETY_NOTICE.contains("SAFETY NOTICE"));
        assert!(SAFETY_NOTICE.contains("not a medical device"));
        assert!(SAFETY_NOTICE.contains("set-contact"));
    }
}
