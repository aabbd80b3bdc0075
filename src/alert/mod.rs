//! Emergency alerting for detected falls.
//!
//! This module contains:
//! - Location caching with the 0.0/0.0 sentinel
//! - Phone number normalization and alert message composition
//! - Pluggable SMS transports and delivery status mapping
//! - The background dispatcher that turns fall events into alerts

pub mod dispatcher;
pub mod location;
pub mod message;
pub mod status;
pub mod transport;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use dispatcher::{device_label, AlertDispatcher, AlertOutcome, DispatcherSettings};
pub use location::{GeoPoint, LocationCache, LocationFix, DEFAULT_MAP_CENTER};
pub use message::{compose_alert_message, normalize_phone_number, split_message, OutgoingAlert};
pub use status::DeliveryStatus;
pub use transport::{AlertTransport, LogTransport, OutboxTransport};

/// Person notified when a fall is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub number: String,
}

impl EmergencyContact {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }
}

/// Errors raised while preparing or sending an alert.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertError {
    /// No emergency contact configured
    NoContact,
    /// Number too short after cleanup
    InvalidNumber(String),
    /// Transport could not hand off the message
    Transport(String),
    /// Dispatcher already shut down
    Closed,
}

impl std::fmt::Display for AlertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertError::NoContact => write!(f, "No emergency contact configured"),
            AlertError::InvalidNumber(n) => write!(f, "Invalid phone number: {n}"),
            AlertError::Transport(e) => write!(f, "Error sending alert: {e}"),
            AlertError::Closed => write!(f, "Alert dispatcher is shut down"),
        }
    }
}

impl std::error::Error for AlertError {}
