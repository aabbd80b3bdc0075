//! Delivery status reported by the SMS transport.

use serde::{Deserialize, Serialize};

/// Outcome of handing an alert to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    GenericFailure,
    NoService,
    NullPdu,
    RadioOff,
    Unknown(i32),
}

impl DeliveryStatus {
    /// Map a platform SMS result code.
    pub fn from_result_code(code: i32) -> Self {
        match code {
            -1 => DeliveryStatus::Sent,
            1 => DeliveryStatus::GenericFailure,
            2 => DeliveryStatus::RadioOff,
            3 => DeliveryStatus::NullPdu,
            4 => DeliveryStatus::NoService,
            other => DeliveryStatus::Unknown(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryStatus::Sent)
    }

    /// Notification text shown to the rider.
    pub fn message(&self) -> String {
        match self {
            DeliveryStatus::Sent => "Alert SMS sent.".to_string(),
            DeliveryStatus::GenericFailure => "Generic failure while sending SMS.".to_string(),
            DeliveryStatus::NoService => "No service, SMS not sent.".to_string(),
            DeliveryStatus::NullPdu => "Null PDU error while sending SMS.".to_string(),
            DeliveryStatus::RadioOff => "Radio is off, SMS not sent.".to_string(),
            DeliveryStatus::Unknown(code) => format!("Unknown error sending SMS. Code: {code}"),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}
