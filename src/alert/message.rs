//! Alert message composition.

use crate::alert::location::GeoPoint;
use crate::alert::AlertError;
use crate::core::FallEvent;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix added to bare 9-digit mobile numbers starting with 9 (Peru).
pub const DEFAULT_COUNTRY_PREFIX: &str = "+51";

/// Shortest number accepted after cleanup.
const MIN_NUMBER_LEN: usize = 7;

/// Characters per SMS part.
pub const SMS_PART_CHARS: usize = 160;

/// A fully composed alert ready for a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingAlert {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub contact_name: String,
    /// Normalized destination number
    pub number: String,
    pub location: GeoPoint,
    pub event: FallEvent,
    /// Label of the device that detected the fall
    pub device: String,
    pub body: String,
    pub parts: Vec<String>,
}

/// Clean up a phone number for sending.
///
/// Everything except digits and `+` is removed. A bare 9-digit number
/// starting with 9 gets `country_prefix` prepended.
pub fn normalize_phone_number(raw: &str, country_prefix: &str) -> Result<String, AlertError> {
    if raw.trim().is_empty() {
        return Err(AlertError::NoContact);
    }

    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let number = if !clean.starts_with('+') && clean.len() == 9 && clean.starts_with('9') {
        format!("{country_prefix}{clean}")
    } else {
        clean
    };

    if number.len() < MIN_NUMBER_LEN {
        return Err(AlertError::InvalidNumber(number));
    }
    Ok(number)
}

/// Compose the emergency text for a fall at `location`.
pub fn compose_alert_message(location: GeoPoint, at: DateTime<Utc>, tz: Tz) -> String {
    let local_time = at.with_timezone(&tz).format("%d/%m/%Y %H:%M:%S");
    let maps_url = format!(
        "https://maps.google.com/maps?q={},{}",
        location.latitude, location.longitude
    );
    let location_note = if location.is_unknown() {
        " (location unavailable)"
    } else {
        ""
    };

    format!(
        "EMERGENCY ALERT - CYCLIST\n\
         \n\
         FALL DETECTED\n\
         \n\
         LOCATION{location_note}:\n\
         Lat: {}\n\
         Lon: {}\n\
         \n\
         Map: {maps_url}\n\
         \n\
         Time: {local_time}\n\
         \n\
         Automatic alert sent by {}",
        location.latitude,
        location.longitude,
        crate::APP_NAME
    )
}

/// Split a body into SMS-sized parts on character boundaries.
pub fn split_message(body: &str, part_chars: usize) -> Vec<String> {
    let part_chars = part_chars.max(1);
    let chars: Vec<char> = body.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(part_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
