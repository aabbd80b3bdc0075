//! SMS transports.
//!
//! The radio itself is platform plumbing. These transports cover local
//! development and recording: an append-only outbox file and a log-only
//! sink. The HTTP SMS gateway transport lives in [`crate::gateway`].

use crate::alert::message::OutgoingAlert;
use crate::alert::status::DeliveryStatus;
use crate::alert::AlertError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Something that can hand an alert to a carrier.
pub trait AlertTransport: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Send one alert. Called at most once per alert; never retried.
    fn send(&self, alert: &OutgoingAlert) -> Result<DeliveryStatus, AlertError>;
}

/// Appends each alert as a JSON line to a file.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    path: PathBuf,
}

impl OutboxTransport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read back every alert written so far.
    pub fn read_all(&self) -> Result<Vec<OutgoingAlert>, AlertError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AlertError::Transport(e.to_string()))?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(|e| AlertError::Transport(e.to_string())))
            .collect()
    }
}

impl AlertTransport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    fn send(&self, alert: &OutgoingAlert) -> Result<DeliveryStatus, AlertError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AlertError::Transport(e.to_string()))?;
        }

        let line =
            serde_json::to_string(alert).map_err(|e| AlertError::Transport(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AlertError::Transport(format!("{}: {e}", self.path.display())))?;
        writeln!(file, "{line}").map_err(|e| AlertError::Transport(e.to_string()))?;

        Ok(DeliveryStatus::Sent)
    }
}

/// Logs alerts without sending anything.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

impl AlertTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, alert: &OutgoingAlert) -> Result<DeliveryStatus, AlertError> {
        tracing::info!(
            alert_id = %alert.id,
            to = %alert.number,
            parts = alert.parts.len(),
            "alert (log only): {}",
            alert.body.replace('\n', " | ")
        );
        Ok(DeliveryStatus::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::location::GeoPoint;
    use crate::core::FallEvent;
    use chrono::Utc;
    use uuid::Uuid;

    fn alert() -> OutgoingAlert {
        OutgoingAlert {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            contact_name: "Ana".to_string(),
            number: "+51987654321".to_string(),
            location: GeoPoint::UNKNOWN,
            event: FallEvent {
                timestamp_millis: 1_000,
                peak_magnitude: 31.0,
            },
            device: "test".to_string(),
            body: "FALL DETECTED".to_string(),
            parts: vec!["FALL DETECTED".to_string()],
        }
    }

    #[test]
    fn test_outbox_appends() {
        let dir = std::env::temp_dir().join(format!("fall-alert-outbox-{}", Uuid::new_v4()));
        let transport = OutboxTransport::new(dir.join("outbox.jsonl"));

        assert!(transport.read_all().unwrap().is_empty());
        assert_eq!(transport.send(&alert()).unwrap(), DeliveryStatus::Sent);
        assert_eq!(transport.send(&alert()).unwrap(), DeliveryStatus::Sent);

        let sent = transport.read_all().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].number, "+51987654321");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_log_transport() {
        assert_eq!(LogTransport.send(&alert()).unwrap(), DeliveryStatus::Sent);
    }
}
