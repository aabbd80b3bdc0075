//! Background alert dispatcher.
//!
//! The detection loop hands fall events to [`AlertDispatcher::dispatch`],
//! which only queues them. A worker thread resolves contact and location,
//! composes the message and sends it once. Outcomes are published on a
//! channel for the host to show; nothing flows back into the classifier.

use crate::alert::location::LocationCache;
use crate::alert::message::{
    compose_alert_message, normalize_phone_number, split_message, OutgoingAlert,
    DEFAULT_COUNTRY_PREFIX, SMS_PART_CHARS,
};
use crate::alert::status::DeliveryStatus;
use crate::alert::transport::AlertTransport;
use crate::alert::{AlertError, EmergencyContact};
use crate::core::FallEvent;
use crate::monitor::SharedDetectionLog;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Settings the worker reads for every alert. Replaceable at runtime.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub contact: Option<EmergencyContact>,
    pub country_prefix: String,
    pub timezone: Tz,
    /// Label identifying this device in alerts
    pub device: String,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            contact: None,
            country_prefix: DEFAULT_COUNTRY_PREFIX.to_string(),
            timezone: Tz::UTC,
            device: device_label(),
        }
    }
}

/// Hostname of this machine, or "unknown".
pub fn device_label() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Result of handling one fall event.
#[derive(Debug, Clone)]
pub struct AlertOutcome {
    pub event: FallEvent,
    pub alert_id: Option<Uuid>,
    pub result: Result<DeliveryStatus, AlertError>,
}

impl AlertOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, Ok(status) if status.is_success())
    }

    /// Notification text for the rider.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(DeliveryStatus::Sent) => "FALL DETECTED! Alert sent to contact.".to_string(),
            Ok(status) => format!("FALL DETECTED but alert failed: {}", status.message()),
            Err(AlertError::NoContact) => {
                "FALL DETECTED but no emergency contact is configured!".to_string()
            }
            Err(e) => format!("FALL DETECTED but alert could not be sent: {e}"),
        }
    }
}

struct DispatchJob {
    event: FallEvent,
    detected_at: DateTime<Utc>,
}

/// Queues fall events and sends alerts from a worker thread.
pub struct AlertDispatcher {
    sender: Option<Sender<DispatchJob>>,
    outcomes: Receiver<AlertOutcome>,
    settings: Arc<RwLock<DispatcherSettings>>,
    worker: Option<JoinHandle<()>>,
}

impl AlertDispatcher {
    /// Spawn the worker.
    pub fn spawn(
        transport: Box<dyn AlertTransport>,
        settings: DispatcherSettings,
        location: LocationCache,
        log: SharedDetectionLog,
    ) -> Self {
        let (sender, jobs) = unbounded::<DispatchJob>();
        let (outcome_tx, outcomes) = unbounded::<AlertOutcome>();
        let settings = Arc::new(RwLock::new(settings));
        let worker_settings = settings.clone();

        let worker = thread::spawn(move || {
            tracing::debug!("alert dispatcher started (transport: {})", transport.name());
            for job in jobs.iter() {
                let current = worker_settings
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                let outcome = deliver(transport.as_ref(), &current, &location, &job);

                if outcome.is_success() {
                    log.record_alert_sent();
                    tracing::info!(
                        alert_id = ?outcome.alert_id,
                        "alert delivered for fall at {}ms",
                        outcome.event.timestamp_millis
                    );
                } else {
                    log.record_alert_failed();
                    tracing::warn!("{}", outcome.message());
                }

                // The host may have stopped listening; outcomes are informational.
                let _ = outcome_tx.send(outcome);
            }
            tracing::debug!("alert dispatcher stopped");
        });

        Self {
            sender: Some(sender),
            outcomes,
            settings,
            worker: Some(worker),
        }
    }

    /// Queue an event for alerting. Never blocks.
    pub fn dispatch(&self, event: FallEvent) -> Result<(), AlertError> {
        let sender = self.sender.as_ref().ok_or(AlertError::Closed)?;
        sender
            .send(DispatchJob {
                event,
                detected_at: Utc::now(),
            })
            .map_err(|_| AlertError::Closed)
    }

    /// Outcomes of processed events, in order.
    pub fn outcomes(&self) -> &Receiver<AlertOutcome> {
        &self.outcomes
    }

    /// Replace the settings used for subsequent alerts.
    pub fn update_settings(&self, settings: DispatcherSettings) {
        let mut guard = self.settings.write().unwrap_or_else(|e| e.into_inner());
        *guard = settings;
    }

    pub fn settings(&self) -> DispatcherSettings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Stop accepting events and wait for queued alerts to be sent.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("alert dispatcher worker panicked");
            }
        }
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Turn one job into an alert and send it.
fn deliver(
    transport: &dyn AlertTransport,
    settings: &DispatcherSettings,
    location: &LocationCache,
    job: &DispatchJob,
) -> AlertOutcome {
    let failed = |error: AlertError| AlertOutcome {
        event: job.event,
        alert_id: None,
        result: Err(error),
    };

    let contact = match &settings.contact {
        Some(contact) => contact,
        None => return failed(AlertError::NoContact),
    };

    let number = match normalize_phone_number(&contact.number, &settings.country_prefix) {
        Ok(number) => number,
        Err(e) => return failed(e),
    };

    let point = location.resolve();
    let body = compose_alert_message(point, job.detected_at, settings.timezone);
    let alert = OutgoingAlert {
        id: Uuid::new_v4(),
        created_at: job.detected_at,
        contact_name: contact.name.clone(),
        number,
        location: point,
        event: job.event,
        device: settings.device.clone(),
        parts: split_message(&body, SMS_PART_CHARS),
        body,
    };

    AlertOutcome {
        event: job.event,
        alert_id: Some(alert.id),
        result: transport.send(&alert),
    }
}
