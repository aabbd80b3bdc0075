//! Detection session counters.
//!
//! Tracks how much the detector has processed and what it raised, so the
//! rider can see the app is working. Persistence keeps cumulative counters
//! across sessions; no sensor data or location is ever written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current detection session.
#[derive(Debug)]
pub struct DetectionLog {
    /// Samples passed to the classifier
    samples_observed: AtomicU64,
    /// Samples lost before reaching the classifier
    samples_dropped: AtomicU64,
    /// Fall events raised by the classifier
    falls_detected: AtomicU64,
    /// Alerts accepted by the transport
    alerts_sent: AtomicU64,
    /// Alerts that could not be sent
    alerts_failed: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self {
            samples_observed: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
            falls_detected: AtomicU64::new(0),
            alerts_sent: AtomicU64::new(0),
            alerts_failed: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads and saves cumulative counters at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous detection stats: {e}");
        }

        log
    }

    pub fn record_sample(&self) {
        self.samples_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.samples_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_fall(&self) {
        self.falls_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_sent(&self) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_failed(&self) {
        self.alerts_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> DetectionStats {
        DetectionStats {
            samples_observed: self.samples_observed.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            falls_detected: self.falls_detected.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            alerts_failed: self.alerts_failed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Summary for display at the end of a session.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Samples observed: {}\n\
             - Samples dropped: {}\n\
             - Falls detected: {}\n\
             - Alerts sent: {}\n\
             - Alerts failed: {}\n\
             - Session duration: {} seconds",
            stats.samples_observed,
            stats.samples_dropped,
            stats.falls_detected,
            stats.alerts_sent,
            stats.alerts_failed,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_observed: stats.samples_observed,
                samples_dropped: stats.samples_dropped,
                falls_detected: stats.falls_detected,
                alerts_sent: stats.alerts_sent,
                alerts_failed: stats.alerts_failed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_observed
                    .store(persisted.samples_observed, Ordering::Relaxed);
                self.samples_dropped
                    .store(persisted.samples_dropped, Ordering::Relaxed);
                self.falls_detected
                    .store(persisted.falls_detected, Ordering::Relaxed);
                self.alerts_sent
                    .store(persisted.alerts_sent, Ordering::Relaxed);
                self.alerts_failed
                    .store(persisted.alerts_failed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.samples_observed.store(0, Ordering::Relaxed);
        self.samples_dropped.store(0, Ordering::Relaxed);
        self.falls_detected.store(0, Ordering::Relaxed);
        self.alerts_sent.store(0, Ordering::Relaxed);
        self.alerts_failed.store(0, Ordering::Relaxed);
    }
}

impl Default for DetectionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of detection counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionStats {
    pub samples_observed: u64,
    pub samples_dropped: u64,
    pub falls_detected: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_observed: u64,
    samples_dropped: u64,
    falls_detected: u64,
    alerts_sent: u64,
    alerts_failed: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared detection log.
pub type SharedDetectionLog = Arc<DetectionLog>;

pub fn create_shared_log() -> SharedDetectionLog {
    Arc::new(DetectionLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedDetectionLog {
    Arc::new(DetectionLog::with_persistence(path))
}
