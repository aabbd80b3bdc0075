//! Thread-safe handle around a [`FallClassifier`].
//!
//! The sample thread calls `observe` while a control thread may retune or
//! reset. Every mutation goes through one mutex so they are serialized.

use crate::collector::types::AccelerationSample;
use crate::core::classifier::{DetectorPhase, FallClassifier, FallEvent};
use crate::core::sensitivity::ClassifierConfig;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable, lock-protected classifier.
#[derive(Debug, Clone, Default)]
pub struct SharedClassifier {
    inner: Arc<Mutex<FallClassifier>>,
}

impl SharedClassifier {
    pub fn new(classifier: FallClassifier) -> Self {
        Self {
            inner: Arc::new(Mutex::new(classifier)),
        }
    }

    pub fn observe(&self, sample: &AccelerationSample) -> Option<FallEvent> {
        self.lock().observe(sample)
    }

    pub fn adjust_sensitivity(&self, factor: f64) {
        self.lock().adjust_sensitivity(factor);
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn config(&self) -> Arc<ClassifierConfig> {
        self.lock().config()
    }

    pub fn last_event_timestamp(&self) -> Option<i64> {
        self.lock().last_event_timestamp()
    }

    pub fn buffered(&self) -> usize {
        self.lock().buffered()
    }

    pub fn phase(&self, now_millis: i64) -> DetectorPhase {
        self.lock().phase(now_millis)
    }

    // observe never panics while holding the lock, but a poisoned mutex must
    // not take the detection session down with it.
    fn lock(&self) -> MutexGuard<'_, FallClassifier> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
