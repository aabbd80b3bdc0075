//! Push-style sample source.
//!
//! The platform sensor callback holds a [`SamplePusher`] and hands every
//! reading to it. Pushing never blocks the callback: when the detector falls
//! behind or the collector is stopped, the sample is dropped and counted.
//!
//! Once the collector is closed and every pusher has been dropped, the
//! receiver disconnects and the detection loop sees the end of input.

use crate::collector::types::AccelerationSample;
use crate::collector::{CollectorError, SampleSource, CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Handle given to the platform sensor callback.
#[derive(Debug, Clone)]
pub struct SamplePusher {
    sender: Option<Sender<AccelerationSample>>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl SamplePusher {
    /// Queue a sample. Returns false if it was dropped.
    pub fn push(&self, sample: AccelerationSample) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let sent = match self.sender {
            Some(ref sender) => match sender.try_send(sample) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
            },
            None => false,
        };
        if !sent {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    /// Queue a sample, waiting for room when the queue is full.
    ///
    /// For readers that can be slowed down, such as a pipe. A stopped
    /// collector still drops the sample.
    pub fn push_blocking(&self, sample: AccelerationSample) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let sent = match self.sender {
            Some(ref sender) => sender.send(sample).is_ok(),
            None => false,
        };
        if !sent {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }
}

/// A collector fed by an external callback.
pub struct PushCollector {
    /// `None` once closed
    sender: Option<Sender<AccelerationSample>>,
    receiver: Receiver<AccelerationSample>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl PushCollector {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle for the sensor callback.
    ///
    /// A pusher taken after [`close`](Self::close) drops everything it is given.
    pub fn pusher(&self) -> SamplePusher {
        SamplePusher {
            sender: self.sender.clone(),
            running: self.running.clone(),
            dropped: self.dropped.clone(),
        }
    }

    /// Release the collector's own sender.
    ///
    /// Samples already queued stay readable. The receiver disconnects once
    /// every pusher handed out before closing has been dropped.
    pub fn close(&mut self) {
        if self.sender.take().is_some() {
            tracing::debug!("push collector closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Try to receive a sample without blocking.
    pub fn try_recv(&self) -> Option<AccelerationSample> {
        self.receiver.try_recv().ok()
    }
}

impl Default for PushCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for PushCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        tracing::debug!("push collector started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::debug!("push collector stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<AccelerationSample> {
        &self.receiver
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_while_running() {
        let mut collector = PushCollector::new();
        let pusher = collector.pusher();
        collector.start().unwrap();

        assert!(pusher.push(AccelerationSample::new(1, 0.0, 0.0, 9.81)));
        assert_eq!(collector.try_recv().map(|s| s.timestamp_millis), Some(1));
    }

    #[test]
    fn test_push_before_start_is_dropped() {
        let collector = PushCollector::new();
        let pusher = collector.pusher();

        assert!(!pusher.push(AccelerationSample::new(1, 0.0, 0.0, 9.81)));
        assert_eq!(collector.dropped(), 1);
        assert!(collector.try_recv().is_none());
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let mut collector = PushCollector::with_capacity(2);
        let pusher = collector.pusher();
        collector.start().unwrap();

        for i in 0..5 {
            pusher.push(AccelerationSample::new(i, 0.0, 0.0, 9.81));
        }
        assert_eq!(collector.dropped(), 3);
        assert_eq!(collector.receiver().len(), 2);
    }

    #[test]
    fn test_close_disconnects_after_last_pusher() {
        let mut collector = PushCollector::new();
        let pusher = collector.pusher();
        collector.start().unwrap();
        collector.close();
        assert!(collector.is_closed());

        assert!(pusher.push(AccelerationSample::new(1, 0.0, 0.0, 9.81)));
        drop(pusher);

        let receiver = collector.receiver();
        assert_eq!(receiver.recv().map(|s| s.timestamp_millis), Ok(1));
        assert!(receiver.recv().is_err());
    }

    #[test]
    fn test_pusher_after_close_drops() {
        let mut collector = PushCollector::new();
        collector.start().unwrap();
        collector.close();
        collector.close();

        let late = collector.pusher();
        assert!(!late.push(AccelerationSample::new(1, 0.0, 0.0, 9.81)));
        assert_eq!(collector.dropped(), 1);
        assert!(collector.receiver().recv().is_err());
    }

    #[test]
    fn test_push_blocking_waits_for_room() {
        let mut collector = PushCollector::with_capacity(1);
        let pusher = collector.pusher();
        collector.start().unwrap();
        collector.close();

        let writer = std::thread::spawn(move || {
            (0..3)
                .map(|i| pusher.push_blocking(AccelerationSample::new(i, 0.0, 0.0, 9.81)))
                .all(|sent| sent)
        });

        let received: Vec<i64> = collector
            .receiver()
            .iter()
            .map(|s| s.timestamp_millis)
            .collect();
        assert!(writer.join().unwrap());
        assert_eq!(received, vec![0, 1, 2]);
        assert_eq!(collector.dropped(), 0);
    }

    #[test]
    fn test_double_start() {
        let mut collector = PushCollector::new();
        collector.start().unwrap();
        assert!(matches!(collector.start(), Err(CollectorError::AlreadyRunning)));

        collector.stop();
        collector.stop();
        assert!(!collector.is_running());
        assert!(collector.start().is_ok());
    }
}
