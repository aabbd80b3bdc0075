//! Detection loop.
//!
//! Owns a sample source and feeds every sample to the classifier, handing
//! fall events to the alert dispatcher. A running host can be controlled
//! from another process through the config file: `paused`, `sensitivity`
//! and the contact settings are re-read about once a second.

use crate::alert::{AlertDispatcher, AlertOutcome, LocationCache};
use crate::collector::{AccelerationSample, CollectorError, SampleSource};
use crate::config::Config;
use crate::core::{FallEvent, SharedClassifier};
use crate::monitor::SharedDetectionLog;
use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// How long one loop iteration waits for a sample.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// How often the control file is re-read.
pub const CONTROL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Callback for alert outcomes, e.g. to notify the rider.
pub type OutcomeNotifier = Box<dyn FnMut(&AlertOutcome) + Send>;

/// Result of a single loop step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// A sample was processed, possibly raising an event
    Sample(Option<FallEvent>),
    /// No sample arrived within the timeout
    Idle,
    /// The source will not deliver any more samples
    Finished,
}

/// What a detection run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub samples: u64,
    pub events: Vec<FallEvent>,
    pub outcomes: Vec<AlertOutcome>,
}

struct ControlFile {
    path: PathBuf,
    interval: Duration,
    last_check: Instant,
    snapshot: Config,
}

/// Runs the detection pipeline for one session.
pub struct DetectionHost {
    source: Box<dyn SampleSource>,
    classifier: SharedClassifier,
    dispatcher: AlertDispatcher,
    location: LocationCache,
    log: SharedDetectionLog,
    control: Option<ControlFile>,
    notifier: Option<OutcomeNotifier>,
    paused: bool,
    reported_dropped: u64,
    summary: RunSummary,
}

impl DetectionHost {
    pub fn new(
        source: Box<dyn SampleSource>,
        classifier: SharedClassifier,
        dispatcher: AlertDispatcher,
        location: LocationCache,
        log: SharedDetectionLog,
    ) -> Self {
        Self {
            source,
            classifier,
            dispatcher,
            location,
            log,
            control: None,
            notifier: None,
            paused: false,
            reported_dropped: 0,
            summary: RunSummary::default(),
        }
    }

    /// Follow `path` for pause/resume and retuning, starting from `initial`.
    pub fn with_control_file(mut self, path: PathBuf, initial: Config, interval: Duration) -> Self {
        self.paused = initial.paused;
        self.control = Some(ControlFile {
            path,
            interval,
            last_check: Instant::now(),
            snapshot: initial,
        });
        self
    }

    pub fn with_notifier(mut self, notifier: OutcomeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn classifier(&self) -> &SharedClassifier {
        &self.classifier
    }

    pub fn location(&self) -> &LocationCache {
        &self.location
    }

    /// Start the source unless the session begins paused.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.paused {
            tracing::info!("Detection is paused; waiting for resume");
            return Ok(());
        }
        self.source.start()
    }

    /// Stop the source and discard the classifier window. Queued samples are
    /// thrown away and counted as dropped.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.source.stop();
        let discarded = self.source.receiver().try_iter().count() as u64;
        if discarded > 0 {
            self.log.record_dropped(discarded);
        }
        self.classifier.reset();
        tracing::info!("Detection paused");
    }

    pub fn resume(&mut self) -> Result<(), CollectorError> {
        if !self.paused {
            return Ok(());
        }
        self.paused = false;
        tracing::info!("Detection resumed");
        self.source.start()
    }

    /// Process at most one sample, waiting up to `timeout` for it.
    pub fn step(&mut self, timeout: Duration) -> Step {
        let step = match self.source.receiver().recv_timeout(timeout) {
            Ok(sample) => Step::Sample(self.handle_sample(&sample)),
            Err(RecvTimeoutError::Timeout) => Step::Idle,
            Err(RecvTimeoutError::Disconnected) => Step::Finished,
        };
        self.sync_dropped();
        self.drain_outcomes();
        step
    }

    /// Run until `running` is cleared or the source is exhausted.
    pub fn run_until(&mut self, running: &AtomicBool) -> Result<(), CollectorError> {
        while running.load(Ordering::SeqCst) {
            self.poll_control()?;

            if self.paused {
                thread::sleep(RECV_TIMEOUT);
                self.drain_outcomes();
                continue;
            }

            if self.step(RECV_TIMEOUT) == Step::Finished {
                tracing::info!("Sample source finished");
                break;
            }
        }
        Ok(())
    }

    /// Stop the source, wait for queued alerts and save counters.
    pub fn finish(mut self) -> RunSummary {
        self.source.stop();
        self.sync_dropped();
        self.dispatcher.shutdown();
        self.drain_outcomes();

        if let Err(e) = self.log.save() {
            tracing::warn!("Could not save detection stats: {e}");
        }

        std::mem::take(&mut self.summary)
    }

    fn handle_sample(&mut self, sample: &AccelerationSample) -> Option<FallEvent> {
        self.log.record_sample();
        self.summary.samples += 1;

        let event = self.classifier.observe(sample)?;
        self.log.record_fall();
        self.summary.events.push(event);
        tracing::warn!(
            timestamp_ms = event.timestamp_millis,
            peak = event.peak_magnitude,
            "Fall detected"
        );

        if let Err(e) = self.dispatcher.dispatch(event) {
            tracing::error!("Could not queue alert: {e}");
        }
        Some(event)
    }

    fn sync_dropped(&mut self) {
        let dropped = self.source.dropped();
        if dropped > self.reported_dropped {
            self.log.record_dropped(dropped - self.reported_dropped);
            self.reported_dropped = dropped;
        }
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.dispatcher.outcomes().try_recv() {
            if let Some(notify) = self.notifier.as_mut() {
                notify(&outcome);
            }
            self.summary.outcomes.push(outcome);
        }
    }

    fn poll_control(&mut self) -> Result<(), CollectorError> {
        let latest = match self.control.as_mut() {
            Some(control) if control.last_check.elapsed() >= control.interval => {
                control.last_check = Instant::now();
                match Config::load_from(&control.path) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::debug!("Ignoring unreadable control file: {e}");
                        return Ok(());
                    }
                }
            }
            _ => return Ok(()),
        };

        let previous = match self.control.as_mut() {
            Some(control) => std::mem::replace(&mut control.snapshot, latest.clone()),
            None => return Ok(()),
        };

        if latest.sensitivity != previous.sensitivity {
            tracing::info!("Sensitivity changed to {}", latest.sensitivity);
            self.classifier.adjust_sensitivity(latest.sensitivity);
        }

        if latest.contact != previous.contact
            || latest.country_prefix != previous.country_prefix
            || latest.timezone != previous.timezone
        {
            self.dispatcher.update_settings(latest.dispatcher_settings());
        }

        if latest.last_location != previous.last_location {
            if let Some(point) = latest.last_location {
                self.location.update(point);
            }
        }

        if latest.paused != self.paused {
            if latest.paused {
                self.pause();
            } else {
                self.resume()?;
            }
        }
        Ok(())
    }
}
