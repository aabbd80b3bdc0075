//! Replay of recorded accelerometer traces.
//!
//! Traces are either JSON Lines of [`AccelerationSample`] or CSV rows of
//! `timestamp_ms,x,y,z` with an optional header. Blank lines and lines
//! starting with `#` are ignored; malformed lines are skipped and counted.

use crate::collector::types::AccelerationSample;
use crate::collector::{CollectorError, SampleSource, CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How fast a trace is fed to the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayPacing {
    /// Push samples back to back
    AsFastAsPossible,
    /// Sleep for the recorded gap between samples, divided by `speed`
    Realtime { speed: f64 },
}

/// Result of parsing a trace.
#[derive(Debug, Clone, Default)]
pub struct ParsedTrace {
    pub samples: Vec<AccelerationSample>,
    /// Lines that could not be parsed
    pub skipped: usize,
}

/// Parse trace text in either supported format.
pub fn parse_trace(content: &str) -> ParsedTrace {
    let mut trace = ParsedTrace::default();
    let mut seen_data = false;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line, index + 1) {
            Ok(sample) => trace.samples.push(sample),
            // A non-numeric first row is a CSV header
            Err(_) if !seen_data && !line.starts_with('{') && looks_like_header(line) => {}
            Err(e) => {
                tracing::warn!("Skipping trace line: {e}");
                trace.skipped += 1;
            }
        }
        seen_data = true;
    }

    trace
}

/// Read and parse a trace file.
pub fn load_trace(path: &Path) -> Result<ParsedTrace, CollectorError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CollectorError::Io(format!("{}: {e}", path.display())))?;
    Ok(parse_trace(&content))
}

fn looks_like_header(line: &str) -> bool {
    line.split(',')
        .next()
        .map(|field| field.trim().parse::<f64>().is_err())
        .unwrap_or(false)
}

/// Parse one CSV or JSON sample line. `line_no` is only used in errors.
pub fn parse_line(line: &str, line_no: usize) -> Result<AccelerationSample, CollectorError> {
    let parse_err = |message: String| CollectorError::Parse {
        line: line_no,
        message,
    };

    if line.starts_with('{') {
        return serde_json::from_str(line).map_err(|e| parse_err(e.to_string()));
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(parse_err(format!("expected 4 fields, found {}", fields.len())));
    }

    let timestamp_millis = fields[0]
        .parse::<i64>()
        .map_err(|e| parse_err(format!("timestamp '{}': {e}", fields[0])))?;
    let mut axes = [0.0f64; 3];
    for (slot, field) in axes.iter_mut().zip(&fields[1..]) {
        *slot = field
            .parse::<f64>()
            .map_err(|e| parse_err(format!("axis '{field}': {e}")))?;
    }

    Ok(AccelerationSample::new(
        timestamp_millis,
        axes[0],
        axes[1],
        axes[2],
    ))
}

/// Collector that feeds a recorded trace from a background thread.
///
/// A trace is replayed once; the channel disconnects after the last sample.
pub struct ReplayCollector {
    samples: Option<Vec<AccelerationSample>>,
    pacing: ReplayPacing,
    sender: Option<Sender<AccelerationSample>>,
    receiver: Receiver<AccelerationSample>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReplayCollector {
    pub fn new(samples: Vec<AccelerationSample>, pacing: ReplayPacing) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            samples: Some(samples),
            pacing,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            thread_handle: None,
        }
    }

    /// Load a trace file and wrap it in a collector.
    pub fn from_path(path: &Path, pacing: ReplayPacing) -> Result<Self, CollectorError> {
        let trace = load_trace(path)?;
        if trace.skipped > 0 {
            tracing::warn!(
                "{} malformed line(s) skipped in {}",
                trace.skipped,
                path.display()
            );
        }
        Ok(Self::new(trace.samples, pacing))
    }

    /// Number of samples still waiting to be replayed (before start).
    pub fn pending(&self) -> usize {
        self.samples.as_ref().map(Vec::len).unwrap_or(0)
    }
}

impl SampleSource for ReplayCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        let (samples, sender) = match (self.samples.take(), self.sender.take()) {
            (Some(samples), Some(sender)) => (samples, sender),
            _ => return Err(CollectorError::Exhausted),
        };

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let dropped = self.dropped.clone();
        let pacing = self.pacing;

        let handle = thread::spawn(move || {
            let delivered = run_replay(&samples, pacing, &sender, &running);
            let remaining = (samples.len() - delivered) as u64;
            if remaining > 0 {
                dropped.fetch_add(remaining, Ordering::Relaxed);
            }
            tracing::debug!("replay finished: {delivered} of {} samples", samples.len());
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
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

impl Drop for ReplayCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Slice used for sleeping and for blocked sends, so stop stays responsive.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Feed samples until done or stopped. Returns how many were delivered.
fn run_replay(
    samples: &[AccelerationSample],
    pacing: ReplayPacing,
    sender: &Sender<AccelerationSample>,
    running: &AtomicBool,
) -> usize {
    let mut previous: Option<i64> = None;

    for (delivered, sample) in samples.iter().enumerate() {
        if let (ReplayPacing::Realtime { speed }, Some(prev)) = (pacing, previous) {
            let gap_ms = sample.timestamp_millis.saturating_sub(prev).max(0) as f64;
            let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
            let gap = Duration::try_from_secs_f64(gap_ms / speed / 1000.0).unwrap_or(Duration::MAX);
            if !sleep_while_running(gap, running) {
                return delivered;
            }
        }
        previous = Some(sample.timestamp_millis);

        let mut pending = *sample;
        loop {
            if !running.load(Ordering::SeqCst) {
                return delivered;
            }
            match sender.send_timeout(pending, POLL_SLICE) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(s)) => pending = s,
                Err(SendTimeoutError::Disconnected(_)) => return delivered,
            }
        }
    }

    samples.len()
}

fn sleep_while_running(total: Duration, running: &AtomicBool) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(POLL_SLICE);
        thread::sleep(step);
        remaining -= step;
    }
    running.load(Ordering::SeqCst)
}
