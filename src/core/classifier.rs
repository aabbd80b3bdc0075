//! Streaming fall classifier.
//!
//! Each sample is reduced to its net magnitude and pushed into a sliding
//! window. A fall is reported when the window holds an impact peak, the
//! newest readings show the rider lying still, and the refractory period
//! since the previous event has elapsed.
//!
//! The peak and the stillness do not have to line up: by the time three low
//! readings have arrived the impact may sit anywhere in the window.
//!
//! Non-finite input never panics. A NaN magnitude neither counts as a peak
//! nor as a low reading; +∞ counts as a peak and never as low.

use crate::collector::types::AccelerationSample;
use crate::core::buffer::MagnitudeBuffer;
use crate::core::sensitivity::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A detected fall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallEvent {
    /// Timestamp of the sample that completed the stillness window
    pub timestamp_millis: i64,
    /// Largest finite net magnitude in the window when the event fired
    pub peak_magnitude: f64,
}

/// Coarse detector phase, for status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorPhase {
    /// Watching for an impact followed by stillness
    Armed,
    /// Within the refractory period of the last event
    Cooldown,
}

/// Fall classifier state for one detection session.
#[derive(Debug, Clone)]
pub struct FallClassifier {
    config: Arc<ClassifierConfig>,
    buffer: MagnitudeBuffer,
    last_event_millis: Option<i64>,
}

impl FallClassifier {
    /// Create a classifier with the default thresholds.
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self {
            buffer: MagnitudeBuffer::with_capacity(config.buffer_capacity),
            config: Arc::new(config),
            last_event_millis: None,
        }
    }

    /// Process one sample; returns an event if a fall is detected at it.
    ///
    /// Runs in constant time with no I/O. Samples are expected in
    /// non-decreasing timestamp order; a sample older than the last event is
    /// never eligible to fire.
    pub fn observe(&mut self, sample: &AccelerationSample) -> Option<FallEvent> {
        let config = &*self.config;

        self.buffer.push(sample.net_magnitude(config.gravity));

        if self.buffer.len() < config.min_samples_to_evaluate {
            return None;
        }

        let has_high_peak = self.buffer.any_above(config.fall_threshold);
        let has_low_period = self
            .buffer
            .tail_all_below(config.stillness_window, config.low_threshold);
        let interval_ok = self.cooldown_elapsed(sample.timestamp_millis);

        if !(has_high_peak && has_low_period && interval_ok) {
            return None;
        }

        let event = FallEvent {
            timestamp_millis: sample.timestamp_millis,
            peak_magnitude: self.buffer.peak().unwrap_or(config.fall_threshold),
        };
        self.last_event_millis = Some(sample.timestamp_millis);
        self.buffer.clear();
        Some(event)
    }

    /// Replace the impact threshold with one derived from `factor`.
    ///
    /// The whole config snapshot is swapped; other thresholds are kept.
    pub fn adjust_sensitivity(&mut self, factor: f64) {
        self.config = Arc::new(self.config.with_sensitivity(factor));
    }

    /// Clear the window. The refractory timer and thresholds are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn config(&self) -> Arc<ClassifierConfig> {
        Arc::clone(&self.config)
    }

    /// Timestamp of the last event, `None` if none has fired yet.
    pub fn last_event_timestamp(&self) -> Option<i64> {
        self.last_event_millis
    }

    /// Number of magnitudes currently in the window.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn phase(&self, now_millis: i64) -> DetectorPhase {
        if self.cooldown_elapsed(now_millis) {
            DetectorPhase::Armed
        } else {
            DetectorPhase::Cooldown
        }
    }

    fn cooldown_elapsed(&self, now_millis: i64) -> bool {
        match self.last_event_millis {
            None => true,
            Some(last) => now_millis.saturating_sub(last) > self.config.min_interval_ms,
        }
    }
}

impl Default for FallClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sensitivity::GRAVITY;

    const STEP_MS: i64 = 20;

    fn sample(index: usize, net: f64) -> AccelerationSample {
        AccelerationSample::vertical(index as i64 * STEP_MS, net, GRAVITY)
    }

    /// Feed net magnitudes starting at `offset` and collect the indices that fired.
    fn feed(classifier: &mut FallClassifier, offset: usize, values: &[f64]) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| classifier.observe(&sample(offset + i, v)).map(|_| offset + i))
            .collect()
    }

    #[test]
    fn test_fewer_than_five_samples_never_fire() {
        let mut classifier = FallClassifier::new();
        // Peak followed by stillness, but only four samples
        let fired = feed(&mut classifier, 0, &[30.0, 1.0, 1.0, 1.0]);
        assert!(fired.is_empty());
        assert_eq!(classifier.buffered(), 4);
    }

    #[test]
    fn test_scenario_fires_on_eighth_sample() {
        let mut classifier = FallClassifier::new();
        let fired = feed(&mut classifier, 0, &[1.0, 1.0, 1.0, 1.0, 30.0, 1.0, 1.0, 1.0]);
        assert_eq!(fired, vec![7]);
        assert_eq!(classifier.last_event_timestamp(), Some(7 * STEP_MS));
    }

    #[test]
    fn test_spike_then_stillness_fires_once() {
        let mut classifier = FallClassifier::new();
        let values = [0.5, 0.5, 0.5, 0.5, 40.0, 0.3, 0.2, 0.1, 0.1, 0.1, 0.1];
        let mut events = Vec::new();
        for (i, &v) in values.iter().enumerate() {
            if let Some(event) = classifier.observe(&sample(i, v)) {
                events.push(event);
            }
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp_millis, 7 * STEP_MS);
        assert!((events[0].peak_magnitude - 40.0).abs() < 1e-6);
        assert_eq!(classifier.last_event_timestamp(), Some(7 * STEP_MS));
    }

    #[test]
    fn test_quiet_window_never_fires() {
        let mut classifier = FallClassifier::new();
        let fired = feed(&mut classifier, 0, &[0.5; 10]);
        assert!(fired.is_empty());
    }

    #[test]
    fn test_window_size_follows_config() {
        let values = [1.0, 30.0, 2.5, 2.5, 2.5, 2.5, 1.0, 1.0, 1.0];

        let mut default = FallClassifier::new();
        assert_eq!(feed(&mut default, 0, &values), vec![8]);

        // The impact leaves a five-slot window before stillness arrives
        let mut narrow = FallClassifier::with_config(ClassifierConfig {
            buffer_capacity: 5,
            ..ClassifierConfig::default()
        });
        assert!(feed(&mut narrow, 0, &values).is_empty());
        assert_eq!(narrow.buffered(), 5);
    }

    #[test]
    fn test_single_jolt_without_stillness_does_not_fire() {
        let mut classifier = FallClassifier::new();
        // Riding over a pothole: spike but the rider keeps moving
        let fired = feed(
            &mut classifier,
            0,
            &[3.0, 4.0, 3.5, 4.0, 30.0, 5.0, 3.0, 1.0, 4.0, 1.0, 3.0],
        );
        assert!(fired.is_empty());
    }

    #[test]
    fn test_buffer_empty_after_fire() {
        let mut classifier = FallClassifier::new();
        let fired = feed(&mut classifier, 0, &[1.0, 1.0, 30.0, 1.0, 1.0, 1.0]);
        assert_eq!(fired, vec![5]);
        assert_eq!(classifier.buffered(), 0);

        // One sample alone cannot reach the evaluation gate
        assert!(classifier.observe(&sample(6, 50.0)).is_none());
        assert_eq!(classifier.buffered(), 1);
    }

    #[test]
    fn test_cooldown_blocks_second_event() {
        let mut classifier = FallClassifier::new();
        let fall = [1.0, 1.0, 30.0, 1.0, 1.0, 1.0];

        assert_eq!(feed(&mut classifier, 0, &fall), vec![5]);
        // Same pattern 200 ms later: inside the 5 s refractory period
        assert!(feed(&mut classifier, 10, &fall).is_empty());
        assert_eq!(classifier.phase(20 * STEP_MS), DetectorPhase::Cooldown);

        // Quiet riding pushes the old impact out of the window
        assert!(feed(&mut classifier, 16, &[1.0; 10]).is_empty());

        // Pattern well after the cooldown fires again
        let later = (5_000 / STEP_MS) as usize + 10;
        assert_eq!(feed(&mut classifier, later, &fall), vec![later + 5]);
    }

    #[test]
    fn test_cooldown_boundary_is_exclusive() {
        let config = ClassifierConfig::default().with_min_interval_ms(100);
        let mut classifier = FallClassifier::with_config(config);
        let fall = [1.0, 1.0, 30.0, 1.0, 1.0, 1.0];

        assert_eq!(feed(&mut classifier, 0, &fall), vec![5]);
        // First event at 100 ms; the window below completes at 200 ms, exactly 100 ms later
        assert!(feed(&mut classifier, 5, &fall).is_empty());
        assert_eq!(classifier.last_event_timestamp(), Some(100));
    }

    #[test]
    fn test_events_never_closer_than_min_interval() {
        let mut classifier = FallClassifier::new();
        let pattern = [1.0, 30.0, 1.0, 1.0, 1.0];
        let mut timestamps = Vec::new();
        for round in 0..200 {
            for (i, &v) in pattern.iter().enumerate() {
                let idx = round * pattern.len() + i;
                if let Some(event) = classifier.observe(&sample(idx, v)) {
                    timestamps.push(event.timestamp_millis);
                }
            }
        }
        assert!(timestamps.len() > 1);
        for pair in timestamps.windows(2) {
            assert!(pair[1] - pair[0] > 5_000);
        }
    }

    #[test]
    fn test_out_of_order_timestamp_does_not_fire() {
        let mut classifier = FallClassifier::new();
        let fall = [1.0, 1.0, 30.0, 1.0, 1.0, 1.0];
        assert_eq!(feed(&mut classifier, 1_000, &fall), vec![1_005]);

        // Going back in time after an event is never eligible
        assert!(feed(&mut classifier, 0, &fall).is_empty());
    }

    #[test]
    fn test_extreme_timestamps_do_not_panic() {
        let mut classifier = FallClassifier::new();
        let fall = [1.0, 1.0, 30.0, 1.0, 1.0, 1.0];
        for (i, &v) in fall.iter().enumerate() {
            let ts = i64::MAX - 10 + i as i64;
            classifier.observe(&AccelerationSample::vertical(ts, v, GRAVITY));
        }
        for &v in &fall {
            classifier.observe(&AccelerationSample::vertical(i64::MIN, v, GRAVITY));
        }
        assert_eq!(classifier.last_event_timestamp(), Some(i64::MAX - 5));
    }

    #[test]
    fn test_nan_samples_degrade_to_no_event() {
        let mut classifier = FallClassifier::new();
        for i in 0..10 {
            let nan = AccelerationSample::new(i * STEP_MS, f64::NAN, 0.0, 0.0);
            assert!(classifier.observe(&nan).is_none());
        }

        // NaN inside the stillness window blocks the event
        let mut classifier = FallClassifier::new();
        feed(&mut classifier, 0, &[1.0, 1.0, 30.0, 1.0, 1.0]);
        let nan = AccelerationSample::new(5 * STEP_MS, f64::NAN, f64::NAN, f64::NAN);
        assert!(classifier.observe(&nan).is_none());
    }

    #[test]
    fn test_infinite_spike_counts_as_peak() {
        let mut classifier = FallClassifier::new();
        feed(&mut classifier, 0, &[1.0, 1.0]);
        let spike = AccelerationSample::new(2 * STEP_MS, f64::INFINITY, 0.0, 0.0);
        assert!(classifier.observe(&spike).is_none());
        assert_eq!(feed(&mut classifier, 3, &[1.0, 1.0, 1.0]), vec![5]);
    }

    #[test]
    fn test_adjust_sensitivity_changes_detection() {
        let mut classifier = FallClassifier::new();
        classifier.adjust_sensitivity(2.0);
        assert_eq!(classifier.config().fall_threshold, 35.0);
        assert!(feed(&mut classifier, 0, &[1.0, 1.0, 30.0, 1.0, 1.0, 1.0]).is_empty());

        classifier.adjust_sensitivity(0.3);
        assert_eq!(classifier.config().fall_threshold, 20.0);
        // The 30 still in the window now counts as an impact
        assert_eq!(feed(&mut classifier, 6, &[1.0, 1.0, 1.0]), vec![6]);
    }

    #[test]
    fn test_adjust_sensitivity_swaps_snapshot() {
        let mut classifier = FallClassifier::new();
        let before = classifier.config();
        classifier.adjust_sensitivity(1.0);
        let after = classifier.config();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.fall_threshold, 25.0);
        assert_eq!(*before, *after);
    }

    #[test]
    fn test_reset_keeps_cooldown_and_config() {
        let mut classifier = FallClassifier::new();
        classifier.adjust_sensitivity(0.3);
        assert_eq!(feed(&mut classifier, 0, &[1.0, 1.0, 30.0, 1.0, 1.0, 1.0]), vec![5]);
        feed(&mut classifier, 6, &[1.0, 1.0, 1.0]);

        classifier.reset();
        assert_eq!(classifier.buffered(), 0);
        assert_eq!(classifier.last_event_timestamp(), Some(5 * STEP_MS));
        assert_eq!(classifier.config().fall_threshold, 20.0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut classifier = FallClassifier::new();
        feed(&mut classifier, 0, &[1.0, 2.0, 3.0]);

        classifier.reset();
        let once = (classifier.buffered(), classifier.last_event_timestamp());
        classifier.reset();
        let twice = (classifier.buffered(), classifier.last_event_timestamp());

        assert_eq!(once, (0, None));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_phase_without_events_is_armed() {
        let classifier = FallClassifier::new();
        assert_eq!(classifier.phase(0), DetectorPhase::Armed);
        assert_eq!(classifier.phase(i64::MIN), DetectorPhase::Armed);
    }
}
