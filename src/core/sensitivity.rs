//! Classifier thresholds and the sensitivity-factor mapping.
//!
//! A [`ClassifierConfig`] is an immutable snapshot. Retuning builds a new
//! snapshot instead of editing fields in place.

use crate::core::buffer::BUFFER_CAPACITY;
use serde::{Deserialize, Serialize};

/// Impact threshold at the nominal sensitivity factor (1.0).
pub const BASE_THRESHOLD: f64 = 25.0;

/// Net magnitudes below this count as "lying still".
pub const LOW_THRESHOLD: f64 = 2.0;

/// Lowest impact threshold any sensitivity factor can produce.
pub const THRESHOLD_FLOOR: f64 = 10.0;

/// Minimum time between two fall events.
pub const MIN_INTERVAL_MS: i64 = 5_000;

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.81;

/// Samples required in the window before any evaluation.
pub const MIN_SAMPLES_TO_EVALUATE: usize = 5;

/// Consecutive low readings that make up a stillness period.
pub const STILLNESS_WINDOW: usize = 3;

/// Nominal sensitivity factor.
pub const NOMINAL_SENSITIVITY: f64 = 1.0;

/// Map a sensitivity factor to an impact threshold.
///
/// Factors below 0.5 and above 1.5 use fixed offsets from the base; factors
/// in between scale it. The result never drops below [`THRESHOLD_FLOOR`].
/// Non-finite factors are treated as [`NOMINAL_SENSITIVITY`].
pub fn threshold_for_sensitivity(factor: f64) -> f64 {
    let factor = if factor.is_finite() {
        factor
    } else {
        NOMINAL_SENSITIVITY
    };

    let threshold = if factor < 0.5 {
        BASE_THRESHOLD - 5.0
    } else if factor > 1.5 {
        BASE_THRESHOLD + 10.0
    } else {
        BASE_THRESHOLD * factor
    };

    clamp_to_floor(threshold)
}

fn clamp_to_floor(threshold: f64) -> f64 {
    if threshold < THRESHOLD_FLOOR {
        THRESHOLD_FLOOR
    } else {
        threshold
    }
}

/// Threshold snapshot read by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Net magnitude that counts as an impact
    pub fall_threshold: f64,
    /// Net magnitude below which the rider is considered still
    pub low_threshold: f64,
    /// Refractory period between events
    pub min_interval_ms: i64,
    pub gravity: f64,
    /// Window size; at most `BUFFER_CAPACITY`
    pub buffer_capacity: usize,
    pub min_samples_to_evaluate: usize,
    pub stillness_window: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fall_threshold: threshold_for_sensitivity(NOMINAL_SENSITIVITY),
            low_threshold: LOW_THRESHOLD,
            min_interval_ms: MIN_INTERVAL_MS,
            gravity: GRAVITY,
            buffer_capacity: BUFFER_CAPACITY,
            min_samples_to_evaluate: MIN_SAMPLES_TO_EVALUATE,
            stillness_window: STILLNESS_WINDOW,
        }
    }
}

impl ClassifierConfig {
    /// Default thresholds retuned for the given sensitivity factor.
    pub fn for_sensitivity(factor: f64) -> Self {
        Self::default().with_sensitivity(factor)
    }

    /// A new snapshot identical to this one except for the impact threshold.
    pub fn with_sensitivity(&self, factor: f64) -> Self {
        Self {
            fall_threshold: threshold_for_sensitivity(factor),
            ..self.clone()
        }
    }

    /// A new snapshot with a different refractory period.
    pub fn with_min_interval_ms(&self, min_interval_ms: i64) -> Self {
        Self {
            min_interval_ms: min_interval_ms.max(0),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_branch() {
        assert_eq!(threshold_for_sensitivity(0.3), 20.0);
        assert_eq!(threshold_for_sensitivity(0.1), 20.0);
        assert_eq!(threshold_for_sensitivity(-4.0), 20.0);
    }

    #[test]
    fn test_high_branch() {
        assert_eq!(threshold_for_sensitivity(2.0), 35.0);
        assert_eq!(threshold_for_sensitivity(3.0), 35.0);
    }

    #[test]
    fn test_scaled_branch() {
        assert_eq!(threshold_for_sensitivity(1.0), 25.0);
        assert_eq!(threshold_for_sensitivity(0.5), 12.5);
        assert_eq!(threshold_for_sensitivity(1.5), 37.5);
        assert_eq!(threshold_for_sensitivity(0.8), 25.0 * 0.8);
    }

    #[test]
    fn test_floor_only_applies_below_ten() {
        assert_eq!(clamp_to_floor(5.0), THRESHOLD_FLOOR);
        assert_eq!(clamp_to_floor(9.999), THRESHOLD_FLOOR);
        assert_eq!(clamp_to_floor(10.0), 10.0);
        assert_eq!(clamp_to_floor(12.5), 12.5);
    }

    #[test]
    fn test_non_finite_factor_is_nominal() {
        assert_eq!(threshold_for_sensitivity(f64::NAN), BASE_THRESHOLD);
        assert_eq!(threshold_for_sensitivity(f64::INFINITY), BASE_THRESHOLD);
        assert_eq!(threshold_for_sensitivity(f64::NEG_INFINITY), BASE_THRESHOLD);
    }

    #[test]
    fn test_default_config() {
        let config = ClassifierConfig::default();
        assert_eq!(config.fall_threshold, 25.0);
        assert_eq!(config.low_threshold, 2.0);
        assert_eq!(config.min_interval_ms, 5_000);
        assert_eq!(config.buffer_capacity, 10);
        assert_eq!(config.min_samples_to_evaluate, 5);
        assert_eq!(config.stillness_window, 3);
    }

    #[test]
    fn test_with_sensitivity_keeps_other_fields() {
        let base = ClassifierConfig::default().with_min_interval_ms(1_000);
        let tuned = base.with_sensitivity(2.0);
        assert_eq!(tuned.fall_threshold, 35.0);
        assert_eq!(tuned.min_interval_ms, 1_000);
        assert_eq!(base.fall_threshold, 25.0);
    }
}
