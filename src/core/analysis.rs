//! Offline analysis of recorded accelerometer traces.
//!
//! Used to calibrate thresholds: reports the distribution of net magnitudes
//! and how many falls each sensitivity factor would raise on the trace.

use crate::collector::types::AccelerationSample;
use crate::core::classifier::{FallClassifier, FallEvent};
use crate::core::sensitivity::{ClassifierConfig, GRAVITY};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Distribution of finite net magnitudes in a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagnitudeStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
    pub p95: f64,
}

/// Replay result for one sensitivity factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRun {
    pub factor: f64,
    pub fall_threshold: f64,
    pub events: Vec<FallEvent>,
}

/// Full analysis of a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceReport {
    pub sample_count: usize,
    /// Samples whose net magnitude was NaN or infinite
    pub non_finite_count: usize,
    pub duration_ms: i64,
    pub magnitude: Option<MagnitudeStats>,
    pub runs: Vec<SensitivityRun>,
}

/// Sensitivity factors analysed when none are given.
pub const DEFAULT_FACTORS: [f64; 5] = [0.3, 0.75, 1.0, 1.25, 2.0];

/// Compute magnitude statistics and replay the trace once per factor.
pub fn analyze_trace(samples: &[AccelerationSample], factors: &[f64]) -> TraceReport {
    let magnitudes: Vec<f64> = samples.iter().map(|s| s.net_magnitude(GRAVITY)).collect();
    let finite: Vec<f64> = magnitudes.iter().copied().filter(|m| m.is_finite()).collect();

    let duration_ms = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => last.timestamp_millis.saturating_sub(first.timestamp_millis),
        _ => 0,
    };

    let runs = factors
        .iter()
        .map(|&factor| replay(samples, ClassifierConfig::for_sensitivity(factor), factor))
        .collect();

    TraceReport {
        sample_count: samples.len(),
        non_finite_count: magnitudes.len() - finite.len(),
        duration_ms,
        magnitude: magnitude_stats(finite),
        runs,
    }
}

fn replay(samples: &[AccelerationSample], config: ClassifierConfig, factor: f64) -> SensitivityRun {
    let fall_threshold = config.fall_threshold;
    let mut classifier = FallClassifier::with_config(config);
    let events = samples
        .iter()
        .filter_map(|sample| classifier.observe(sample))
        .collect();

    SensitivityRun {
        factor,
        fall_threshold,
        events,
    }
}

fn magnitude_stats(values: Vec<f64>) -> Option<MagnitudeStats> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = Statistics::mean(&values);
    let std_dev = if count > 1 {
        Statistics::std_dev(&values)
    } else {
        0.0
    };
    let max = Statistics::max(&values);
    let p95 = Data::new(values).percentile(95);

    Some(MagnitudeStats {
        count,
        mean,
        std_dev,
        max,
        p95,
    })
}

impl TraceReport {
    /// Human-readable report for the CLI.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Trace: {} samples over {:.1}s ({} non-finite)\n",
            self.sample_count,
            self.duration_ms as f64 / 1000.0,
            self.non_finite_count
        );

        match &self.magnitude {
            Some(m) => out.push_str(&format!(
                "Net magnitude: mean {:.2}, std dev {:.2}, p95 {:.2}, max {:.2}\n",
                m.mean, m.std_dev, m.p95, m.max
            )),
            None => out.push_str("Net magnitude: no finite samples\n"),
        }

        out.push('\n');
        for run in &self.runs {
            out.push_str(&format!(
                "  sensitivity {:>4.2} (threshold {:>5.1}): {} fall(s)",
                run.factor,
                run.fall_threshold,
                run.events.len()
            ));
            if !run.events.is_empty() {
                let at: Vec<String> = run
                    .events
                    .iter()
                    .map(|e| format!("{}ms", e.timestamp_millis))
                    .collect();
                out.push_str(&format!(" at {}", at.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}
