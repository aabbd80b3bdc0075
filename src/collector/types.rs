//! Accelerometer sample types delivered by a sample source.
//!
//! Samples carry raw 3-axis acceleration in the sensor's units (m/s²,
//! gravity included) and the platform timestamp in milliseconds.

use serde::{Deserialize, Serialize};

/// A single 3-axis accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSample {
    /// Platform timestamp in milliseconds
    pub timestamp_millis: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerationSample {
    pub fn new(timestamp_millis: i64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_millis,
            x,
            y,
            z,
        }
    }

    /// Euclidean norm of the acceleration vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Magnitude with the static gravity component removed.
    ///
    /// A phone held still reads close to zero regardless of orientation.
    pub fn net_magnitude(&self, gravity: f64) -> f64 {
        (self.magnitude() - gravity).abs()
    }

    /// Build a sample whose net magnitude is exactly `net` (vertical axis only).
    ///
    /// Handy for synthetic traces and tests.
    pub fn vertical(timestamp_millis: i64, net: f64, gravity: f64) -> Self {
        Self::new(timestamp_millis, 0.0, 0.0, gravity + net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        let sample = AccelerationSample::new(0, 3.0, 4.0, 0.0);
        assert!((sample.magnitude() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_magnitude_removes_gravity() {
        let resting = AccelerationSample::new(0, 0.0, 0.0, 9.81);
        assert!(resting.net_magnitude(9.81) < 1e-9);

        // Free fall reads close to zero total acceleration
        let falling = AccelerationSample::new(0, 0.0, 0.0, 0.0);
        assert!((falling.net_magnitude(9.81) - 9.81).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_helper() {
        let sample = AccelerationSample::vertical(42, 30.0, 9.81);
        assert_eq!(sample.timestamp_millis, 42);
        assert!((sample.net_magnitude(9.81) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_serde() {
        let json = r#"{"timestamp_millis":10,"x":1.0,"y":2.0,"z":3.0}"#;
        let sample: AccelerationSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample, AccelerationSample::new(10, 1.0, 2.0, 3.0));
    }
}
