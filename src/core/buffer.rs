//! Fixed-capacity sliding window of net magnitudes.
//!
//! Backed by an inline array and a write cursor, so pushing a sample never
//! allocates. When full, each push overwrites the oldest value.

/// Number of recent net magnitudes kept by the classifier, and the largest
/// window a buffer can be configured with.
pub const BUFFER_CAPACITY: usize = 10;

/// Ring buffer holding up to [`BUFFER_CAPACITY`] recent net magnitudes.
#[derive(Debug, Clone)]
pub struct MagnitudeBuffer {
    values: [f64; BUFFER_CAPACITY],
    /// Active slots, `1..=BUFFER_CAPACITY`
    capacity: usize,
    /// Next slot to write
    cursor: usize,
    len: usize,
}

impl MagnitudeBuffer {
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_CAPACITY)
    }

    /// A buffer keeping the newest `capacity` values, clamped to
    /// `1..=BUFFER_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let clamped = capacity.clamp(1, BUFFER_CAPACITY);
        if clamped != capacity {
            tracing::warn!(
                requested = capacity,
                used = clamped,
                "Magnitude window size out of range"
            );
        }
        Self {
            values: [0.0; BUFFER_CAPACITY],
            capacity: clamped,
            cursor: 0,
            len: 0,
        }
    }

    /// Append a value, evicting the oldest one when the buffer is full.
    pub fn push(&mut self, value: f64) {
        self.values[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
        self.len = 0;
    }

    /// Iterate from the oldest to the newest value.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = (self.cursor + self.capacity - self.len) % self.capacity;
        (0..self.len).map(move |i| self.values[(start + i) % self.capacity])
    }

    /// Iterate over the newest `count` values (fewer if not enough are stored).
    pub fn tail(&self, count: usize) -> impl Iterator<Item = f64> + '_ {
        let skip = self.len.saturating_sub(count);
        self.iter().skip(skip)
    }

    /// True if any stored value is strictly greater than `threshold`.
    ///
    /// NaN never compares greater, so it never counts as a peak.
    pub fn any_above(&self, threshold: f64) -> bool {
        self.iter().any(|v| v > threshold)
    }

    /// True only if at least `count` values are stored and the newest `count`
    /// are all strictly below `threshold`.
    ///
    /// NaN and infinities never compare below a finite threshold.
    pub fn tail_all_below(&self, count: usize, threshold: f64) -> bool {
        count > 0 && self.len >= count && self.tail(count).all(|v| v < threshold)
    }

    /// Largest finite value in the window.
    pub fn peak(&self) -> Option<f64> {
        self.iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

impl Default for MagnitudeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_order() {
        let mut buffer = MagnitudeBuffer::new();
        for v in [1.0, 2.0, 3.0] {
            buffer.push(v);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut buffer = MagnitudeBuffer::new();
        for i in 0..15 {
            buffer.push(i as f64);
        }
        assert_eq!(buffer.len(), BUFFER_CAPACITY);
        let values: Vec<f64> = buffer.iter().collect();
        assert_eq!(values.first(), Some(&5.0));
        assert_eq!(values.last(), Some(&14.0));
    }

    #[test]
    fn test_configured_capacity() {
        let mut buffer = MagnitudeBuffer::with_capacity(4);
        for i in 0..7 {
            buffer.push(i as f64);
        }
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);

        let mut single = MagnitudeBuffer::with_capacity(0);
        let mut oversized = MagnitudeBuffer::with_capacity(64);
        for i in 0..15 {
            single.push(i as f64);
            oversized.push(i as f64);
        }
        assert_eq!(single.iter().collect::<Vec<_>>(), vec![14.0]);
        assert_eq!(oversized.len(), BUFFER_CAPACITY);
    }

    #[test]
    fn test_tail() {
        let mut buffer = MagnitudeBuffer::new();
        for i in 0..12 {
            buffer.push(i as f64);
        }
        assert_eq!(buffer.tail(3).collect::<Vec<_>>(), vec![9.0, 10.0, 11.0]);

        let mut short = MagnitudeBuffer::new();
        short.push(7.0);
        assert_eq!(short.tail(3).collect::<Vec<_>>(), vec![7.0]);
    }

    #[test]
    fn test_tail_all_below_requires_full_window() {
        let mut buffer = MagnitudeBuffer::new();
        buffer.push(0.5);
        buffer.push(0.5);
        assert!(!buffer.tail_all_below(3, 2.0));

        buffer.push(0.5);
        assert!(buffer.tail_all_below(3, 2.0));

        buffer.push(2.0);
        assert!(!buffer.tail_all_below(3, 2.0));
    }

    #[test]
    fn test_non_finite_values() {
        let mut buffer = MagnitudeBuffer::new();
        buffer.push(0.5);
        buffer.push(f64::NAN);
        buffer.push(0.5);
        assert!(!buffer.any_above(25.0));
        assert!(!buffer.tail_all_below(3, 2.0));

        buffer.push(f64::INFINITY);
        assert!(buffer.any_above(25.0));
        assert_eq!(buffer.peak(), Some(0.5));
    }

    #[test]
    fn test_clear() {
        let mut buffer = MagnitudeBuffer::new();
        for i in 0..12 {
            buffer.push(i as f64);
        }
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
        assert_eq!(buffer.peak(), None);

        buffer.push(4.0);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![4.0]);
    }
}
