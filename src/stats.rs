//! Streaming moment estimates
//!
//! [`RunningStat`] tracks mean and sample standard deviation over an
//! unbounded stream; [`SlidingWindowStat`] restricts the estimate to the most
//! recent `capacity` values. Both report the sample standard deviation
//! (divisor `n - 1`).

use serde::{Deserialize, Serialize};

use crate::{Result, SynthError};

/// Mean and sample standard deviation of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std_dev: f64,
}

fn require_two(got: usize) -> Result<()> {
    if got < 2 {
        return Err(SynthError::InsufficientData { required: 2, got });
    }
    Ok(())
}

/// Direct two-pass mean and sample standard deviation.
pub fn basic_stat(data: &[f64]) -> Result<MeanStd> {
    require_two(data.len())?;
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let ss: f64 = data.iter().map(|x| (x - mean) * (x - mean)).sum();
    Ok(MeanStd {
        mean,
        std_dev: (ss / (n - 1.0)).sqrt(),
    })
}

/// Incremental mean/variance over an unbounded stream.
///
/// Uses Welford's centered update, so long streams of large-magnitude values
/// do not lose precision to cancellation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStat {
    count: u64,
    mean: f64,
    /// Sum of squared deviations from the current mean
    m2: f64,
}

impl RunningStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a `(count, sum, sum_of_squares)` snapshot.
    pub fn from_state(count: u64, sum: f64, sum_of_squares: f64) -> Self {
        if count == 0 {
            return Self::default();
        }
        let mean = sum / count as f64;
        Self {
            count,
            mean,
            m2: (sum_of_squares - sum * mean).max(0.0),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Mean and sample standard deviation; needs at least two values.
    pub fn stat(&self) -> Result<MeanStd> {
        require_two(self.count as usize)?;
        let variance = self.m2 / (self.count - 1) as f64;
        Ok(MeanStd {
            mean: self.mean,
            std_dev: variance.max(0.0).sqrt(),
        })
    }

    pub fn add_get_stat(&mut self, value: f64) -> Result<MeanStd> {
        self.add(value);
        self.stat()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// `(count, sum, sum_of_squares)` of everything added so far.
    pub fn state(&self) -> (u64, f64, f64) {
        let n = self.count as f64;
        let sum = self.mean * n;
        (self.count, sum, self.m2 + sum * self.mean)
    }
}

impl Extend<f64> for RunningStat {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<f64> for RunningStat {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stat = Self::new();
        stat.extend(iter);
        stat
    }
}

/// Below this ratio of centered sum of squares to accumulated update
/// magnitude, rounding in the incremental updates may dominate the window's
/// spread and the moments are recomputed from the buffer.
const CANCELLATION_RATIO: f64 = 1e-6;

/// Mean/variance over the most recent `capacity` values.
///
/// Values live in a ring buffer; eviction overwrites the oldest slot and
/// applies a centered replace update to the mean and squared deviations,
/// without rescanning. The moments are re-derived from the buffer once per
/// full turn of the ring, or earlier when an update cancels most of the
/// spread (a run of large values leaving the window), so the amortized cost
/// per insertion stays constant. Until the window fills, the estimate is
/// taken over the values actually present.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindowStat {
    capacity: usize,
    buffer: Vec<f64>,
    /// Slot holding the oldest value once the buffer is full
    head: usize,
    mean: f64,
    /// Sum of squared deviations from `mean` over the buffer
    m2: f64,
    /// Absolute size of the `m2` updates since the last recomputation
    drift: f64,
}

impl SlidingWindowStat {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SynthError::InvalidParameter(
                "window capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            buffer: Vec::with_capacity(capacity),
            head: 0,
            mean: 0.0,
            m2: 0.0,
            drift: 0.0,
        })
    }

    /// A full window over `values`, with capacity equal to their number.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let mut stat = Self::new(values.len())?;
        for &value in values {
            stat.add(value);
        }
        Ok(stat)
    }

    pub fn add(&mut self, value: f64) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(value);
            let delta = value - self.mean;
            self.mean += delta / self.buffer.len() as f64;
            self.m2 += delta * (value - self.mean);
            return;
        }

        let oldest = std::mem::replace(&mut self.buffer[self.head], value);
        self.head = (self.head + 1) % self.capacity;

        let previous_mean = self.mean;
        self.mean += (value - oldest) / self.capacity as f64;
        let update = (value - oldest) * (value - self.mean + oldest - previous_mean);
        self.m2 += update;
        self.drift += update.abs();

        if self.head == 0 || self.m2 < CANCELLATION_RATIO * self.drift {
            self.recompute();
        }
    }

    /// Two-pass moments over the buffer.
    fn recompute(&mut self) {
        let n = self.buffer.len() as f64;
        let mean = self.buffer.iter().sum::<f64>() / n;
        self.m2 = self.buffer.iter().map(|x| (x - mean) * (x - mean)).sum();
        self.mean = mean;
        self.drift = 0.0;
    }

    /// Mean and sample standard deviation over the current window contents.
    pub fn stat(&self) -> Result<MeanStd> {
        let n = self.buffer.len();
        require_two(n)?;
        Ok(MeanStd {
            mean: self.mean,
            std_dev: (self.m2 / (n - 1) as f64).sqrt(),
        })
    }

    pub fn add_get_stat(&mut self, value: f64) -> Result<MeanStd> {
        self.add(value);
        self.stat()
    }

    /// Window contents, oldest first.
    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.buffer[self.head..]
            .iter()
            .chain(self.buffer[..self.head].iter())
            .copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    pub fn sum(&self) -> f64 {
        self.mean * self.buffer.len() as f64
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.m2 + self.sum() * self.mean
    }

    /// `(capacity, sum, sum_of_squares)`
    pub fn state(&self) -> (usize, f64, f64) {
        (self.capacity, self.sum(), self.sum_of_squares())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_running_stat_needs_two() {
        let mut stat = RunningStat::new();
        assert_eq!(
            stat.stat(),
            Err(SynthError::InsufficientData {
                required: 2,
                got: 0
            })
        );
        stat.add(3.0);
        assert!(stat.stat().is_err());
        stat.add(5.0);
        let s = stat.stat().unwrap();
        assert_relative_eq!(s.mean, 4.0);
        assert_relative_eq!(s.std_dev, 2.0_f64.sqrt());
    }

    #[test]
    fn test_running_stat_state_round_trip() {
        let stat: RunningStat = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter().collect();
        let (count, sum, sum_sq) = stat.state();
        assert_eq!(count, 8);
        assert_relative_eq!(sum, 40.0, epsilon = 1e-9);
        assert_relative_eq!(sum_sq, 232.0, epsilon = 1e-9);

        let restored = RunningStat::from_state(count, sum, sum_sq);
        let a = stat.stat().unwrap();
        let b = restored.stat().unwrap();
        assert_relative_eq!(a.mean, b.mean, epsilon = 1e-12);
        assert_relative_eq!(a.std_dev, b.std_dev, epsilon = 1e-9);
    }

    #[test]
    fn test_running_stat_large_offset() {
        // Naive sum-of-squares loses all precision here
        let stat: RunningStat = (0..1000).map(|i| 1.0e9 + (i % 2) as f64).collect();
        let s = stat.stat().unwrap();
        assert_relative_eq!(s.mean, 1.0e9 + 0.5, max_relative = 1e-12);
        assert_relative_eq!(s.std_dev, (250.0_f64 / 999.0).sqrt(), max_relative = 1e-4);
    }

    #[test]
    fn test_window_keeps_latest() {
        let mut window = SlidingWindowStat::new(3).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            window.add(v);
        }
        assert_eq!(window.window().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(window.sum(), 12.0);
        assert_eq!(window.sum_of_squares(), 50.0);
        let s = window.stat().unwrap();
        assert_relative_eq!(s.mean, 4.0);
        assert_relative_eq!(s.std_dev, 1.0);
    }

    #[test]
    fn test_window_forgets_large_prefix() {
        let mut window = SlidingWindowStat::new(3).unwrap();
        for v in [1.0e9, 1.0e9 + 1.0, 1.0e9 + 2.0, 1.0, 2.0, 3.0] {
            window.add(v);
        }
        assert_eq!(window.window().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_relative_eq!(window.sum(), 6.0, max_relative = 1e-12);
        assert_relative_eq!(window.sum_of_squares(), 14.0, max_relative = 1e-12);
        let s = window.stat().unwrap();
        assert_relative_eq!(s.mean, 2.0, max_relative = 1e-12);
        assert_relative_eq!(s.std_dev, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_window_large_offset_without_eviction() {
        let window =
            SlidingWindowStat::from_values(&[1.0e9, 1.0e9 + 1.0, 1.0e9 + 2.0, 1.0e9 + 3.0])
                .unwrap();
        let s = window.stat().unwrap();
        assert_relative_eq!(s.mean, 1.0e9 + 1.5, max_relative = 1e-15);
        assert_relative_eq!(s.std_dev, (5.0_f64 / 3.0).sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn test_window_tracks_every_step_across_regime_change() {
        let data = [
            1.0e9,
            1.0e9 + 1.0,
            1.0e9 + 2.0,
            1.0,
            2.0,
            3.0,
            4.0,
            5.0,
            -2.5,
            0.25,
        ];
        let mut window = SlidingWindowStat::new(3).unwrap();
        for (i, &v) in data.iter().enumerate() {
            window.add(v);
            if i < 1 {
                continue;
            }
            let tail = &data[(i + 1).saturating_sub(3)..=i];
            let got = window.stat().unwrap();
            let want = basic_stat(tail).unwrap();
            assert_relative_eq!(got.mean, want.mean, max_relative = 1e-9);
            assert_relative_eq!(got.std_dev, want.std_dev, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_window_warm_up_divides_by_fill() {
        let mut window = SlidingWindowStat::new(10).unwrap();
        window.add(2.0);
        assert!(window.stat().is_err());
        let s = window.add_get_stat(4.0).unwrap();
        assert_relative_eq!(s.mean, 3.0);
        assert_relative_eq!(s.std_dev, 2.0_f64.sqrt());
        assert!(!window.is_full());
    }

    #[test]
    fn test_window_from_values() {
        let window = SlidingWindowStat::from_values(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(window.capacity(), 3);
        assert!(window.is_full());
        assert_eq!(window.state(), (3, 6.0, 14.0));
        assert!(SlidingWindowStat::from_values(&[]).is_err());
        assert!(SlidingWindowStat::new(0).is_err());
    }

    #[test]
    fn test_basic_stat() {
        let s = basic_stat(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.std_dev, (32.0_f64 / 7.0).sqrt());
        assert!(basic_stat(&[1.0]).is_err());
    }

    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-1.0e4f64..1.0e4, min_len..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn running_stat_matches_direct(data in finite_vec(2, 200)) {
            let stat: RunningStat = data.iter().copied().collect();
            let got = stat.stat().unwrap();
            let want = basic_stat(&data).unwrap();
            prop_assert!((got.mean - want.mean).abs() < 1e-6);
            prop_assert!((got.std_dev - want.std_dev).abs() < 1e-6 * (1.0 + want.std_dev));
        }

        #[test]
        fn window_matches_direct_tail(data in finite_vec(2, 200), capacity in 2usize..20) {
            let mut window = SlidingWindowStat::new(capacity).unwrap();
            for &v in &data {
                window.add(v);
            }
            let tail = &data[data.len().saturating_sub(capacity)..];
            prop_assert_eq!(window.window().collect::<Vec<_>>(), tail.to_vec());
            let got = window.stat().unwrap();
            let want = basic_stat(tail).unwrap();
            prop_assert!((got.mean - want.mean).abs() < 1e-9 * (1.0 + want.mean.abs()));
            prop_assert!((got.std_dev - want.std_dev).abs() < 1e-8 * (1.0 + want.std_dev));
        }

        #[test]
        fn window_recovers_after_large_values_leave(
            offset in 1.0e6f64..1.0e12,
            prefix in finite_vec(1, 30),
            suffix in prop::collection::vec(-10.0f64..10.0, 2..60),
            capacity in 2usize..12,
        ) {
            let mut window = SlidingWindowStat::new(capacity).unwrap();
            let mut data: Vec<f64> = prefix.iter().map(|x| offset + x).collect();
            data.extend_from_slice(&suffix);
            for &v in &data {
                window.add(v);
            }
            let tail = &data[data.len().saturating_sub(capacity)..];
            let got = window.stat().unwrap();
            let want = basic_stat(tail).unwrap();
            let scale = 1.0 + want.mean.abs() + want.std_dev;
            prop_assert!((got.mean - want.mean).abs() < 1e-9 * scale);
            prop_assert!((got.std_dev - want.std_dev).abs() < 1e-7 * (1.0 + want.std_dev));
        }
    }
}
