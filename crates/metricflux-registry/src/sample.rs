//! Bounded sample reservoir and the statistics computed over it.
//!
//! The reservoir keeps the most recent `capacity` values in a ring. The
//! total number of updates is tracked separately so `count` keeps growing
//! after the ring wraps.

use std::collections::VecDeque;

/// Default reservoir size.
pub const DEFAULT_SAMPLE_SIZE: usize = 1028;

/// Ring buffer of the most recent samples.
#[derive(Debug, Clone)]
pub struct Sample {
    values: VecDeque<i64>,
    capacity: usize,
    count: i64,
}

impl Sample {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            count: 0,
        }
    }

    pub fn update(&mut self, value: i64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.count += 1;
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.count = 0;
    }

    /// Number of values currently held.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn snapshot(&self) -> SampleSnapshot {
        SampleSnapshot::new(self.count, self.values.iter().copied().collect())
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

/// Frozen copy of a reservoir. Values are kept sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSnapshot {
    count: i64,
    sorted: Vec<i64>,
}

impl SampleSnapshot {
    pub fn new(count: i64, mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self {
            count,
            sorted: values,
        }
    }

    /// Total number of updates ever recorded.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Number of values in the reservoir.
    pub fn size(&self) -> usize {
        self.sorted.len()
    }

    pub fn values(&self) -> &[i64] {
        &self.sorted
    }

    pub fn min(&self) -> i64 {
        self.sorted.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> i64 {
        self.sorted.last().copied().unwrap_or(0)
    }

    pub fn sum(&self) -> i64 {
        self.sorted.iter().fold(0i64, |acc, v| acc.wrapping_add(*v))
    }

    pub fn mean(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }
        self.sorted.iter().map(|v| *v as f64).sum::<f64>() / self.sorted.len() as f64
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self
            .sorted
            .iter()
            .map(|v| {
                let d = *v as f64 - mean;
                d * d
            })
            .sum();
        sum_sq / self.sorted.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn percentile(&self, p: f64) -> f64 {
        percentile(&self.sorted, p)
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|p| percentile(&self.sorted, *p)).collect()
    }
}

/// Interpolated percentile over sorted values, `p` in `[0, 1]`.
///
/// Uses the `p * (n + 1)` rank: below the first rank returns the minimum,
/// at or past the last rank returns the maximum.
fn percentile(sorted: &[i64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let pos = p * (n as f64 + 1.0);
    if pos < 1.0 {
        sorted[0] as f64
    } else if pos >= n as f64 {
        sorted[n - 1] as f64
    } else {
        let lower = sorted[pos as usize - 1] as f64;
        let upper = sorted[pos as usize] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }
}
