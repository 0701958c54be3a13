//! Distribution of integer samples.

use std::sync::{Mutex, PoisonError};

use crate::sample::Sample;
use crate::snapshot::HistogramSnapshot;

/// Records values into a bounded reservoir.
#[derive(Debug, Default)]
pub struct Histogram {
    sample: Mutex<Sample>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Histogram backed by a reservoir of the given size.
    pub fn with_sample_size(size: usize) -> Self {
        Self {
            sample: Mutex::new(Sample::new(size)),
        }
    }

    pub fn update(&self, value: i64) {
        self.sample
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(value);
    }

    pub fn clear(&self) {
        self.sample
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let sample = self.sample.lock().unwrap_or_else(PoisonError::into_inner);
        HistogramSnapshot::new(sample.snapshot())
    }
}
