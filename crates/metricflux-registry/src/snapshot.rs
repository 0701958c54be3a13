//! Point-in-time views of metrics.
//!
//! A snapshot is taken once per reporting pass and stays stable while it
//! is translated, no matter how producers update the live metric.

use crate::sample::SampleSnapshot;

/// A snapshot of one registered metric, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSnapshot {
    Counter(i64),
    Gauge(GaugeValue),
    Histogram(HistogramSnapshot),
    Meter(MeterSnapshot),
    Timer(TimerSnapshot),
    /// A metric kind that exporters do not know how to publish.
    Unsupported,
}

impl MetricSnapshot {
    /// Short kind name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricSnapshot::Counter(_) => "counter",
            MetricSnapshot::Gauge(_) => "gauge",
            MetricSnapshot::Histogram(_) => "histogram",
            MetricSnapshot::Meter(_) => "meter",
            MetricSnapshot::Timer(_) => "timer",
            MetricSnapshot::Unsupported => "unsupported",
        }
    }
}

/// Integer and floating-point gauges share one snapshot type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeValue {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    sample: SampleSnapshot,
}

impl HistogramSnapshot {
    pub fn new(sample: SampleSnapshot) -> Self {
        Self { sample }
    }

    pub fn count(&self) -> i64 {
        self.sample.count()
    }

    pub fn min(&self) -> i64 {
        self.sample.min()
    }

    pub fn max(&self) -> i64 {
        self.sample.max()
    }

    pub fn sum(&self) -> i64 {
        self.sample.sum()
    }

    pub fn mean(&self) -> f64 {
        self.sample.mean()
    }

    pub fn std_dev(&self) -> f64 {
        self.sample.std_dev()
    }

    pub fn variance(&self) -> f64 {
        self.sample.variance()
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        self.sample.percentiles(ps)
    }

    pub fn sample(&self) -> &SampleSnapshot {
        &self.sample
    }
}

/// Event count and rates, in events per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// Duration distribution (nanoseconds) plus the rate of timed events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerSnapshot {
    pub histogram: HistogramSnapshot,
    pub meter: MeterSnapshot,
}

impl TimerSnapshot {
    pub fn count(&self) -> i64 {
        self.histogram.count()
    }
}
