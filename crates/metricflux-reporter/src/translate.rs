//! Metric snapshot → points.
//!
//! Counters and gauges become a single point tagged with the base tags.
//! Histograms, meters and timers are split into one point per statistic,
//! each carrying a `bucket` tag naming the statistic, so the store can
//! query and alert on e.g. `bucket=p99` directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use metricflux_client::{FieldValue, Point};
use metricflux_registry::{
    GaugeValue, HistogramSnapshot, MeterSnapshot, MetricSnapshot, TimerSnapshot,
};
use tracing::debug;

use crate::error::ReporterError;

/// Tag key naming the statistic a point carries.
pub const BUCKET_TAG: &str = "bucket";

/// Quantiles exported for histograms and timers.
pub const PERCENTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.99, 0.999, 0.9999];

/// Converts snapshots into points for one series.
#[derive(Debug, Clone)]
pub struct Translator {
    measurement: String,
    tags: Arc<HashMap<String, String>>,
}

impl Translator {
    pub fn new(measurement: impl Into<String>, tags: Arc<HashMap<String, String>>) -> Self {
        Self {
            measurement: measurement.into(),
            tags,
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn base_tags(&self) -> &Arc<HashMap<String, String>> {
        &self.tags
    }

    /// Points for one metric. Unsupported kinds yield nothing; a statistic
    /// whose point fails validation is dropped without affecting the others.
    pub fn translate(
        &self,
        name: &str,
        snapshot: &MetricSnapshot,
        timestamp: SystemTime,
    ) -> Vec<Point> {
        match snapshot {
            MetricSnapshot::Counter(count) => {
                self.single(name, "count", FieldValue::Integer(*count), timestamp)
            }
            MetricSnapshot::Gauge(GaugeValue::Int(v)) => {
                self.single(name, "gauge", FieldValue::Integer(*v), timestamp)
            }
            MetricSnapshot::Gauge(GaugeValue::Float(v)) => {
                self.single(name, "gauge", FieldValue::Float(*v), timestamp)
            }
            MetricSnapshot::Histogram(h) => {
                self.bucketed(name, "histogram", histogram_stats(h), timestamp)
            }
            MetricSnapshot::Meter(m) => self.bucketed(name, "meter", meter_stats(m), timestamp),
            MetricSnapshot::Timer(t) => self.bucketed(name, "timer", timer_stats(t), timestamp),
            MetricSnapshot::Unsupported => Vec::new(),
        }
    }

    fn single(
        &self,
        name: &str,
        suffix: &str,
        value: FieldValue,
        timestamp: SystemTime,
    ) -> Vec<Point> {
        self.point(name, suffix, None, value, timestamp)
            .into_iter()
            .collect()
    }

    fn bucketed(
        &self,
        name: &str,
        suffix: &str,
        stats: Vec<(&'static str, f64)>,
        timestamp: SystemTime,
    ) -> Vec<Point> {
        stats
            .into_iter()
            .filter_map(|(bucket, value)| {
                self.point(name, suffix, Some(bucket), FieldValue::Float(value), timestamp)
            })
            .collect()
    }

    fn point(
        &self,
        name: &str,
        suffix: &str,
        bucket: Option<&str>,
        value: FieldValue,
        timestamp: SystemTime,
    ) -> Option<Point> {
        let tags = match bucket {
            Some(bucket) => bucket_tags(bucket, &self.tags),
            None => self.tags.as_ref().clone(),
        };
        let field = format!("{name}.{suffix}");
        match Point::new(&self.measurement, tags, HashMap::from([(field, value)]), timestamp) {
            Ok(point) => Some(point),
            Err(e) => {
                let e = ReporterError::from(e);
                debug!(metric = %name, bucket = ?bucket, error = %e, "dropping point");
                None
            }
        }
    }
}

/// A copy of `base` with the bucket tag set. `base` is never touched.
pub fn bucket_tags(bucket: &str, base: &HashMap<String, String>) -> HashMap<String, String> {
    let mut tags = base.clone();
    tags.insert(BUCKET_TAG.to_string(), bucket.to_string());
    tags
}

fn histogram_stats(h: &HistogramSnapshot) -> Vec<(&'static str, f64)> {
    let ps = h.percentiles(&PERCENTILES);
    vec![
        ("count", h.count() as f64),
        ("max", h.max() as f64),
        ("mean", h.mean()),
        ("min", h.min() as f64),
        ("stddev", h.std_dev()),
        ("variance", h.variance()),
        ("p50", ps[0]),
        ("p75", ps[1]),
        ("p95", ps[2]),
        ("p99", ps[3]),
        ("p999", ps[4]),
        ("p9999", ps[5]),
    ]
}

fn meter_stats(m: &MeterSnapshot) -> Vec<(&'static str, f64)> {
    vec![
        ("count", m.count as f64),
        ("m1", m.rate1),
        ("m5", m.rate5),
        ("m15", m.rate15),
        ("mean", m.rate_mean),
    ]
}

fn timer_stats(t: &TimerSnapshot) -> Vec<(&'static str, f64)> {
    let mut stats = histogram_stats(&t.histogram);
    stats.extend([
        ("m1", t.meter.rate1),
        ("m5", t.meter.rate5),
        ("m15", t.meter.rate15),
        ("meanrate", t.meter.rate_mean),
    ]);
    stats
}
