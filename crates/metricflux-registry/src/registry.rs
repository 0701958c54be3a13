//! Name → metric registry.
//!
//! Lookups and registration take a reader/writer lock over the map. Metric
//! updates never touch that lock; each metric synchronizes itself.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::counter::Counter;
use crate::error::{RegistryError, RegistryResult};
use crate::gauge::{Gauge, GaugeF64};
use crate::healthcheck::Healthcheck;
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::snapshot::{GaugeValue, MetricSnapshot};
use crate::timer::Timer;

/// A registered metric.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeF64(Arc<GaugeF64>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    Healthcheck(Arc<Healthcheck>),
}

impl Metric {
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::GaugeF64(_) => "gauge_f64",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
            Metric::Healthcheck(_) => "healthcheck",
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        match self {
            Metric::Counter(c) => MetricSnapshot::Counter(c.count()),
            Metric::Gauge(g) => MetricSnapshot::Gauge(GaugeValue::Int(g.value())),
            Metric::GaugeF64(g) => MetricSnapshot::Gauge(GaugeValue::Float(g.value())),
            Metric::Histogram(h) => MetricSnapshot::Histogram(h.snapshot()),
            Metric::Meter(m) => MetricSnapshot::Meter(m.snapshot()),
            Metric::Timer(t) => MetricSnapshot::Timer(t.snapshot()),
            Metric::Healthcheck(_) => MetricSnapshot::Unsupported,
        }
    }
}

/// Anything a reporter can walk to read every metric.
///
/// Implementations must tolerate concurrent mutation: an entry added or
/// removed during the walk may be missed or included. Order is unspecified.
pub trait MetricSource: Send + Sync {
    fn for_each(&self, f: &mut dyn FnMut(&str, MetricSnapshot));
}

/// Thread-safe metrics registry.
#[derive(Debug, Default)]
pub struct Registry {
    metrics: RwLock<HashMap<String, Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric under `name`. Fails if the name is taken.
    pub fn register(&self, name: &str, metric: Metric) -> RegistryResult<()> {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if metrics.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        debug!(%name, kind = metric.kind(), "metric registered");
        metrics.insert(name.to_string(), metric);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn unregister_all(&self) {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn get_or_register_counter(&self, name: &str) -> RegistryResult<Arc<Counter>> {
        self.get_or_register(name, "counter", Metric::Counter, |m| match m {
            Metric::Counter(c) => Some(c.clone()),
            _ => None,
        })
    }

    pub fn get_or_register_gauge(&self, name: &str) -> RegistryResult<Arc<Gauge>> {
        self.get_or_register(name, "gauge", Metric::Gauge, |m| match m {
            Metric::Gauge(g) => Some(g.clone()),
            _ => None,
        })
    }

    pub fn get_or_register_gauge_f64(&self, name: &str) -> RegistryResult<Arc<GaugeF64>> {
        self.get_or_register(name, "gauge_f64", Metric::GaugeF64, |m| match m {
            Metric::GaugeF64(g) => Some(g.clone()),
            _ => None,
        })
    }

    pub fn get_or_register_histogram(&self, name: &str) -> RegistryResult<Arc<Histogram>> {
        self.get_or_register(name, "histogram", Metric::Histogram, |m| match m {
            Metric::Histogram(h) => Some(h.clone()),
            _ => None,
        })
    }

    pub fn get_or_register_meter(&self, name: &str) -> RegistryResult<Arc<Meter>> {
        self.get_or_register(name, "meter", Metric::Meter, |m| match m {
            Metric::Meter(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn get_or_register_timer(&self, name: &str) -> RegistryResult<Arc<Timer>> {
        self.get_or_register(name, "timer", Metric::Timer, |m| match m {
            Metric::Timer(t) => Some(t.clone()),
            _ => None,
        })
    }

    fn get_or_register<T: Default>(
        &self,
        name: &str,
        expected: &'static str,
        wrap: fn(Arc<T>) -> Metric,
        unwrap: fn(&Metric) -> Option<Arc<T>>,
    ) -> RegistryResult<Arc<T>> {
        let mismatch = |existing: &Metric| RegistryError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual: existing.kind(),
        };

        // Fast path: already registered.
        if let Some(existing) = self.get(name) {
            return unwrap(&existing).ok_or_else(|| mismatch(&existing));
        }

        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let entry: &Metric = metrics.entry(name.to_string()).or_insert_with(|| {
            debug!(%name, kind = expected, "metric registered");
            wrap(Arc::new(T::default()))
        });
        unwrap(entry).ok_or_else(|| mismatch(entry))
    }
}

impl MetricSource for Registry {
    fn for_each(&self, f: &mut dyn FnMut(&str, MetricSnapshot)) {
        // Copy the entries out so producers can register while we snapshot.
        let entries: Vec<(String, Metric)> = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect();

        for (name, metric) in entries {
            f(&name, metric.snapshot());
        }
    }
}
