//! metricflux-registry — in-process metrics for metricflux.
//!
//! Producers update metrics concurrently from any thread; a reporter
//! periodically walks the registry and reads a point-in-time snapshot of
//! every metric.
//!
//! # Architecture
//!
//! ```text
//! Registry (name → Metric)
//!   ├── Counter / Gauge / GaugeF64   ← atomics
//!   ├── Histogram                    ← bounded reservoir of samples
//!   ├── Meter                        ← EWMA rates, lazily ticked every 5s
//!   ├── Timer                        ← Histogram + Meter
//!   └── Healthcheck                  ← not exported
//!
//! MetricSource::for_each() → (name, MetricSnapshot) per entry
//! ```

pub mod counter;
pub mod error;
pub mod gauge;
pub mod healthcheck;
pub mod histogram;
pub mod meter;
pub mod registry;
pub mod sample;
pub mod snapshot;
pub mod timer;

pub use counter::Counter;
pub use error::{RegistryError, RegistryResult};
pub use gauge::{Gauge, GaugeF64};
pub use healthcheck::Healthcheck;
pub use histogram::Histogram;
pub use meter::Meter;
pub use registry::{Metric, MetricSource, Registry};
pub use sample::{Sample, SampleSnapshot};
pub use snapshot::{GaugeValue, HistogramSnapshot, MeterSnapshot, MetricSnapshot, TimerSnapshot};
pub use timer::Timer;
