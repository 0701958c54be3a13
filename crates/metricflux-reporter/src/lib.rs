//! metricflux-reporter — periodic registry snapshots published to a
//! time-series store.
//!
//! Every reporting interval the registry is snapshotted, each metric is
//! flattened into line-protocol points and the whole tick is written as
//! one batch. A separate 5s ping keeps the connection healthy, rebuilding
//! the client whenever the probe fails.
//!
//! # Architecture
//!
//! ```text
//! Registry ─► Translator ─► Vec<Point> ─► BatchSender ─► ConnectionManager
//!                                                          ├── Http(HttpClient)
//!                                                          └── Udp(UdpClient)
//!
//! Reporter::run: report ticker (interval) │ ping ticker (5s) │ shutdown
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use metricflux_registry::Registry;
//! use metricflux_reporter::{spawn, ReporterConfig};
//!
//! # async fn demo() -> Result<(), metricflux_reporter::ReporterError> {
//! let registry = Arc::new(Registry::new());
//! let config = ReporterConfig::new(
//!     "http://localhost:8086",
//!     "metrics",
//!     "app",
//!     Duration::from_secs(10),
//! );
//! let handle = spawn(config, registry).await?;
//! // ...
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod reporter;
pub mod sender;
pub mod translate;

#[cfg(test)]
pub(crate) mod mock;

pub use config::ReporterConfig;
pub use connection::{Connection, ConnectionManager, Connector, UrlConnector};
pub use error::{ReporterError, ReporterResult};
pub use reporter::{
    influxdb, influxdb_with_tags, snapshot_timestamp, spawn, Reporter, ReporterHandle,
    PING_INTERVAL,
};
pub use sender::BatchSender;
pub use translate::Translator;
