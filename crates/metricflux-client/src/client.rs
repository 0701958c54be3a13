//! The operations every transport offers.

use std::future::Future;
use std::time::Duration;

use crate::batch::BatchPoints;
use crate::error::ClientResult;

/// Reply to a successful ping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pong {
    /// Round-trip time of the probe.
    pub rtt: Duration,
    /// Server version string, empty when the transport cannot report one.
    pub version: String,
}

/// A connected time-series client.
pub trait Client: Send + Sync {
    /// Liveness probe bounded by `timeout`.
    fn ping(&self, timeout: Duration) -> impl Future<Output = ClientResult<Pong>> + Send;

    /// Write every point in `batch` in one call.
    fn write(&self, batch: &BatchPoints) -> impl Future<Output = ClientResult<()>> + Send;
}
