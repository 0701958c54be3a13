//! One write per tick.

use metricflux_client::{BatchPoints, Client, Point, Precision};
use tracing::debug;

use crate::error::{ReporterError, ReporterResult};

/// Wraps a tick's points in a single batch and writes it.
///
/// Nothing is retried or carried over: a failed write loses that tick's
/// points.
#[derive(Debug, Clone)]
pub struct BatchSender {
    database: String,
    precision: Precision,
}

impl BatchSender {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            precision: Precision::Seconds,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Write `points` in one call and return how many were sent. An empty
    /// tick still issues its write.
    pub async fn send<C: Client>(&self, client: &C, points: Vec<Point>) -> ReporterResult<usize> {
        if points.is_empty() {
            debug!(db = %self.database, "writing empty batch");
        }

        let count = points.len();
        let mut batch = BatchPoints::new(self.database.as_str(), self.precision);
        batch.add_points(points);
        client.write(&batch).await.map_err(ReporterError::Write)?;
        Ok(count)
    }
}
