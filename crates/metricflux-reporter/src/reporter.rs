//! The reporting loop.
//!
//! A single task owns the connection and services two tickers: the report
//! ticker snapshots the registry and writes one batch, the ping ticker
//! probes the connection every [`PING_INTERVAL`] and rebuilds it when the
//! probe fails. Ticks are handled one at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use metricflux_client::Point;
use metricflux_registry::MetricSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ReporterConfig;
use crate::connection::{ConnectionManager, Connector, UrlConnector};
use crate::error::ReporterResult;
use crate::sender::BatchSender;
use crate::translate::Translator;

/// Period of the connection health check.
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

pub struct Reporter<R: MetricSource + ?Sized, C: Connector = UrlConnector> {
    registry: Arc<R>,
    translator: Translator,
    sender: BatchSender,
    connection: ConnectionManager<C>,
    interval: Duration,
    align: bool,
}

impl<R: MetricSource + ?Sized> Reporter<R, UrlConnector> {
    /// Validate `config` and connect to its destination.
    pub async fn new(config: &ReporterConfig, registry: Arc<R>) -> ReporterResult<Self> {
        let connector = UrlConnector::from_config(config).inspect_err(|e| {
            error!(url = %config.url, error = %e, "unable to parse destination");
        })?;
        Self::with_connector(config, registry, connector).await
    }
}

impl<R: MetricSource + ?Sized, C: Connector> Reporter<R, C> {
    /// Build a reporter whose clients come from `connector`. Fails when the
    /// configuration is invalid or the first client cannot be built.
    pub async fn with_connector(
        config: &ReporterConfig,
        registry: Arc<R>,
        connector: C,
    ) -> ReporterResult<Self> {
        config.validate().inspect_err(|e| {
            error!(error = %e, "invalid reporter configuration");
        })?;
        let connection = ConnectionManager::connect(connector)
            .await
            .inspect_err(|e| {
                error!(url = %config.url, error = %e, "unable to create client");
            })?;

        Ok(Self {
            registry,
            translator: Translator::new(config.measurement.clone(), Arc::new(config.tags.clone())),
            sender: BatchSender::new(config.database.clone()),
            connection,
            interval: config.interval,
            align: config.align,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    /// Translate every registry entry at `timestamp`.
    pub fn collect(&self, timestamp: SystemTime) -> Vec<Point> {
        let mut points = Vec::new();
        self.registry.for_each(&mut |name, snapshot| {
            points.extend(self.translator.translate(name, &snapshot, timestamp));
        });
        points
    }

    /// One report tick: snapshot, translate and send. Returns the number of
    /// points written.
    pub async fn report(&self) -> ReporterResult<usize> {
        let timestamp = snapshot_timestamp(SystemTime::now(), self.interval, self.align);
        let points = self.collect(timestamp);
        let sent = self.sender.send(self.connection.client(), points).await?;
        debug!(points = sent, db = self.sender.database(), "batch written");
        Ok(sent)
    }

    /// One ping tick. A failed probe triggers an immediate rebuild; if that
    /// fails too the old client is kept until the next tick.
    pub async fn ping(&mut self) {
        if let Err(e) = self.connection.health_check().await {
            warn!(error = %e, "ping failed, recreating client");
            if let Err(e) = self.connection.rebuild().await {
                error!(error = %e, "unable to recreate client");
            }
        }
    }

    /// Run until `shutdown` carries `true`. A dropped sender never stops
    /// the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            measurement = self.translator.measurement(),
            db = self.sender.database(),
            "reporter started"
        );

        let start = Instant::now();
        let mut report_ticker = interval_at(start + self.interval, self.interval);
        report_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ping_ticker = interval_at(start + PING_INTERVAL, PING_INTERVAL);
        ping_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = report_ticker.tick() => {
                    if let Err(e) = self.report().await {
                        error!(error = %e, "unable to send metrics");
                    }
                }
                _ = ping_ticker.tick() => {
                    self.ping().await;
                }
                _ = shutdown_signal(&mut shutdown) => {
                    info!("reporter shutting down");
                    break;
                }
            }
        }
    }
}

impl<R, C> Reporter<R, C>
where
    R: MetricSource + ?Sized + 'static,
    C: Connector + 'static,
{
    /// Run on a background task.
    pub fn spawn(self) -> ReporterHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown_rx));
        ReporterHandle {
            shutdown_tx,
            handle,
        }
    }
}

async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch.
const ZERO_TIME_OFFSET_SECS: i128 = 62_135_596_800;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Timestamp for a tick at `now`. With `align`, `now` is truncated down to
/// a whole multiple of `interval` counted from 0001-01-01T00:00:00Z, the
/// same boundaries the store's own time truncation uses.
pub fn snapshot_timestamp(now: SystemTime, interval: Duration, align: bool) -> SystemTime {
    if !align || interval.is_zero() {
        return now;
    }
    let unix_nanos = match now.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i128,
        Err(e) => -(e.duration().as_nanos() as i128),
    };
    let offset = ZERO_TIME_OFFSET_SECS * NANOS_PER_SEC;
    let since_zero = unix_nanos + offset;
    if since_zero < 0 {
        return now;
    }
    let aligned = since_zero - since_zero % interval.as_nanos() as i128 - offset;

    let magnitude = Duration::new(
        (aligned.unsigned_abs() / 1_000_000_000) as u64,
        (aligned.unsigned_abs() % 1_000_000_000) as u32,
    );
    if aligned >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}

/// A reporter running on a background task.
#[derive(Debug)]
pub struct ReporterHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReporterHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "reporter task failed");
        }
        info!("reporter stopped");
    }
}

/// Start a reporter for `config` on a background task.
pub async fn spawn<R>(config: ReporterConfig, registry: Arc<R>) -> ReporterResult<ReporterHandle>
where
    R: MetricSource + ?Sized + 'static,
{
    Ok(Reporter::new(&config, registry).await?.spawn())
}

/// Report `registry` every `interval` to the store at `url`. Runs until
/// the process exits; only startup failures are returned.
#[allow(clippy::too_many_arguments)]
pub async fn influxdb<R>(
    registry: Arc<R>,
    interval: Duration,
    url: &str,
    database: &str,
    measurement: &str,
    username: &str,
    password: &str,
    align: bool,
) -> ReporterResult<()>
where
    R: MetricSource + ?Sized,
{
    influxdb_with_tags(
        registry,
        interval,
        url,
        database,
        measurement,
        username,
        password,
        HashMap::new(),
        align,
    )
    .await
}

/// [`influxdb`] with base tags attached to every point.
#[allow(clippy::too_many_arguments)]
pub async fn influxdb_with_tags<R>(
    registry: Arc<R>,
    interval: Duration,
    url: &str,
    database: &str,
    measurement: &str,
    username: &str,
    password: &str,
    tags: HashMap<String, String>,
    align: bool,
) -> ReporterResult<()>
where
    R: MetricSource + ?Sized,
{
    let config = ReporterConfig::new(url, database, measurement, interval)
        .with_credentials(username, password)
        .with_tags(tags)
        .with_align(align);
    let reporter = Reporter::new(&config, registry).await?;

    // Nothing ever signals this channel.
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    reporter.run(shutdown_rx).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReporterError;
    use crate::mock::{MockConnector, Script};
    use metricflux_client::FieldValue;
    use metricflux_registry::{Healthcheck, Metric, Registry};

    fn config() -> ReporterConfig {
        ReporterConfig::new("http://localhost:8086", "metrics", "app", Duration::from_secs(10))
            .with_tags(HashMap::from([("host".to_string(), "web-1".to_string())]))
    }

    async fn reporter(registry: Arc<Registry>) -> (Reporter<Registry, MockConnector>, Script) {
        let mock = MockConnector::default();
        let script = mock.script.clone();
        let reporter = Reporter::with_connector(&config(), registry, mock).await.unwrap();
        (reporter, script)
    }

    fn busy_registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry.get_or_register_counter("requests").unwrap().inc(42);
        registry.get_or_register_gauge("queue_size").unwrap().update(3);
        registry
    }

    #[tokio::test]
    async fn report_writes_one_batch_per_tick() {
        let (reporter, script) = reporter(busy_registry()).await;

        let before = SystemTime::now();
        assert_eq!(reporter.report().await.unwrap(), 2);
        let after = SystemTime::now();

        let writes = script.writes();
        assert_eq!(writes.len(), 1);
        let batch = &writes[0].1;
        assert_eq!(batch.database(), "metrics");

        let mut fields: Vec<(String, FieldValue)> = batch
            .points()
            .iter()
            .flat_map(|p| p.fields().iter().map(|(k, v)| (k.clone(), *v)))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            fields,
            vec![
                ("queue_size.gauge".to_string(), FieldValue::Integer(3)),
                ("requests.count".to_string(), FieldValue::Integer(42)),
            ]
        );
        let base = HashMap::from([("host".to_string(), "web-1".to_string())]);
        let tick = batch.points()[0].timestamp();
        assert!(before <= tick && tick <= after);
        for point in batch.points() {
            assert_eq!(point.series(), "app");
            assert_eq!(point.tags(), &base);
            assert_eq!(point.timestamp(), tick);
        }
    }

    #[tokio::test]
    async fn tick_without_exportable_metrics_still_writes() {
        let registry = Arc::new(Registry::new());
        registry
            .register("db", Metric::Healthcheck(Arc::new(Healthcheck::new(|_| {}))))
            .unwrap();
        let (reporter, script) = reporter(registry).await;

        assert_eq!(reporter.report().await.unwrap(), 0);
        let writes = script.writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].1.is_empty());

        script.fail_writes(true);
        assert!(matches!(reporter.report().await, Err(ReporterError::Write(_))));
    }

    #[tokio::test]
    async fn write_failure_does_not_poison_next_tick() {
        let (reporter, script) = reporter(busy_registry()).await;

        script.fail_writes(true);
        assert!(matches!(reporter.report().await, Err(ReporterError::Write(_))));

        script.fail_writes(false);
        assert_eq!(reporter.report().await.unwrap(), 2);
        assert_eq!(script.writes().len(), 1);
    }

    #[tokio::test]
    async fn failed_ping_rebuilds_client() {
        let (mut reporter, script) = reporter(busy_registry()).await;

        reporter.ping().await;
        assert_eq!(reporter.connection().client().generation, 1);

        script.fail_pings(true);
        reporter.ping().await;
        assert_eq!(reporter.connection().client().generation, 2);
        assert_eq!(script.connects(), 2);

        reporter.report().await.unwrap();
        assert_eq!(script.writes()[0].0, 2);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_reporting_on_old_client() {
        let (mut reporter, script) = reporter(busy_registry()).await;

        script.fail_pings(true);
        script.fail_connects(true);
        reporter.ping().await;
        assert_eq!(reporter.connection().client().generation, 1);
        assert_eq!(reporter.connection().rebuilds(), 0);

        reporter.report().await.unwrap();
        assert_eq!(script.writes()[0].0, 1);
    }

    #[tokio::test]
    async fn startup_fails_without_first_client() {
        let mock = MockConnector::default();
        mock.script.fail_connects(true);
        let result = Reporter::with_connector(&config(), busy_registry(), mock).await;
        assert!(matches!(result, Err(ReporterError::Connection(_))));
    }

    #[tokio::test]
    async fn startup_rejects_zero_interval() {
        let mut config = config();
        config.interval = Duration::ZERO;
        let result =
            Reporter::with_connector(&config, busy_registry(), MockConnector::default()).await;
        assert!(matches!(result, Err(ReporterError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_report_and_ping_independently() {
        let (reporter, script) = reporter(busy_registry()).await;
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(reporter.run(rx));

        // Nothing fires at start.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(script.pings(), 0);
        assert!(script.writes().is_empty());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(script.writes().len(), 3);
        assert_eq!(script.pings(), 6);

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_rebuilds_once_per_failed_ping() {
        let (reporter, script) = reporter(Arc::new(Registry::new())).await;
        script.fail_pings(true);
        let handle = reporter.spawn();

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(script.pings(), 3);
        assert_eq!(script.connects(), 4);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn run_survives_failed_writes() {
        let (reporter, script) = reporter(busy_registry()).await;
        script.fail_writes(true);
        let handle = reporter.spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(!handle.is_finished());
        assert!(script.writes().is_empty());

        script.fail_writes(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(script.writes().len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_keeps_running() {
        let (reporter, script) = reporter(busy_registry()).await;
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(reporter.run(rx));
        drop(tx);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(!task.is_finished());
        assert_eq!(script.writes().len(), 2);
        task.abort();
    }

    #[test]
    fn aligned_timestamp_truncates_to_interval() {
        // 12:00:07 UTC on the first day.
        let now = UNIX_EPOCH + Duration::from_secs(12 * 3600 + 7);
        assert_eq!(
            snapshot_timestamp(now, Duration::from_secs(10), true),
            UNIX_EPOCH + Duration::from_secs(12 * 3600)
        );
        assert_eq!(
            snapshot_timestamp(now, Duration::from_secs(60), true),
            UNIX_EPOCH + Duration::from_secs(12 * 3600)
        );
    }

    #[test]
    fn aligned_timestamp_counts_from_zero_time() {
        // 7s does not divide a day, so the boundary depends on the origin.
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_003);
        assert_eq!(
            snapshot_timestamp(now, Duration::from_secs(7), true),
            UNIX_EPOCH + Duration::from_secs(1_699_999_997)
        );
    }

    #[test]
    fn aligned_timestamp_before_epoch() {
        let now = UNIX_EPOCH - Duration::from_secs(3);
        assert_eq!(
            snapshot_timestamp(now, Duration::from_secs(10), true),
            UNIX_EPOCH - Duration::from_secs(10)
        );
    }

    #[test]
    fn unaligned_timestamp_is_now() {
        let now = UNIX_EPOCH + Duration::new(1_700_000_007, 123);
        assert_eq!(snapshot_timestamp(now, Duration::from_secs(10), false), now);
    }

    #[test]
    fn aligned_timestamp_handles_sub_second_intervals() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_750);
        assert_eq!(
            snapshot_timestamp(now, Duration::from_millis(500), true),
            UNIX_EPOCH + Duration::from_millis(1_700_000_000_500)
        );
    }
}
