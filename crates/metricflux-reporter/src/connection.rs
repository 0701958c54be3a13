//! Connection management.
//!
//! The transport is chosen once from the destination URL: `http` gets an
//! HTTP client, every other scheme a UDP client aimed at `host:port`. A
//! failed health check is answered by building a brand new client and
//! dropping the old one.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use metricflux_client::{
    BatchPoints, Client, ClientResult, HttpClient, HttpConfig, Pong, UdpClient, UdpConfig,
};
use tracing::{debug, info};
use url::Url;

use crate::config::ReporterConfig;
use crate::error::{ReporterError, ReporterResult};

/// Whole-request timeout for the HTTP transport.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Datagram size limit for the UDP transport.
pub const UDP_PAYLOAD_SIZE: usize = 512;

/// Bound on each health-check ping.
pub const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// A live client for one of the two transports.
#[derive(Debug)]
pub enum Connection {
    Http(HttpClient),
    Udp(UdpClient),
}

impl Connection {
    pub fn transport(&self) -> &'static str {
        match self {
            Connection::Http(_) => "http",
            Connection::Udp(_) => "udp",
        }
    }
}

impl Client for Connection {
    async fn ping(&self, timeout: Duration) -> ClientResult<Pong> {
        match self {
            Connection::Http(c) => c.ping(timeout).await,
            Connection::Udp(c) => c.ping(timeout).await,
        }
    }

    async fn write(&self, batch: &BatchPoints) -> ClientResult<()> {
        match self {
            Connection::Http(c) => c.write(batch).await,
            Connection::Udp(c) => c.write(batch).await,
        }
    }
}

/// Builds clients. Called once at startup and again on every rebuild.
pub trait Connector: Send + Sync {
    type Client: Client;

    fn connect(&self) -> impl Future<Output = ReporterResult<Self::Client>> + Send;
}

/// Builds a [`Connection`] from the destination URL and credentials.
#[derive(Debug, Clone)]
pub struct UrlConnector {
    url: Url,
    username: String,
    password: String,
}

impl UrlConnector {
    pub fn new(url: Url, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &ReporterConfig) -> ReporterResult<Self> {
        Ok(Self::new(
            config.destination()?,
            config.username.clone(),
            config.password.clone(),
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `host[:port]` for the UDP transport.
    fn udp_addr(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

impl Connector for UrlConnector {
    type Client = Connection;

    async fn connect(&self) -> ReporterResult<Connection> {
        if self.url.scheme() == "http" {
            let client = HttpClient::new(HttpConfig {
                addr: self.url.to_string(),
                username: self.username.clone(),
                password: self.password.clone(),
                timeout: HTTP_TIMEOUT,
                ..Default::default()
            })
            .map_err(ReporterError::Connection)?;
            Ok(Connection::Http(client))
        } else {
            let client = UdpClient::connect(UdpConfig {
                addr: self.udp_addr(),
                payload_size: UDP_PAYLOAD_SIZE,
            })
            .await
            .map_err(ReporterError::Connection)?;
            Ok(Connection::Udp(client))
        }
    }
}

/// Owns the single live client and replaces it wholesale on rebuild.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    client: C::Client,
    rebuilds: u64,
}

impl<C> fmt::Debug for ConnectionManager<C>
where
    C: Connector + fmt::Debug,
    C::Client: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connector", &self.connector)
            .field("client", &self.client)
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Build the first client. Failure here is fatal to the reporter.
    pub async fn connect(connector: C) -> ReporterResult<Self> {
        let client = connector.connect().await?;
        Ok(Self {
            connector,
            client,
            rebuilds: 0,
        })
    }

    pub fn client(&self) -> &C::Client {
        &self.client
    }

    /// Number of successful rebuilds since startup.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Ping the current client, bounded by [`PING_TIMEOUT`].
    pub async fn health_check(&self) -> ReporterResult<Pong> {
        let pong = self
            .client
            .ping(PING_TIMEOUT)
            .await
            .map_err(ReporterError::Connection)?;
        debug!(rtt_ms = pong.rtt.as_millis() as u64, version = %pong.version, "ping ok");
        Ok(pong)
    }

    /// Replace the client with a freshly built one. On failure the old
    /// client stays in place.
    pub async fn rebuild(&mut self) -> ReporterResult<()> {
        let fresh = self.connector.connect().await?;
        self.client = fresh;
        self.rebuilds += 1;
        info!(rebuilds = self.rebuilds, "client recreated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConnector;

    fn connector(url: &str) -> UrlConnector {
        UrlConnector::new(Url::parse(url).unwrap(), "u", "p")
    }

    #[tokio::test]
    async fn http_scheme_selects_http() {
        let conn = connector("http://localhost:8086").connect().await.unwrap();
        assert_eq!(conn.transport(), "http");
        match conn {
            Connection::Http(c) => {
                assert_eq!(c.config().timeout, HTTP_TIMEOUT);
                assert_eq!(c.config().username, "u");
            }
            other => panic!("unexpected transport {}", other.transport()),
        }
    }

    #[tokio::test]
    async fn other_schemes_select_udp() {
        let conn = connector("udp://127.0.0.1:8089").connect().await.unwrap();
        match conn {
            Connection::Udp(c) => {
                assert_eq!(c.payload_size(), UDP_PAYLOAD_SIZE);
                assert_eq!(c.peer().port(), 8089);
            }
            other => panic!("unexpected transport {}", other.transport()),
        }

        let conn = connector("https://127.0.0.1:8089").connect().await.unwrap();
        assert_eq!(conn.transport(), "udp");
    }

    #[tokio::test]
    async fn udp_without_port_fails() {
        let err = connector("udp://127.0.0.1").connect().await.unwrap_err();
        assert!(matches!(err, ReporterError::Connection(_)));
    }

    #[test]
    fn udp_addr_keeps_ipv6_brackets() {
        assert_eq!(connector("udp://[::1]:8089").udp_addr(), "[::1]:8089");
    }

    #[tokio::test]
    async fn initial_connect_failure_is_returned() {
        let mock = MockConnector::default();
        mock.script.fail_connects(true);
        let Err(err) = ConnectionManager::connect(mock).await else {
            panic!("connect should fail");
        };
        assert!(matches!(err, ReporterError::Connection(_)));
    }

    #[tokio::test]
    async fn manager_debug_shows_live_client() {
        let manager = ConnectionManager::connect(MockConnector::default()).await.unwrap();
        let out = format!("{manager:?}");
        assert!(out.contains("generation: 1"), "{out}");
        assert!(out.contains("rebuilds: 0"), "{out}");
    }

    #[tokio::test]
    async fn rebuild_replaces_client() {
        let mock = MockConnector::default();
        let script = mock.script.clone();
        let mut manager = ConnectionManager::connect(mock).await.unwrap();
        assert_eq!(manager.client().generation, 1);

        manager.rebuild().await.unwrap();
        assert_eq!(manager.client().generation, 2);
        assert_eq!(manager.rebuilds(), 1);
        assert_eq!(script.connects(), 2);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_old_client() {
        let mock = MockConnector::default();
        let script = mock.script.clone();
        let mut manager = ConnectionManager::connect(mock).await.unwrap();

        script.fail_connects(true);
        assert!(manager.rebuild().await.is_err());
        assert_eq!(manager.client().generation, 1);
        assert_eq!(manager.rebuilds(), 0);
    }

    #[tokio::test]
    async fn health_check_reports_ping_failure() {
        let mock = MockConnector::default();
        let script = mock.script.clone();
        let manager = ConnectionManager::connect(mock).await.unwrap();
        assert!(manager.health_check().await.is_ok());

        script.fail_pings(true);
        assert!(matches!(
            manager.health_check().await,
            Err(ReporterError::Connection(_))
        ));
    }
}
