//! HTTP transport.
//!
//! Each request dials a fresh TCP connection and speaks HTTP/1.1 through
//! hyper's low-level client connection. Writes go to `POST /write`, pings
//! to `GET /ping`.

use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use tracing::debug;
use url::Url;

use crate::batch::BatchPoints;
use crate::client::{Client, Pong};
use crate::error::{ClientError, ClientResult};

/// Default whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    pub addr: String,
    /// Basic auth user; auth is skipped when empty.
    pub username: String,
    pub password: String,
    /// Bound on each request, connect included.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("metricflux-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Client for the HTTP write/ping API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base: Url,
    authority: String,
    config: HttpConfig,
}

/// Status, headers and collected body of a response.
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpClient {
    /// Validate the address and build a client. No connection is made.
    pub fn new(config: HttpConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.addr).map_err(|e| ClientError::InvalidAddress {
            addr: config.addr.clone(),
            reason: e.to_string(),
        })?;
        if base.scheme() != "http" {
            return Err(ClientError::UnsupportedScheme(base.scheme().to_string()));
        }
        let host = base.host_str().ok_or_else(|| ClientError::InvalidAddress {
            addr: config.addr.clone(),
            reason: "missing host".to_string(),
        })?;
        let port = base.port_or_known_default().unwrap_or(80);
        let authority = format!("{host}:{port}");

        Ok(Self {
            base,
            authority,
            config,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// `<base>/<endpoint>` with any trailing slash on the base path collapsed.
    fn endpoint(&self, endpoint: &str) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}/{endpoint}", self.base.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url
    }

    pub(crate) fn write_url(&self, batch: &BatchPoints) -> Url {
        let mut url = self.endpoint("write");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("db", batch.database());
            if let Some(rp) = batch.retention_policy() {
                query.append_pair("rp", rp);
            }
            query.append_pair("precision", batch.precision().as_str());
        }
        url
    }

    pub(crate) fn ping_url(&self, timeout: Duration) -> Url {
        let mut url = self.endpoint("ping");
        if !timeout.is_zero() {
            url.query_pairs_mut()
                .append_pair("wait_for_leader", &format!("{}s", timeout.as_secs_f64().round()));
        }
        url
    }

    fn request(
        &self,
        method: Method,
        url: &Url,
        body: Bytes,
    ) -> ClientResult<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(&url[url::Position::BeforePath..])
            .header(http::header::HOST, &self.authority)
            .header(http::header::USER_AGENT, &self.config.user_agent);
        if !self.config.username.is_empty() {
            let credentials =
                STANDARD.encode(format!("{}:{}", self.config.username, self.config.password));
            builder = builder.header(http::header::AUTHORIZATION, format!("Basic {credentials}"));
        }
        builder
            .body(Full::new(body))
            .map_err(|e| ClientError::Request(e.to_string()))
    }

    async fn send(&self, req: Request<Full<Bytes>>, timeout: Duration) -> ClientResult<Reply> {
        let exchange = async {
            let stream = tokio::net::TcpStream::connect(&self.authority)
                .await
                .map_err(|e| ClientError::Connect(format!("{}: {e}", self.authority)))?;

            let io = hyper_util::rt::TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| ClientError::Connect(e.to_string()))?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, "http connection closed with error");
                }
            });

            let resp = sender
                .send_request(req)
                .await
                .map_err(|e| ClientError::Request(e.to_string()))?;
            let (parts, body) = resp.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| ClientError::Request(e.to_string()))?
                .to_bytes();

            Ok::<_, ClientError>(Reply {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }
}

impl Client for HttpClient {
    async fn ping(&self, timeout: Duration) -> ClientResult<Pong> {
        let started = Instant::now();
        let url = self.ping_url(timeout);
        let req = self.request(Method::GET, &url, Bytes::new())?;
        let bound = if timeout.is_zero() {
            self.config.timeout
        } else {
            timeout
        };

        let reply = self.send(req, bound).await?;
        if reply.status != StatusCode::NO_CONTENT {
            return Err(status_error(&reply));
        }

        let version = reply
            .headers
            .get("X-Influxdb-Version")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(Pong {
            rtt: started.elapsed(),
            version,
        })
    }

    async fn write(&self, batch: &BatchPoints) -> ClientResult<()> {
        let url = self.write_url(batch);
        let body = Bytes::from(batch.to_line_protocol());
        let req = self.request(Method::POST, &url, body)?;

        let reply = self.send(req, self.config.timeout).await?;
        if reply.status != StatusCode::NO_CONTENT && reply.status != StatusCode::OK {
            return Err(status_error(&reply));
        }
        debug!(points = batch.len(), db = %batch.database(), "batch written over http");
        Ok(())
    }
}

/// Prefer the `"error"` field of a JSON body, fall back to the raw body.
fn status_error(reply: &Reply) -> ClientError {
    let message = serde_json::from_slice::<serde_json::Value>(&reply.body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(&reply.body).trim().to_string());
    ClientError::Status {
        status: reply.status.as_u16(),
        message,
    }
}
