//! UDP transport.
//!
//! Lines are packed into datagrams of at most `payload_size` bytes. A line
//! longer than the payload is sent in a datagram of its own. Datagrams
//! carry no precision parameter, so timestamps are written in nanoseconds
//! rounded to the batch precision.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::batch::BatchPoints;
use crate::client::{Client, Pong};
use crate::error::{ClientError, ClientResult};

/// Default maximum datagram size.
pub const DEFAULT_PAYLOAD_SIZE: usize = 512;

/// UDP client settings.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// `host:port` of the UDP listener.
    pub addr: String,
    pub payload_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            payload_size: DEFAULT_PAYLOAD_SIZE,
        }
    }
}

/// Connected UDP socket plus the payload limit.
#[derive(Debug)]
pub struct UdpClient {
    socket: UdpSocket,
    peer: SocketAddr,
    payload_size: usize,
}

impl UdpClient {
    /// Resolve the address and connect a local socket to it.
    pub async fn connect(config: UdpConfig) -> ClientResult<Self> {
        let peer = tokio::net::lookup_host(&config.addr)
            .await
            .map_err(|e| ClientError::InvalidAddress {
                addr: config.addr.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ClientError::InvalidAddress {
                addr: config.addr.clone(),
                reason: "no addresses resolved".to_string(),
            })?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        debug!(%peer, payload_size = config.payload_size, "udp client connected");

        Ok(Self {
            socket,
            peer,
            payload_size: config.payload_size.max(1),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    async fn flush(&self, buf: &mut String, last_err: &mut Option<std::io::Error>) {
        if let Err(e) = self.socket.send(buf.as_bytes()).await {
            warn!(peer = %self.peer, error = %e, bytes = buf.len(), "udp send failed");
            *last_err = Some(e);
        }
        buf.clear();
    }
}

/// Pack newline-terminated lines into payloads no larger than `payload_size`,
/// except for single lines that are larger on their own.
pub(crate) fn pack_lines(batch: &BatchPoints, payload_size: usize) -> Vec<String> {
    let precision = batch.precision();
    let mut payloads = Vec::new();
    let mut buf = String::with_capacity(payload_size);

    for point in batch.points() {
        let mut line = point.to_line(precision.round(point.unix_nanos()));
        line.push('\n');
        if !buf.is_empty() && buf.len() + line.len() > payload_size {
            payloads.push(std::mem::take(&mut buf));
        }
        buf.push_str(&line);
    }
    if !buf.is_empty() {
        payloads.push(buf);
    }
    payloads
}

impl Client for UdpClient {
    /// UDP is connectionless; there is nothing to probe.
    async fn ping(&self, _timeout: Duration) -> ClientResult<Pong> {
        Ok(Pong::default())
    }

    /// Every datagram is attempted; the last send error is returned.
    async fn write(&self, batch: &BatchPoints) -> ClientResult<()> {
        let mut last_err = None;
        for mut payload in pack_lines(batch, self.payload_size) {
            self.flush(&mut payload, &mut last_err).await;
        }
        match last_err {
            Some(e) => Err(ClientError::Io(e)),
            None => Ok(()),
        }
    }
}
