//! metricflux-client — wire client for an InfluxDB-compatible time-series store.
//!
//! Builds validated [`Point`]s, groups them into a [`BatchPoints`], and
//! writes the batch as line protocol over HTTP (`POST /write`) or UDP
//! datagrams.
//!
//! # Architecture
//!
//! ```text
//! Point ──┐
//! Point ──┼─► BatchPoints ─► line protocol ─┬─► HttpClient (hyper, /write, /ping)
//! Point ──┘                                 └─► UdpClient  (payload-sized datagrams)
//! ```

pub mod batch;
pub mod client;
pub mod error;
pub mod http_client;
pub mod line;
pub mod point;
pub mod udp;

pub use batch::{BatchPoints, Precision};
pub use client::{Client, Pong};
pub use error::{ClientError, ClientResult, PointError};
pub use http_client::{HttpClient, HttpConfig};
pub use point::{FieldValue, Point};
pub use udp::{UdpClient, UdpConfig};
