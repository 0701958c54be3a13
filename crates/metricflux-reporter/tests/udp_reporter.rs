//! Reporter end to end over UDP.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use metricflux_registry::Registry;
use metricflux_reporter::{spawn, ReporterConfig};

#[tokio::test]
async fn datagrams_carry_line_protocol() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let registry = Arc::new(Registry::new());
    registry.get_or_register_counter("requests").unwrap().inc(42);

    let config = ReporterConfig::new(
        format!("udp://{addr}"),
        "metrics",
        "app",
        Duration::from_millis(100),
    );
    let handle = spawn(config, registry).await.unwrap();

    let mut buf = [0u8; 1024];
    let n = timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("no datagram received")
        .unwrap();
    handle.shutdown().await;

    assert!(n <= 512);
    let payload = std::str::from_utf8(&buf[..n]).unwrap();
    assert!(payload.starts_with("app requests.count=42i "), "{payload}");
    // Nanosecond timestamps rounded to whole seconds.
    assert!(payload.ends_with("000000000\n"), "{payload}");
}

#[tokio::test]
async fn large_ticks_are_split_across_datagrams() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let registry = Arc::new(Registry::new());
    let latency = registry.get_or_register_timer("latency").unwrap();
    latency.update(Duration::from_millis(5));

    let config = ReporterConfig::new(
        format!("udp://{addr}"),
        "metrics",
        "app",
        Duration::from_millis(100),
    );
    let handle = spawn(config, registry).await.unwrap();

    // 16 timer points do not fit one 512 byte datagram.
    let mut lines = 0;
    let mut buf = [0u8; 1024];
    while lines < 16 {
        let n = timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .expect("missing datagram")
            .unwrap();
        assert!(n <= 512);
        lines += std::str::from_utf8(&buf[..n]).unwrap().lines().count();
    }
    handle.shutdown().await;

    assert!(lines >= 16);
}
