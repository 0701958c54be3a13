//! Scripted connector and client for driving the reporter in tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metricflux_client::{BatchPoints, Client, ClientError, ClientResult, Pong};

use crate::connection::Connector;
use crate::error::{ReporterError, ReporterResult};

/// Shared switches and recordings, cloned into every client.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    fail_connects: Arc<AtomicBool>,
    fail_pings: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    connects: Arc<AtomicUsize>,
    pings: Arc<AtomicUsize>,
    writes: Arc<Mutex<Vec<(usize, BatchPoints)>>>,
}

impl Script {
    pub(crate) fn fail_connects(&self, fail: bool) {
        self.fail_connects.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Connect attempts, successful or not.
    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Successful writes as (client generation, batch).
    pub(crate) fn writes(&self) -> Vec<(usize, BatchPoints)> {
        self.writes.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockConnector {
    pub(crate) script: Script,
}

#[derive(Debug)]
pub(crate) struct MockClient {
    pub(crate) generation: usize,
    script: Script,
}

impl Connector for MockConnector {
    type Client = MockClient;

    async fn connect(&self) -> ReporterResult<MockClient> {
        let generation = self.script.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if self.script.fail_connects.load(Ordering::SeqCst) {
            return Err(ReporterError::Connection(ClientError::Connect(
                "connection refused".to_string(),
            )));
        }
        Ok(MockClient {
            generation,
            script: self.script.clone(),
        })
    }
}

impl Client for MockClient {
    async fn ping(&self, timeout: Duration) -> ClientResult<Pong> {
        self.script.pings.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_pings.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout(timeout));
        }
        Ok(Pong::default())
    }

    async fn write(&self, batch: &BatchPoints) -> ClientResult<()> {
        if self.script.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 500,
                message: "write failed".to_string(),
            });
        }
        self.script
            .writes
            .lock()
            .unwrap()
            .push((self.generation, batch.clone()));
        Ok(())
    }
}
