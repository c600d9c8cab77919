// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for Provisio connectors.
//
// Wraps any `Connector` and transparently counts connects, closes and every
// RPC issued on the connections it hands out, together with failure counts
// and cumulative RPC latency.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::connector::{ClusterConnection, Connection, Connector};
use crate::error::ClusterError;
use crate::types::{Created, Dropped, Endpoint};

/// Accumulated statistics for a connector.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MeteredConnector`] that owns them, until [`MeteredConnector::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorStats {
    /// Number of connect attempts.
    pub connect_count: u64,
    /// Number of connect attempts that failed.
    pub connect_failures: u64,
    /// Number of explicit closes.
    pub close_count: u64,
    /// Number of `db_list` calls.
    pub db_list_count: u64,
    /// Number of `table_list` calls.
    pub table_list_count: u64,
    /// Number of `db_create` calls.
    pub db_create_count: u64,
    /// Number of `db_drop` calls.
    pub db_drop_count: u64,
    /// Number of `table_create` calls.
    pub table_create_count: u64,
    /// Number of RPCs that returned an error.
    pub rpc_failures: u64,
    /// Cumulative wall-clock latency of all RPCs, in milliseconds.
    pub rpc_latency_sum_ms: f64,
}

impl ConnectorStats {
    /// Total number of RPCs issued on connections, excluding connect and close.
    pub fn rpc_count(&self) -> u64 {
        self.db_list_count
            + self.table_list_count
            + self.db_create_count
            + self.db_drop_count
            + self.table_create_count
    }

    /// True if nothing at all was sent to the cluster.
    pub fn is_untouched(&self) -> bool {
        self.connect_count == 0 && self.rpc_count() == 0
    }
}

/// Which counter an RPC contributes to.
#[derive(Debug, Clone, Copy)]
enum Rpc {
    DbList,
    TableList,
    DbCreate,
    DbDrop,
    TableCreate,
}

/// A connector wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use provisio_cluster::connector::Connector;
/// use provisio_cluster::memory::InMemoryCluster;
/// use provisio_cluster::metrics::MeteredConnector;
/// use provisio_cluster::types::Endpoint;
///
/// # tokio_test::block_on(async {
/// let metered = MeteredConnector::new(InMemoryCluster::new());
///
/// let mut conn = metered.connect(&Endpoint::new("localhost", 28015)).await.unwrap();
/// conn.db_create("test").await.unwrap();
/// conn.close().await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!(stats.connect_count, 1);
/// assert_eq!(stats.db_create_count, 1);
/// assert_eq!(stats.close_count, 1);
/// # });
/// ```
pub struct MeteredConnector<C: Connector> {
    inner: C,
    stats: Arc<RwLock<ConnectorStats>>,
}

impl<C: Connector> MeteredConnector<C> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(ConnectorStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> ConnectorStats {
        self.stats.read().await.clone()
    }

    /// Reset all statistics to zero.
    pub async fn reset_stats(&self) {
        let mut s = self.stats.write().await;
        *s = ConnectorStats::default();
    }

    /// Return a reference to the inner connector.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Connector> Connector for MeteredConnector<C> {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, ClusterError> {
        let result = self.inner.connect(endpoint).await;

        let mut s = self.stats.write().await;
        s.connect_count += 1;
        match result {
            Ok(inner) => Ok(Box::new(MeteredConnection {
                inner,
                stats: Arc::clone(&self.stats),
            })),
            Err(e) => {
                s.connect_failures += 1;
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// A connection that reports every RPC to its connector's statistics.
struct MeteredConnection {
    inner: Connection,
    stats: Arc<RwLock<ConnectorStats>>,
}

/// Fold one finished RPC into `stats`.
async fn record<T>(
    stats: &RwLock<ConnectorStats>,
    rpc: Rpc,
    start: Instant,
    result: &Result<T, ClusterError>,
) {
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut s = stats.write().await;
    match rpc {
        Rpc::DbList => s.db_list_count += 1,
        Rpc::TableList => s.table_list_count += 1,
        Rpc::DbCreate => s.db_create_count += 1,
        Rpc::DbDrop => s.db_drop_count += 1,
        Rpc::TableCreate => s.table_create_count += 1,
    }
    s.rpc_latency_sum_ms += elapsed_ms;
    if result.is_err() {
        s.rpc_failures += 1;
    }
}

#[async_trait]
impl ClusterConnection for MeteredConnection {
    async fn db_list(&mut self) -> Result<Vec<String>, ClusterError> {
        let start = Instant::now();
        let result = self.inner.db_list().await;
        record(&self.stats, Rpc::DbList, start, &result).await;
        result
    }

    async fn table_list(&mut self, db: &str) -> Result<Vec<String>, ClusterError> {
        let start = Instant::now();
        let result = self.inner.table_list(db).await;
        record(&self.stats, Rpc::TableList, start, &result).await;
        result
    }

    async fn db_create(&mut self, name: &str) -> Result<Created, ClusterError> {
        let start = Instant::now();
        let result = self.inner.db_create(name).await;
        record(&self.stats, Rpc::DbCreate, start, &result).await;
        result
    }

    async fn db_drop(&mut self, name: &str) -> Result<Dropped, ClusterError> {
        let start = Instant::now();
        let result = self.inner.db_drop(name).await;
        record(&self.stats, Rpc::DbDrop, start, &result).await;
        result
    }

    async fn table_create(&mut self, db: &str, name: &str) -> Result<Created, ClusterError> {
        let start = Instant::now();
        let result = self.inner.table_create(db, name).await;
        record(&self.stats, Rpc::TableCreate, start, &result).await;
        result
    }

    async fn close(&mut self) -> Result<(), ClusterError> {
        let result = self.inner.close().await;
        self.stats.write().await.close_count += 1;
        result
    }
}
