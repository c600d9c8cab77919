// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory cluster for Provisio.
//
// Keeps the schema catalogue (databases and their tables) in a `BTreeMap`
// behind a tokio `RwLock`, so listings come back in name order. Intended for
// testing, development and embedded use. The cluster can be made unreachable
// and given per-operation latency to exercise failure and concurrency paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::connector::{ClusterConnection, Connection, Connector};
use crate::error::{ClusterError, ObjectKind};
use crate::types::{Created, Dropped, Endpoint};

/// Catalogue of databases, each holding a set of table names.
type Catalogue = BTreeMap<String, BTreeSet<String>>;

/// Link state shared by the cluster and every connection it hands out.
#[derive(Debug)]
struct Link {
    reachable: AtomicBool,
    latency_ms: AtomicU64,
    connect_attempts: AtomicU64,
    open: AtomicUsize,
    peak: AtomicUsize,
}

/// A process-local cluster.
///
/// Cloning is cheap and every clone observes the same catalogue, so a test can
/// hand one clone to an installer and inspect state through another.
///
/// # Example
///
/// ```rust
/// use provisio_cluster::memory::InMemoryCluster;
/// use provisio_cluster::connector::Connector;
/// use provisio_cluster::types::Endpoint;
///
/// # tokio_test::block_on(async {
/// let cluster = InMemoryCluster::new();
/// let mut conn = cluster.connect(&Endpoint::new("localhost", 28015)).await.unwrap();
/// conn.db_create("test").await.unwrap();
/// assert_eq!(conn.db_list().await.unwrap(), vec!["test".to_string()]);
/// conn.close().await.unwrap();
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCluster {
    catalogue: Arc<RwLock<Catalogue>>,
    link: Arc<Link>,
}

impl InMemoryCluster {
    /// Create a new, empty, reachable cluster.
    pub fn new() -> Self {
        Self {
            catalogue: Arc::new(RwLock::new(BTreeMap::new())),
            link: Arc::new(Link {
                reachable: AtomicBool::new(true),
                latency_ms: AtomicU64::new(0),
                connect_attempts: AtomicU64::new(0),
                open: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Make the cluster reachable or unreachable.
    ///
    /// While unreachable, new connects fail with [`ClusterError::Unreachable`]
    /// and calls on existing connections fail with [`ClusterError::Transport`].
    pub fn set_reachable(&self, reachable: bool) {
        self.link.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Delay every RPC on every connection by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.link
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of connect attempts made against this cluster, successful or not.
    pub fn connect_attempts(&self) -> u64 {
        self.link.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.link.open.load(Ordering::SeqCst)
    }

    /// Highest number of connections that were open at the same time.
    pub fn peak_connections(&self) -> usize {
        self.link.peak.load(Ordering::SeqCst)
    }

    /// Names of all databases, in order.
    pub async fn databases(&self) -> Vec<String> {
        self.catalogue.read().await.keys().cloned().collect()
    }

    /// Names of all tables in `db`, or `None` if `db` does not exist.
    pub async fn tables(&self, db: &str) -> Option<Vec<String>> {
        self.catalogue
            .read()
            .await
            .get(db)
            .map(|tables| tables.iter().cloned().collect())
    }

    fn release(&self) {
        self.link.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for InMemoryCluster {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, ClusterError> {
        self.link.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.link.reachable.load(Ordering::SeqCst) {
            return Err(ClusterError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: "connection refused".into(),
            });
        }

        let now_open = self.link.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.link.peak.fetch_max(now_open, Ordering::SeqCst);
        trace!(%endpoint, open = now_open, "in-memory connection opened");

        Ok(Box::new(InMemoryConnection {
            cluster: self.clone(),
            open: true,
        }))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// A connection to an [`InMemoryCluster`].
#[derive(Debug)]
pub struct InMemoryConnection {
    cluster: InMemoryCluster,
    open: bool,
}

impl InMemoryConnection {
    /// Apply simulated latency, then check the link is still usable.
    async fn round_trip(&self) -> Result<(), ClusterError> {
        if !self.open {
            return Err(ClusterError::Closed);
        }

        let latency_ms = self.cluster.link.latency_ms.load(Ordering::SeqCst);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        if !self.cluster.link.reachable.load(Ordering::SeqCst) {
            return Err(ClusterError::Transport("connection reset by peer".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterConnection for InMemoryConnection {
    async fn db_list(&mut self) -> Result<Vec<String>, ClusterError> {
        self.round_trip().await?;
        Ok(self.cluster.databases().await)
    }

    async fn table_list(&mut self, db: &str) -> Result<Vec<String>, ClusterError> {
        self.round_trip().await?;
        self.cluster.tables(db).await.ok_or_else(|| ClusterError::NotFound {
            kind: ObjectKind::Database,
            name: db.to_owned(),
        })
    }

    async fn db_create(&mut self, name: &str) -> Result<Created, ClusterError> {
        self.round_trip().await?;
        let mut catalogue = self.cluster.catalogue.write().await;
        if catalogue.contains_key(name) {
            return Err(ClusterError::AlreadyExists {
                kind: ObjectKind::Database,
                name: name.to_owned(),
            });
        }
        catalogue.insert(name.to_owned(), BTreeSet::new());
        Ok(Created::ONE)
    }

    async fn db_drop(&mut self, name: &str) -> Result<Dropped, ClusterError> {
        self.round_trip().await?;
        let mut catalogue = self.cluster.catalogue.write().await;
        match catalogue.remove(name) {
            Some(_) => Ok(Dropped::ONE),
            None => Err(ClusterError::NotFound {
                kind: ObjectKind::Database,
                name: name.to_owned(),
            }),
        }
    }

    async fn table_create(&mut self, db: &str, name: &str) -> Result<Created, ClusterError> {
        self.round_trip().await?;
        let mut catalogue = self.cluster.catalogue.write().await;
        let tables = catalogue.get_mut(db).ok_or_else(|| ClusterError::NotFound {
            kind: ObjectKind::Database,
            name: db.to_owned(),
        })?;
        if !tables.insert(name.to_owned()) {
            return Err(ClusterError::AlreadyExists {
                kind: ObjectKind::Table,
                name: format!("{db}.{name}"),
            });
        }
        Ok(Created::ONE)
    }

    async fn close(&mut self) -> Result<(), ClusterError> {
        if !self.open {
            return Err(ClusterError::Closed);
        }
        self.open = false;
        self.cluster.release();
        Ok(())
    }
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.cluster.release();
        }
    }
}
