// SPDX-License-Identifier: PMPL-1.0-or-later
//! Connection lifecycle.
//!
//! Every installer operation opens its own short-lived connection through the
//! [`ConnectionManager`] and releases it before returning, whatever the
//! outcome. Connections are never pooled or shared between operations; an
//! optional semaphore caps how many may be open at once.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use futures::future::BoxFuture;
use provisio_cluster::{ClusterError, Connection, Connector};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ProvisionError, Result};

/// Opens and releases cluster connections for one configuration.
///
/// Cloning is cheap: the configuration, connector and connection limit are
/// shared, so clones handed to concurrent tasks draw from the same limit.
#[derive(Clone)]
pub struct ConnectionManager {
    config: Arc<Config>,
    connector: Arc<dyn Connector>,
    permits: Option<Arc<Semaphore>>,
}

impl ConnectionManager {
    /// Create a manager dialling `config`'s endpoint through `connector`.
    pub fn new(config: Arc<Config>, connector: Arc<dyn Connector>) -> Self {
        let permits = config
            .max_connections()
            .map(|limit| Arc::new(Semaphore::new(limit)));
        Self {
            config,
            connector,
            permits,
        }
    }

    /// The configuration this manager connects with.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Name of the underlying transport.
    pub fn transport(&self) -> &str {
        self.connector.name()
    }

    /// Open a connection.
    ///
    /// Waits for a free slot when a connection limit is configured. Fails with
    /// [`ProvisionError::Connection`] if the cluster cannot be reached.
    pub async fn open(&self) -> Result<ScopedConnection> {
        let permit = match &self.permits {
            Some(permits) => Some(
                Arc::clone(permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| ProvisionError::Connection(ClusterError::Closed))?,
            ),
            None => None,
        };

        let endpoint = self.config.endpoint();
        let conn = self
            .connector
            .connect(&endpoint)
            .await
            .map_err(ProvisionError::Connection)?;
        debug!(%endpoint, transport = self.connector.name(), "opened cluster connection");

        Ok(ScopedConnection {
            conn,
            _permit: permit,
        })
    }

    /// Run `op` on a fresh connection and release it afterwards.
    ///
    /// The connection is closed whether `op` succeeds or fails, and dropped
    /// (which also releases it) if `op` panics.
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use provisio_cluster::InMemoryCluster;
    /// # use provisio_installer::{ConnectOptions, ConnectionManager};
    /// # tokio_test::block_on(async {
    /// let cluster = InMemoryCluster::new();
    /// let config = Arc::new(ConnectOptions::new("test").validate().unwrap());
    /// let manager = ConnectionManager::new(config, Arc::new(cluster.clone()));
    ///
    /// let dbs = manager
    ///     .with_connection(|conn| Box::pin(async move { Ok(conn.db_list().await?) }))
    ///     .await
    ///     .unwrap();
    /// assert!(dbs.is_empty());
    /// assert_eq!(cluster.open_connections(), 0);
    /// # });
    /// ```
    pub async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Connection) -> BoxFuture<'c, Result<T>>,
    {
        let mut scoped = self.open().await?;
        let result = op(&mut scoped.conn).await;
        scoped.release().await;
        result
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("transport", &self.connector.name())
            .finish()
    }
}

/// A connection plus the slot it occupies under the connection limit.
///
/// Dropping it releases both; [`release`](Self::release) closes the
/// connection first so close failures get logged.
pub struct ScopedConnection {
    conn: Connection,
    _permit: Option<OwnedSemaphorePermit>,
}

impl ScopedConnection {
    /// Close the connection and free its slot.
    ///
    /// A failed close is logged and otherwise ignored: the operation's own
    /// result has already been decided.
    pub async fn release(mut self) {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "failed to close cluster connection");
        }
    }
}

impl Deref for ScopedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
