// SPDX-License-Identifier: PMPL-1.0-or-later
//! The connected installer.
//!
//! [`Installer::connect`] validates the options, probes the configured
//! database and captures its tables into a [`TableRegistry`]. The resulting
//! value exposes the whole operation set for that one configuration.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use provisio_cluster::{Connection, Connector, Created, Dropped};
use tracing::info;

use crate::config::{Config, ConnectOptions};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::probe::ExistenceProbe;
use crate::registry::{TableHandle, TableRegistry};
use crate::schema::{InstallReport, SchemaInstaller};

/// An installer bound to one configuration.
///
/// Each operation opens and releases its own connection. Two installers
/// targeting the same database do not coordinate; conflicting changes surface
/// as ordinary `Duplicate` or `NotFound` errors.
#[derive(Debug)]
pub struct Installer {
    config: Arc<Config>,
    manager: ConnectionManager,
    probe: ExistenceProbe,
    schema: SchemaInstaller,
    registry: TableRegistry,
}

impl Installer {
    /// Validate `options`, reach the cluster through `connector` and snapshot
    /// the configured database's tables.
    ///
    /// Fails with [`ProvisionError::Config`](crate::ProvisionError::Config)
    /// before any network call when the options are invalid, and with
    /// [`ProvisionError::Connection`](crate::ProvisionError::Connection) when
    /// the cluster cannot be reached. A database that does not exist yet
    /// yields an empty snapshot.
    pub async fn connect(options: &ConnectOptions, connector: Arc<dyn Connector>) -> Result<Self> {
        let config = Arc::new(options.validate()?);
        let manager = ConnectionManager::new(Arc::clone(&config), connector);
        let probe = ExistenceProbe::new(manager.clone());
        let schema = SchemaInstaller::new(manager.clone());

        let tables = probe.list_tables().await?;
        let registry = TableRegistry::capture(&config, tables, Utc::now());
        info!(
            endpoint = %config.endpoint(),
            db = config.db(),
            tables = registry.len(),
            transport = manager.transport(),
            "installer connected"
        );

        Ok(Self {
            config,
            manager,
            probe,
            schema,
            registry,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    // -- Table registry -----------------------------------------------------

    /// Tables that existed when the snapshot was taken.
    pub fn tables(&self) -> &TableRegistry {
        &self.registry
    }

    /// Handle for table `name`, if it was in the snapshot.
    pub fn table(&self, name: &str) -> Option<&TableHandle> {
        self.registry.get(name)
    }

    /// Re-probe the configured database and replace the snapshot.
    pub async fn refresh_tables(&mut self) -> Result<&TableRegistry> {
        let tables = self.probe.list_tables().await?;
        self.registry = TableRegistry::capture(&self.config, tables, Utc::now());
        Ok(&self.registry)
    }

    // -- Existence checks ---------------------------------------------------

    /// Whether database `name` exists.
    pub async fn db_exists(&self, name: &str) -> Result<bool> {
        self.probe.db_exists(name).await
    }

    /// Whether table `name` exists in the configured database.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        self.probe.table_exists(name).await
    }

    /// Every database on the cluster.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        self.probe.list_databases().await
    }

    /// Every table in the configured database.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.probe.list_tables().await
    }

    // -- Schema changes -----------------------------------------------------

    /// Create database `name`.
    pub async fn create_db(&self, name: &str) -> Result<Created> {
        self.schema.create_db(name).await
    }

    /// Drop database `name`.
    pub async fn drop_db(&self, name: &str) -> Result<Dropped> {
        self.schema.drop_db(name).await
    }

    /// Create table `name` in the configured database.
    pub async fn create_table(&self, name: &str) -> Result<Created> {
        self.schema.create_table(name).await
    }

    /// Create the configured database and `tables`; first error wins.
    pub async fn install<S: AsRef<str>>(&self, tables: &[S]) -> Result<bool> {
        self.schema.install(tables).await
    }

    /// Create the configured database and `tables`, reporting every outcome.
    pub async fn install_report<S: AsRef<str>>(&self, tables: &[S]) -> Result<InstallReport> {
        self.schema.install_report(tables).await
    }

    // -- Raw access ---------------------------------------------------------

    /// Run `op` on a fresh connection, released afterwards.
    pub async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Connection) -> BoxFuture<'c, Result<T>>,
    {
        self.manager.with_connection(op).await
    }
}
