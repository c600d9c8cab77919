// SPDX-License-Identifier: PMPL-1.0-or-later
//! Existence checks.
//!
//! The probe lists what the cluster currently holds and tests membership.
//! "Not there" is a normal `false`, never an error: only link failures
//! propagate.

use provisio_cluster::{ClusterError, ObjectKind};
use tracing::debug;

use crate::connection::ConnectionManager;
use crate::error::Result;

/// Read-only view of the cluster catalogue for one configuration.
#[derive(Debug, Clone)]
pub struct ExistenceProbe {
    manager: ConnectionManager,
}

impl ExistenceProbe {
    /// Create a probe that connects through `manager`.
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Names of every database on the cluster.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        self.manager
            .with_connection(|conn| Box::pin(async move { Ok(conn.db_list().await?) }))
            .await
    }

    /// Names of every table in the configured database.
    ///
    /// An absent database has no tables, so this returns an empty list rather
    /// than an error.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let db = self.manager.config().db().to_owned();
        self.manager
            .with_connection(|conn| {
                Box::pin(async move {
                    match conn.table_list(&db).await {
                        Ok(tables) => Ok(tables),
                        Err(ClusterError::NotFound {
                            kind: ObjectKind::Database,
                            ..
                        }) => {
                            debug!(%db, "configured database absent; no tables");
                            Ok(Vec::new())
                        }
                        Err(e) => Err(e.into()),
                    }
                })
            })
            .await
    }

    /// Whether a database called `name` exists.
    pub async fn db_exists(&self, name: &str) -> Result<bool> {
        let databases = self.list_databases().await?;
        Ok(databases.iter().any(|db| db == name))
    }

    /// Whether a table called `name` exists in the configured database.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.list_tables().await?;
        Ok(tables.iter().any(|table| table == name))
    }
}
