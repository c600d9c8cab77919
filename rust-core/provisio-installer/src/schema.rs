// SPDX-License-Identifier: PMPL-1.0-or-later
//! Schema creation and the one-shot install workflow.
//!
//! `install` creates the configured database, then dispatches one
//! `create_table` task per name without waiting between them. The database
//! create always finishes before the first table create starts; the table
//! creates finish in whatever order the cluster answers.
//!
//! Install is not atomic. A failed table create leaves the database and every
//! other table in place, and nothing is retried.

use futures::stream::{FuturesUnordered, StreamExt};
use provisio_cluster::{Created, Dropped, ObjectKind};
use tracing::{info, warn};

use crate::config::{check_name, ConfigError};
use crate::connection::ConnectionManager;
use crate::error::{ProvisionError, Result};

fn invalid_argument(e: ConfigError) -> ProvisionError {
    ProvisionError::InvalidArgument(e.to_string())
}

// ---------------------------------------------------------------------------
// InstallReport
// ---------------------------------------------------------------------------

/// A table create that failed during install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFailure {
    /// Table that could not be created.
    pub table: String,
    /// Why.
    pub error: ProvisionError,
}

/// Outcome of every table create issued by an install.
///
/// `created` and `failures` are both in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Database the tables were created in.
    pub database: String,
    /// Tables created successfully.
    pub created: Vec<String>,
    /// Tables that failed.
    pub failures: Vec<TableFailure>,
}

impl InstallReport {
    /// True if every table was created.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The first failure to complete, if any.
    pub fn first_error(&self) -> Option<&ProvisionError> {
        self.failures.first().map(|failure| &failure.error)
    }

    /// Every failure, in completion order.
    pub fn errors(&self) -> impl Iterator<Item = &ProvisionError> {
        self.failures.iter().map(|failure| &failure.error)
    }

    /// Reduce to first-error-wins: `Ok(true)` when everything was created,
    /// otherwise the first error to complete.
    pub fn into_result(self) -> Result<bool> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(true),
        }
    }
}

// ---------------------------------------------------------------------------
// SchemaInstaller
// ---------------------------------------------------------------------------

/// Creates and drops schema objects for one configuration.
#[derive(Debug, Clone)]
pub struct SchemaInstaller {
    manager: ConnectionManager,
}

impl SchemaInstaller {
    /// Create an installer that connects through `manager`.
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Create database `name`.
    ///
    /// Fails with [`ProvisionError::Duplicate`] if it already exists.
    pub async fn create_db(&self, name: &str) -> Result<Created> {
        check_name(ObjectKind::Database, name).map_err(invalid_argument)?;

        let db = name.to_owned();
        let created = self
            .manager
            .with_connection(|conn| Box::pin(async move { Ok(conn.db_create(&db).await?) }))
            .await?;
        info!(db = name, "created database");
        Ok(created)
    }

    /// Drop database `name` with all its tables.
    ///
    /// Fails with [`ProvisionError::NotFound`] if it does not exist.
    pub async fn drop_db(&self, name: &str) -> Result<Dropped> {
        check_name(ObjectKind::Database, name).map_err(invalid_argument)?;

        let db = name.to_owned();
        let dropped = self
            .manager
            .with_connection(|conn| Box::pin(async move { Ok(conn.db_drop(&db).await?) }))
            .await?;
        info!(db = name, "dropped database");
        Ok(dropped)
    }

    /// Create table `name` in the configured database.
    ///
    /// Fails with [`ProvisionError::Duplicate`] if it already exists.
    pub async fn create_table(&self, name: &str) -> Result<Created> {
        check_name(ObjectKind::Table, name).map_err(invalid_argument)?;

        let db = self.manager.config().db().to_owned();
        let table = name.to_owned();
        let created = self
            .manager
            .with_connection(|conn| {
                Box::pin(async move { Ok(conn.table_create(&db, &table).await?) })
            })
            .await?;
        info!(db = self.manager.config().db(), table = name, "created table");
        Ok(created)
    }

    /// Create the configured database and every table in `tables`.
    ///
    /// Returns `Ok(true)` when everything was created. Otherwise returns the
    /// first error to complete; the remaining creates still run to the end.
    /// Use [`install_report`](Self::install_report) to see every outcome.
    pub async fn install<S: AsRef<str>>(&self, tables: &[S]) -> Result<bool> {
        self.install_report(tables).await?.into_result()
    }

    /// Create the configured database and every table in `tables`, reporting
    /// the outcome of each table create.
    ///
    /// Fails without touching the network if `tables` is empty or holds a name
    /// the store would reject. Fails before any table is attempted if the
    /// database create fails. Duplicate names are not collapsed: each one is
    /// its own create.
    pub async fn install_report<S: AsRef<str>>(&self, tables: &[S]) -> Result<InstallReport> {
        if tables.is_empty() {
            return Err(ProvisionError::InvalidArgument(
                "install needs at least one table name".into(),
            ));
        }
        for table in tables {
            check_name(ObjectKind::Table, table.as_ref()).map_err(invalid_argument)?;
        }

        let db = self.manager.config().db().to_owned();
        info!(%db, tables = tables.len(), "installing schema");
        self.create_db(&db).await?;

        // Spawned tasks are detached, not aborted, if this future is dropped.
        let mut pending = FuturesUnordered::new();
        for table in tables {
            let installer = self.clone();
            let table = table.as_ref().to_owned();
            let task_table = table.clone();
            let handle = tokio::spawn(async move { installer.create_table(&task_table).await });
            pending.push(async move { (table, handle.await) });
        }

        let mut report = InstallReport {
            database: db,
            created: Vec::with_capacity(tables.len()),
            failures: Vec::new(),
        };
        while let Some((table, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| Err(ProvisionError::Task(e.to_string())));
            match outcome {
                Ok(_) => report.created.push(table),
                Err(error) => {
                    warn!(db = %report.database, %table, %error, "table create failed");
                    report.failures.push(TableFailure { table, error });
                }
            }
        }

        info!(
            db = %report.database,
            created = report.created.len(),
            failed = report.failures.len(),
            "install finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectOptions;
    use async_trait::async_trait;
    use provisio_cluster::{
        ClusterConnection, ClusterError, Connection, Connector, Endpoint, InMemoryCluster,
        MeteredConnector,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn installer(cluster: &InMemoryCluster) -> SchemaInstaller {
        let config = Arc::new(ConnectOptions::new("test").validate().unwrap());
        SchemaInstaller::new(ConnectionManager::new(config, Arc::new(cluster.clone())))
    }

    #[tokio::test]
    async fn test_create_and_drop_db() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        assert_eq!(installer.create_db("test").await.unwrap(), Created::ONE);
        let err = installer.create_db("test").await.unwrap_err();
        assert_eq!(
            err,
            ProvisionError::Duplicate {
                kind: ObjectKind::Database,
                name: "test".into()
            }
        );

        assert_eq!(installer.drop_db("test").await.unwrap(), Dropped::ONE);
        assert!(installer.drop_db("test").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_table_in_configured_db() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        // The database must exist first.
        let err = installer.create_table("foo").await.unwrap_err();
        assert!(err.is_not_found());

        installer.create_db("test").await.unwrap();
        assert_eq!(installer.create_table("foo").await.unwrap(), Created::ONE);
        assert!(installer.create_table("foo").await.unwrap_err().is_duplicate());
        assert_eq!(cluster.tables("test").await, Some(vec!["foo".to_string()]));
    }

    #[tokio::test]
    async fn test_invalid_names_rejected_locally() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        assert!(matches!(
            installer.create_db("no spaces").await.unwrap_err(),
            ProvisionError::InvalidArgument(_)
        ));
        assert!(matches!(
            installer.create_table("a.b").await.unwrap_err(),
            ProvisionError::InvalidArgument(_)
        ));
        assert!(matches!(
            installer.drop_db("").await.unwrap_err(),
            ProvisionError::InvalidArgument(_)
        ));
        assert!(matches!(
            installer.drop_db("../test").await.unwrap_err(),
            ProvisionError::InvalidArgument(_)
        ));
        assert_eq!(cluster.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_install_empty_rejected() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        let err = installer.install::<&str>(&[]).await.unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidArgument(_)));
        assert_eq!(cluster.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_install_invalid_name_rejected_before_network() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        let err = installer.install(&["good", "not good"]).await.unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidArgument(_)));
        assert_eq!(cluster.connect_attempts(), 0);
        assert!(cluster.databases().await.is_empty());
    }

    #[tokio::test]
    async fn test_install_creates_everything() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        assert!(installer.install(&["foo", "bar"]).await.unwrap());
        assert_eq!(cluster.databases().await, vec!["test".to_string()]);
        assert_eq!(
            cluster.tables("test").await,
            Some(vec!["bar".to_string(), "foo".to_string()])
        );
        assert_eq!(cluster.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_install_stops_when_db_create_fails() {
        let metered = Arc::new(MeteredConnector::new(InMemoryCluster::new()));
        let config = Arc::new(ConnectOptions::new("test").validate().unwrap());
        let installer = SchemaInstaller::new(ConnectionManager::new(config, metered.clone()));

        installer.create_db("test").await.unwrap();
        let err = installer.install(&["foo", "bar"]).await.unwrap_err();

        assert_eq!(
            err,
            ProvisionError::Duplicate {
                kind: ObjectKind::Database,
                name: "test".into()
            }
        );
        assert_eq!(metered.stats().await.table_create_count, 0);
        assert_eq!(metered.inner().tables("test").await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_install_unreachable() {
        let cluster = InMemoryCluster::new();
        cluster.set_reachable(false);
        let installer = installer(&cluster);

        let err = installer.install(&["foo"]).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Connection(_)));
    }

    #[tokio::test]
    async fn test_duplicate_names_in_one_install() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        let report = installer.install_report(&["a", "a"]).await.unwrap();
        assert_eq!(report.created, vec!["a".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].table, "a");
        assert_eq!(
            report.failures[0].error,
            ProvisionError::Duplicate {
                kind: ObjectKind::Table,
                name: "test.a".into()
            }
        );
        assert_eq!(cluster.tables("test").await, Some(vec!["a".to_string()]));

        // First-error-wins over the same outcome.
        cluster_reset(&cluster).await;
        let err = installer.install(&["a", "a"]).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(cluster.tables("test").await, Some(vec!["a".to_string()]));
    }

    async fn cluster_reset(cluster: &InMemoryCluster) {
        let mut conn = cluster.connect(&Endpoint::new("reset", 0)).await.unwrap();
        for db in conn.db_list().await.unwrap() {
            conn.db_drop(&db).await.unwrap();
        }
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_tables() {
        let cluster = InMemoryCluster::new();
        let installer = installer(&cluster);

        let report = installer.install_report(&["a", "a", "b", "b", "c"]).await.unwrap();
        assert!(!report.is_success());
        assert_eq!(report.database, "test");
        assert_eq!(report.created.len(), 3);
        assert_eq!(report.failures.len(), 2);
        assert!(report.errors().all(ProvisionError::is_duplicate));
        assert_eq!(report.first_error(), Some(&report.failures[0].error));

        // Nothing is rolled back.
        assert_eq!(
            cluster.tables("test").await,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_creates_run_concurrently() {
        let cluster = InMemoryCluster::new();
        cluster.set_latency(Duration::from_millis(100));
        let installer = installer(&cluster);

        let names = ["t1", "t2", "t3", "t4", "t5", "t6"];
        let start = tokio::time::Instant::now();
        assert!(installer.install(&names).await.unwrap());

        // One round trip for the database, one for all tables together.
        assert!(start.elapsed() < Duration::from_millis(100) * 3);
        assert_eq!(cluster.peak_connections(), names.len());
        assert_eq!(cluster.open_connections(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_limit_bounds_fan_out() {
        let cluster = InMemoryCluster::new();
        cluster.set_latency(Duration::from_millis(100));
        let options = ConnectOptions::new("test").max_connections(2);
        let config = Arc::new(options.validate().unwrap());
        let installer =
            SchemaInstaller::new(ConnectionManager::new(config, Arc::new(cluster.clone())));

        assert!(installer.install(&["a", "b", "c", "d"]).await.unwrap());
        assert_eq!(cluster.peak_connections(), 2);
        assert_eq!(cluster.tables("test").await.map(|t| t.len()), Some(4));
    }

    type ClusterResult<T> = std::result::Result<T, ClusterError>;

    /// Cluster whose connections crash while creating one particular table.
    struct CrashingCluster {
        inner: InMemoryCluster,
        crash_on: &'static str,
    }

    struct CrashingConnection {
        inner: Connection,
        crash_on: &'static str,
    }

    #[async_trait]
    impl Connector for CrashingCluster {
        async fn connect(&self, endpoint: &Endpoint) -> ClusterResult<Connection> {
            let inner = self.inner.connect(endpoint).await?;
            Ok(Box::new(CrashingConnection {
                inner,
                crash_on: self.crash_on,
            }))
        }

        fn name(&self) -> &str {
            "crashing"
        }
    }

    #[async_trait]
    impl ClusterConnection for CrashingConnection {
        async fn db_list(&mut self) -> ClusterResult<Vec<String>> {
            self.inner.db_list().await
        }

        async fn table_list(&mut self, db: &str) -> ClusterResult<Vec<String>> {
            self.inner.table_list(db).await
        }

        async fn db_create(&mut self, name: &str) -> ClusterResult<Created> {
            self.inner.db_create(name).await
        }

        async fn db_drop(&mut self, name: &str) -> ClusterResult<Dropped> {
            self.inner.db_drop(name).await
        }

        async fn table_create(&mut self, db: &str, name: &str) -> ClusterResult<Created> {
            if name == self.crash_on {
                panic!("connection crashed creating {db}.{name}");
            }
            self.inner.table_create(db, name).await
        }

        async fn close(&mut self) -> ClusterResult<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn test_panicking_create_reported_as_task_error() {
        let cluster = InMemoryCluster::new();
        let crashing = CrashingCluster {
            inner: cluster.clone(),
            crash_on: "boom",
        };
        let config = Arc::new(ConnectOptions::new("test").validate().unwrap());
        let installer = SchemaInstaller::new(ConnectionManager::new(config, Arc::new(crashing)));

        let report = installer.install_report(&["ok", "boom"]).await.unwrap();
        assert_eq!(report.created, vec!["ok".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].table, "boom");
        assert!(matches!(report.failures[0].error, ProvisionError::Task(_)));

        // The crashed task still gave its connection back.
        assert_eq!(cluster.tables("test").await, Some(vec!["ok".to_string()]));
        assert_eq!(cluster.open_connections(), 0);
    }

    #[test]
    fn test_report_into_result() {
        let ok = InstallReport {
            database: "test".into(),
            created: vec!["a".into()],
            failures: Vec::new(),
        };
        assert!(ok.is_success());
        assert_eq!(ok.into_result(), Ok(true));

        let failed = InstallReport {
            database: "test".into(),
            created: Vec::new(),
            failures: vec![
                TableFailure {
                    table: "a".into(),
                    error: ProvisionError::Task("first".into()),
                },
                TableFailure {
                    table: "b".into(),
                    error: ProvisionError::Task("second".into()),
                },
            ],
        };
        assert_eq!(failed.errors().count(), 2);
        assert_eq!(
            failed.into_result(),
            Err(ProvisionError::Task("first".into()))
        );
    }
}
