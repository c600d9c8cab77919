// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core connector traits for Provisio.
//
// A `Connector` dials a cluster and yields a `ClusterConnection`, the
// exclusively owned, short-lived handle every schema operation runs on. The
// connection exposes exactly the RPCs provisioning needs: list databases,
// list tables, create and drop databases, and create tables.

use async_trait::async_trait;

use crate::error::ClusterError;
use crate::types::{Created, Dropped, Endpoint};

/// An open connection owned by a single operation.
pub type Connection = Box<dyn ClusterConnection>;

/// Dials a cluster.
///
/// Implementations must be safe to share across threads and tokio tasks: one
/// connector serves every operation of an installer, including concurrent
/// fan-out.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection to `endpoint`.
    ///
    /// Returns [`ClusterError::Unreachable`] when the node cannot be reached.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, ClusterError>;

    /// A human-readable name for this transport, used in logging.
    fn name(&self) -> &str;
}

/// A live connection to a cluster.
///
/// Listing calls are read-only. Create and drop calls report conflicts through
/// [`ClusterError::AlreadyExists`] and [`ClusterError::NotFound`].
///
/// Dropping a connection releases it even if [`close`](Self::close) was never
/// awaited; `close` exists so orderly shutdown can report errors.
#[async_trait]
pub trait ClusterConnection: Send {
    /// Names of every database visible to this connection.
    async fn db_list(&mut self) -> Result<Vec<String>, ClusterError>;

    /// Names of every table in database `db`.
    ///
    /// Returns [`ClusterError::NotFound`] if `db` does not exist.
    async fn table_list(&mut self, db: &str) -> Result<Vec<String>, ClusterError>;

    /// Create database `name`.
    async fn db_create(&mut self, name: &str) -> Result<Created, ClusterError>;

    /// Drop database `name` and every table in it.
    async fn db_drop(&mut self, name: &str) -> Result<Dropped, ClusterError>;

    /// Create table `name` inside database `db`.
    async fn table_create(&mut self, db: &str, name: &str) -> Result<Created, ClusterError>;

    /// Close the connection. Further calls fail with [`ClusterError::Closed`].
    async fn close(&mut self) -> Result<(), ClusterError>;
}
