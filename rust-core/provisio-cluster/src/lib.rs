// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Provisio Cluster Abstraction
//
// This crate is the boundary between Provisio and the clustered document
// store it provisions. The store itself is an external collaborator; all
// Provisio needs from it is a handful of catalogue RPCs, captured by the
// `Connector` and `ClusterConnection` traits.
//
// # Modules
//
// - [`connector`] -- The `Connector` / `ClusterConnection` traits.
// - [`error`] -- The `ClusterError` enum covering all transport failure modes.
// - [`types`] -- Endpoints and the `{created:1}` / `{dropped:1}` payloads.
// - [`memory`] -- A process-local cluster for testing and embedded use.
// - [`metrics`] -- A transparent wrapper that collects RPC statistics.
// - [`http`] -- JSON-over-HTTP transport (feature `http-transport`).
//
// # Example
//
// ```rust
// use provisio_cluster::{Connector, Endpoint, InMemoryCluster, MeteredConnector};
//
// # tokio_test::block_on(async {
// let cluster = InMemoryCluster::new();
// let metered = MeteredConnector::new(cluster.clone());
//
// let mut conn = metered.connect(&Endpoint::new("localhost", 28015)).await.unwrap();
// conn.db_create("test").await.unwrap();
// conn.table_create("test", "foo").await.unwrap();
// conn.close().await.unwrap();
//
// assert_eq!(cluster.tables("test").await, Some(vec!["foo".to_string()]));
// assert_eq!(metered.stats().await.rpc_count(), 2);
// # });
// ```

pub mod connector;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod types;

#[cfg(feature = "http-transport")]
pub mod http;

// Re-export the most commonly used types at the crate root for convenience.
pub use connector::{ClusterConnection, Connection, Connector};
pub use error::{ClusterError, ObjectKind};
pub use memory::InMemoryCluster;
pub use metrics::{ConnectorStats, MeteredConnector};
pub use types::{Created, Dropped, Endpoint};

#[cfg(feature = "http-transport")]
pub use http::HttpConnector;
