// SPDX-License-Identifier: PMPL-1.0-or-later
//! Provisio Installer
//!
//! Provisions one database and a named set of tables on a clustered document
//! store, and hands back a handle per table.
//!
//! ## Components
//!
//! - [`config`]: `ConnectOptions` in, validated `Config` out.
//! - [`connection`]: scoped, always-released connections.
//! - [`probe`]: database and table existence checks.
//! - [`schema`]: create/drop and the concurrent `install` workflow.
//! - [`registry`]: table handles snapshotted at connect time.
//! - [`installer`]: the connected `Installer` tying them together.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use provisio_cluster::InMemoryCluster;
//! use provisio_installer::{ConnectOptions, Installer};
//!
//! # tokio_test::block_on(async {
//! let cluster = InMemoryCluster::new();
//! let options = ConnectOptions::new("app");
//!
//! let installer = Installer::connect(&options, Arc::new(cluster.clone())).await.unwrap();
//! assert!(installer.install(&["users", "orders"]).await.unwrap());
//! assert!(installer.table_exists("users").await.unwrap());
//!
//! // The snapshot predates the install; reconnect to see the new tables.
//! assert!(installer.table("users").is_none());
//! let installer = Installer::connect(&options, Arc::new(cluster)).await.unwrap();
//! assert_eq!(installer.table("users").unwrap().db(), "app");
//! # });
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod installer;
pub mod probe;
pub mod registry;
pub mod schema;

pub use config::{Config, ConfigError, ConnectOptions, DEFAULT_HOST, DEFAULT_PORT};
pub use connection::{ConnectionManager, ScopedConnection};
pub use error::{ProvisionError, Result};
pub use installer::Installer;
pub use probe::ExistenceProbe;
pub use registry::{TableHandle, TableRegistry};
pub use schema::{InstallReport, SchemaInstaller, TableFailure};
