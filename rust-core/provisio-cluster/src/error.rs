// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cluster error types for the Provisio RPC abstraction.
//
// Every transport reports failures through `ClusterError`. Callers that need
// to branch on "already exists" or "does not exist" match on the structured
// variants; everything else is a connectivity or protocol problem.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of schema object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A database namespace.
    Database,
    /// A table inside a database.
    Table,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Database => f.write_str("Database"),
            ObjectKind::Table => f.write_str("Table"),
        }
    }
}

/// Errors that can occur when talking to a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// The cluster could not be reached while opening a connection.
    #[error("could not connect to {endpoint}: {reason}")]
    Unreachable {
        /// `host:port` that was dialled.
        endpoint: String,
        /// Transport-level reason.
        reason: String,
    },

    /// An established connection failed mid-operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// A create targeted an object that already exists.
    #[error("{kind} `{name}` already exists")]
    AlreadyExists {
        /// Database or table.
        kind: ObjectKind,
        /// Fully qualified name (`db` or `db.table`).
        name: String,
    },

    /// A drop or lookup targeted an object that does not exist.
    #[error("{kind} `{name}` does not exist")]
    NotFound {
        /// Database or table.
        kind: ObjectKind,
        /// Fully qualified name (`db` or `db.table`).
        name: String,
    },

    /// The cluster answered with an error the client has no mapping for.
    #[error("server error ({status}): {message}")]
    Server {
        /// Status code reported by the cluster.
        status: u16,
        /// Message body reported by the cluster.
        message: String,
    },

    /// The cluster answered with something the client could not decode.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection was already closed.
    #[error("connection is closed")]
    Closed,
}

impl ClusterError {
    /// True for failures of the link itself rather than of the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ClusterError::Unreachable { .. } | ClusterError::Transport(_) | ClusterError::Closed
        )
    }
}
