// SPDX-License-Identifier: PMPL-1.0-or-later
//! Installer error types.
//!
//! [`ProvisionError`] is the taxonomy callers branch on. Store-level
//! [`ClusterError`]s are folded into it: conflicts become `Duplicate`, missing
//! objects become `NotFound`, and everything that went wrong on the link
//! becomes `Connection`.

use provisio_cluster::{ClusterError, ObjectKind};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by installer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// Configuration was rejected before any network call.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The cluster could not be reached or the link failed.
    #[error("connection error: {0}")]
    Connection(#[source] ClusterError),

    /// A create targeted an object that already exists.
    #[error("{kind} `{name}` already exists")]
    Duplicate {
        /// Database or table.
        kind: ObjectKind,
        /// Name as reported by the store.
        name: String,
    },

    /// A drop targeted an object that does not exist.
    #[error("{kind} `{name}` does not exist")]
    NotFound {
        /// Database or table.
        kind: ObjectKind,
        /// Name as reported by the store.
        name: String,
    },

    /// The caller passed arguments the operation cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A fanned-out task ended without producing a result.
    #[error("task failed: {0}")]
    Task(String),
}

impl From<ClusterError> for ProvisionError {
    fn from(e: ClusterError) -> Self {
        match e {
            ClusterError::AlreadyExists { kind, name } => ProvisionError::Duplicate { kind, name },
            ClusterError::NotFound { kind, name } => ProvisionError::NotFound { kind, name },
            other => ProvisionError::Connection(other),
        }
    }
}

impl ProvisionError {
    /// True for [`ProvisionError::Duplicate`].
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ProvisionError::Duplicate { .. })
    }

    /// True for [`ProvisionError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProvisionError::NotFound { .. })
    }
}

/// Crate-level result alias using [`ProvisionError`].
pub type Result<T> = std::result::Result<T, ProvisionError>;
