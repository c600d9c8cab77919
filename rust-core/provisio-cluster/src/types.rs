// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire-level value types shared by every transport.
//
// `Created` and `Dropped` are the confirmation payloads returned by schema
// changes. Their field names are part of the external contract and must
// serialize exactly as `{"created":1}` and `{"dropped":1}`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Network address of a cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Build an endpoint from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Confirmation payloads
// ---------------------------------------------------------------------------

/// Confirmation that a database or table was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    /// Number of objects created. Always `1` for a single create.
    pub created: u32,
}

impl Created {
    /// The confirmation for a single created object.
    pub const ONE: Created = Created { created: 1 };
}

/// Confirmation that a database was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropped {
    /// Number of objects dropped. Always `1` for a single drop.
    pub dropped: u32,
}

impl Dropped {
    /// The confirmation for a single dropped object.
    pub const ONE: Dropped = Dropped { dropped: 1 };
}

/// Request body naming a database or table to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Name of the object to create.
    pub name: String,
}

/// Error body returned by the HTTP gateway of a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}
