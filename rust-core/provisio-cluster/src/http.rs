// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! JSON-over-HTTP transport.
//!
//! [`HttpConnector`] reaches a cluster node through its HTTP gateway. Opening a
//! connection performs a `GET /health` handshake; the schema RPCs map onto
//! these routes:
//!
//! | RPC            | Route                          |
//! |----------------|--------------------------------|
//! | `db_list`      | `GET    /dbs`                  |
//! | `db_create`    | `POST   /dbs`                  |
//! | `db_drop`      | `DELETE /dbs/{name}`           |
//! | `table_list`   | `GET    /dbs/{db}/tables`      |
//! | `table_create` | `POST   /dbs/{db}/tables`      |
//!
//! `404` maps to [`ClusterError::NotFound`], `409` to
//! [`ClusterError::AlreadyExists`], other non-2xx statuses to
//! [`ClusterError::Server`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::connector::{ClusterConnection, Connection, Connector};
use crate::error::{ClusterError, ObjectKind};
use crate::types::{CreateRequest, Created, Dropped, Endpoint, ErrorResponse};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// HttpConnector
// ---------------------------------------------------------------------------

/// Dials cluster nodes over HTTP.
///
/// The underlying `reqwest` client is pooled and shared by every connection
/// this connector opens.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpConnector {
    /// Create a connector with the default timeout.
    pub fn new() -> Result<Self, ClusterError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a connector whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ClusterError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClusterError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, timeout })
    }

    /// Return the configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Base URL of the HTTP gateway on `endpoint`.
fn base_url(endpoint: &Endpoint) -> Result<Url, ClusterError> {
    Url::parse(&format!("http://{}:{}/", endpoint.host, endpoint.port)).map_err(|e| {
        ClusterError::Unreachable {
            endpoint: endpoint.to_string(),
            reason: format!("invalid address: {e}"),
        }
    })
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, ClusterError> {
        let base_url = base_url(endpoint)?;
        let unreachable = |reason: String| ClusterError::Unreachable {
            endpoint: endpoint.to_string(),
            reason,
        };

        let health = base_url
            .join("health")
            .map_err(|e| unreachable(e.to_string()))?;
        let response = self
            .http
            .get(health)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unreachable(format!(
                "health check returned HTTP {}",
                response.status().as_u16()
            )));
        }

        debug!(%endpoint, "HTTP cluster connection established");
        Ok(Box::new(HttpConnection {
            base_url: Some(base_url),
            http: self.http.clone(),
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// HttpConnection
// ---------------------------------------------------------------------------

/// A connection to one cluster node's HTTP gateway.
#[derive(Debug)]
pub struct HttpConnection {
    /// `None` once closed.
    base_url: Option<Url>,
    http: reqwest::Client,
}

/// What a request is about, for mapping 404/409 onto structured errors.
struct Subject<'a> {
    kind: ObjectKind,
    name: &'a str,
}

impl HttpConnection {
    /// Build a full URL from path segments, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ClusterError> {
        let mut url = self.base_url.clone().ok_or(ClusterError::Closed)?;
        url.path_segments_mut()
            .map_err(|_| ClusterError::Protocol("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Perform a GET request and deserialize the JSON response body.
    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        subject: Subject<'_>,
    ) -> Result<T, ClusterError> {
        let url = self.url(segments)?;
        let response = self.http.get(url).send().await.map_err(transport)?;
        handle_response(response, subject).await
    }

    /// Perform a POST request with a JSON body and deserialize the response.
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
        subject: Subject<'_>,
    ) -> Result<T, ClusterError> {
        let url = self.url(segments)?;
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        handle_response(response, subject).await
    }

    /// Perform a DELETE request and deserialize the response.
    async fn delete<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        subject: Subject<'_>,
    ) -> Result<T, ClusterError> {
        let url = self.url(segments)?;
        let response = self.http.delete(url).send().await.map_err(transport)?;
        handle_response(response, subject).await
    }
}

#[async_trait]
impl ClusterConnection for HttpConnection {
    async fn db_list(&mut self) -> Result<Vec<String>, ClusterError> {
        let subject = Subject {
            kind: ObjectKind::Database,
            name: "",
        };
        self.get(&["dbs"], subject).await
    }

    async fn table_list(&mut self, db: &str) -> Result<Vec<String>, ClusterError> {
        let subject = Subject {
            kind: ObjectKind::Database,
            name: db,
        };
        self.get(&["dbs", db, "tables"], subject).await
    }

    async fn db_create(&mut self, name: &str) -> Result<Created, ClusterError> {
        let body = CreateRequest {
            name: name.to_owned(),
        };
        let subject = Subject {
            kind: ObjectKind::Database,
            name,
        };
        self.post(&["dbs"], &body, subject).await
    }

    async fn db_drop(&mut self, name: &str) -> Result<Dropped, ClusterError> {
        let subject = Subject {
            kind: ObjectKind::Database,
            name,
        };
        self.delete(&["dbs", name], subject).await
    }

    async fn table_create(&mut self, db: &str, name: &str) -> Result<Created, ClusterError> {
        let body = CreateRequest {
            name: name.to_owned(),
        };
        // A 404 here means the database is missing; a 409 names the table.
        let qualified = format!("{db}.{name}");
        let response = self
            .http
            .post(self.url(&["dbs", db, "tables"])?)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        match response.status().as_u16() {
            404 => Err(ClusterError::NotFound {
                kind: ObjectKind::Database,
                name: db.to_owned(),
            }),
            _ => {
                let subject = Subject {
                    kind: ObjectKind::Table,
                    name: &qualified,
                };
                handle_response(response, subject).await
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClusterError> {
        // The pooled HTTP client keeps sockets alive; closing only retires the handle.
        match self.base_url.take() {
            Some(_) => Ok(()),
            None => Err(ClusterError::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

fn transport(e: reqwest::Error) -> ClusterError {
    ClusterError::Transport(e.to_string())
}

/// Deserialize a successful response or turn the error body into a [`ClusterError`].
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    subject: Subject<'_>,
) -> Result<T, ClusterError> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await.map_err(transport)?;
        serde_json::from_str(&body).map_err(|e| ClusterError::Protocol(e.to_string()))
    } else {
        Err(extract_error(response, subject).await)
    }
}

/// Turn a non-2xx response into the appropriate [`ClusterError`] variant.
async fn extract_error(response: reqwest::Response, subject: Subject<'_>) -> ClusterError {
    let status = response.status().as_u16();

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => format!("HTTP {status}"),
    };
    debug!(status, %message, "cluster rejected request");

    match status {
        404 => ClusterError::NotFound {
            kind: subject.kind,
            name: subject.name.to_owned(),
        },
        409 => ClusterError::AlreadyExists {
            kind: subject.kind,
            name: subject.name.to_owned(),
        },
        _ => ClusterError::Server { status, message },
    }
}
