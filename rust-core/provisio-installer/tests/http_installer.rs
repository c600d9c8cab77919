// SPDX-License-Identifier: PMPL-1.0-or-later
//! Installer over the HTTP transport
//!
//! Runs the full installer against an in-memory cluster served by a small
//! axum gateway, so status-code mapping feeds the same error taxonomy and
//! snapshot rules as the in-process transport.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use provisio_cluster::types::{CreateRequest, ErrorResponse};
use provisio_cluster::{
    ClusterError, Connection, Connector, Created, Dropped, Endpoint, HttpConnector,
    InMemoryCluster, ObjectKind,
};
use provisio_installer::{ConnectOptions, Installer, ProvisionError};

#[derive(Clone)]
struct Gateway {
    cluster: InMemoryCluster,
}

impl Gateway {
    async fn open(&self) -> Result<Connection, ApiError> {
        Ok(self.cluster.connect(&Endpoint::new("gateway", 0)).await?)
    }
}

struct ApiError(ClusterError);

impl From<ClusterError> for ApiError {
    fn from(e: ClusterError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ClusterError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClusterError::AlreadyExists { .. } => StatusCode::CONFLICT,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorResponse {
            error: status.as_str().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn list_dbs(State(gw): State<Gateway>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(gw.open().await?.db_list().await?))
}

async fn create_db(
    State(gw): State<Gateway>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<Created>, ApiError> {
    Ok(Json(gw.open().await?.db_create(&req.name).await?))
}

async fn drop_db(
    State(gw): State<Gateway>,
    Path(name): Path<String>,
) -> Result<Json<Dropped>, ApiError> {
    Ok(Json(gw.open().await?.db_drop(&name).await?))
}

async fn list_tables(
    State(gw): State<Gateway>,
    Path(db): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(gw.open().await?.table_list(&db).await?))
}

async fn create_table(
    State(gw): State<Gateway>,
    Path(db): Path<String>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<Created>, ApiError> {
    Ok(Json(gw.open().await?.table_create(&db, &req.name).await?))
}

/// Serve `cluster` on an ephemeral port and return connect options for it.
async fn spawn_gateway(cluster: InMemoryCluster, db: &str) -> ConnectOptions {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dbs", get(list_dbs).post(create_db))
        .route("/dbs/{name}", delete(drop_db))
        .route("/dbs/{name}/tables", get(list_tables).post(create_table))
        .with_state(Gateway { cluster });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ConnectOptions::new(db).host("127.0.0.1").port(port)
}

fn http() -> Arc<HttpConnector> {
    Arc::new(HttpConnector::with_timeout(Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_missing_db_gives_empty_snapshot_over_http() {
    let cluster = InMemoryCluster::new();
    let options = spawn_gateway(cluster.clone(), "app").await;

    let installer = Installer::connect(&options, http()).await.unwrap();

    assert!(installer.tables().is_empty());
    assert!(!installer.db_exists("app").await.unwrap());
    assert!(!installer.table_exists("users").await.unwrap());
    assert!(cluster.databases().await.is_empty());
}

#[tokio::test]
async fn test_install_and_reconnect_over_http() {
    let cluster = InMemoryCluster::new();
    let options = spawn_gateway(cluster.clone(), "app").await;

    let installer = Installer::connect(&options, http()).await.unwrap();
    assert!(installer.install(&["users", "orders"]).await.unwrap());
    assert!(installer.table_exists("users").await.unwrap());
    assert_eq!(
        cluster.tables("app").await,
        Some(vec!["orders".to_string(), "users".to_string()])
    );

    let reconnected = Installer::connect(&options, http()).await.unwrap();
    assert_eq!(reconnected.tables().len(), 2);
    assert_eq!(
        reconnected.table("orders").unwrap().qualified_name(),
        "app.orders"
    );
}

#[tokio::test]
async fn test_conflicts_map_to_taxonomy_over_http() {
    let cluster = InMemoryCluster::new();
    let options = spawn_gateway(cluster.clone(), "app").await;
    let installer = Installer::connect(&options, http()).await.unwrap();

    let report = installer.install_report(&["a", "a"]).await.unwrap();
    assert_eq!(report.created, vec!["a".to_string()]);
    assert_eq!(
        report.failures[0].error,
        ProvisionError::Duplicate {
            kind: ObjectKind::Table,
            name: "app.a".into()
        }
    );

    assert_eq!(
        installer.install(&["b"]).await.unwrap_err(),
        ProvisionError::Duplicate {
            kind: ObjectKind::Database,
            name: "app".into()
        }
    );
    assert_eq!(
        installer.drop_db("nope").await.unwrap_err(),
        ProvisionError::NotFound {
            kind: ObjectKind::Database,
            name: "nope".into()
        }
    );
    assert_eq!(installer.drop_db("app").await.unwrap(), Dropped::ONE);
}

#[tokio::test]
async fn test_store_outage_is_connection_error_over_http() {
    let cluster = InMemoryCluster::new();
    let options = spawn_gateway(cluster.clone(), "app").await;
    let installer = Installer::connect(&options, http()).await.unwrap();

    cluster.set_reachable(false);
    assert!(matches!(
        installer.list_databases().await.unwrap_err(),
        ProvisionError::Connection(ClusterError::Server { status: 503, .. })
    ));
}
