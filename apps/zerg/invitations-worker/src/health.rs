//! Health and metrics endpoints for the invitations worker.
//!
//! - Liveness: `/health`, `/healthz`
//! - Readiness: `/ready`, `/readyz` (Redis and PostgreSQL reachable)
//! - Prometheus: `/metrics`

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use eyre::{Result, WrapErr};
use metrics_exporter_prometheus::PrometheusHandle;
use redis::aio::ConnectionManager;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// One dependency the worker needs before it can take jobs.
#[async_trait]
pub trait DependencyCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<(), String>;
}

pub struct RedisCheck {
    redis: ConnectionManager,
}

impl RedisCheck {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl DependencyCheck for RedisCheck {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> Result<(), String> {
        let mut conn = self.redis.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| format!("error: {e}"))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(format!("unexpected response: {response}"))
        }
    }
}

pub struct PostgresCheck {
    db: DatabaseConnection,
}

impl PostgresCheck {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DependencyCheck for PostgresCheck {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn check(&self) -> Result<(), String> {
        self.db.ping().await.map_err(|e| format!("error: {e}"))
    }
}

#[derive(Clone)]
pub struct HealthState {
    pub app_name: String,
    pub app_version: String,
    pub checks: Vec<Arc<dyn DependencyCheck>>,
    /// `None` until the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl HealthState {
    pub fn new(app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            checks: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_check(mut self, check: impl DependencyCheck + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
}

pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app_name,
        version: state.app_version,
    })
}

/// 200 when every dependency answers, 503 otherwise.
pub async fn ready_handler(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    let mut checks = Map::new();
    let mut ready = true;

    for check in &state.checks {
        let result = match check.check().await {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                ready = false;
                e
            }
        };
        checks.insert(check.name().to_string(), Value::String(result));
    }

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (status, Json(json!({ "status": label, "checks": checks })))
}

pub async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Metrics not initialized".to_string(),
        ),
    }
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve the health router on `0.0.0.0:port` until the process exits.
pub async fn start_health_server(state: HealthState, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, health_router(state))
        .await
        .wrap_err("Health server failed")
}
