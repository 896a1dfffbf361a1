//! HTTP API for health checks, Prometheus metrics and fleet state

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use fleet_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::FleetMetrics,
    SharedSimulation,
};
use prometheus::{Encoder, TextEncoder};
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: FleetMetrics,
    pub simulation: SharedSimulation<StdRng>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: FleetMetrics,
        simulation: SharedSimulation<StdRng>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            simulation,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Every rack with its VMs plus a fleet summary
async fn fleet(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.simulation.lock().await.snapshot(Utc::now());
    Json(snapshot)
}

/// Alert history of one rack; empty for racks never analyzed
async fn rack_alerts(
    State(state): State<Arc<AppState>>,
    Path(rack_id): Path<String>,
) -> impl IntoResponse {
    let alerts = state.simulation.lock().await.alert_history(&rack_id).to_vec();
    Json(alerts)
}

/// Latest failure prediction of one rack
async fn rack_prediction(
    State(state): State<Arc<AppState>>,
    Path(rack_id): Path<String>,
) -> impl IntoResponse {
    let prediction = state.simulation.lock().await.prediction(&rack_id);
    Json(prediction)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/fleet", get(fleet))
        .route("/racks/:rack_id/alerts", get(rack_alerts))
        .route("/racks/:rack_id/prediction", get(rack_prediction))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
