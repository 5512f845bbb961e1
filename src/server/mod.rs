//! Dashboard feed: read-only JSON over HTTP plus alert dismissal.
//!
//! Routes:
//! - `GET  /api/summary`         four aggregated views
//! - `GET  /api/snapshot`        views, alerts and timestamp together
//! - `GET  /api/alerts`          sorted alert messages
//! - `POST /api/alerts/dismiss`  `{"message": "..."}`, always 204
//! - `GET  /healthz`

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::fleet::aggregate::FleetSummary;
use crate::fleet::{FleetHandle, FleetSnapshot};

#[derive(Debug, Deserialize)]
struct DismissRequest {
    message: String,
}

pub fn router(fleet: FleetHandle) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/summary", get(summary))
        .route("/api/snapshot", get(snapshot))
        .route("/api/alerts", get(alerts))
        .route("/api/alerts/dismiss", post(dismiss))
        .layer(TraceLayer::new_for_http())
        .with_state(fleet)
}

pub async fn serve(addr: SocketAddr, fleet: FleetHandle) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Dashboard feed listening on {}", listener.local_addr()?);
    axum::serve(listener, router(fleet)).await?;
    Ok(())
}

async fn summary(State(fleet): State<FleetHandle>) -> Json<FleetSummary> {
    Json(fleet.snapshot().summary.clone())
}

async fn snapshot(State(fleet): State<FleetHandle>) -> Json<FleetSnapshot> {
    Json(FleetSnapshot::clone(&fleet.snapshot()))
}

async fn alerts(State(fleet): State<FleetHandle>) -> Json<Vec<String>> {
    Json(fleet.alerts())
}

async fn dismiss(
    State(fleet): State<FleetHandle>,
    Json(req): Json<DismissRequest>,
) -> StatusCode {
    if fleet.dismiss(&req.message) {
        info!(message = %req.message, "Alert dismissed");
    }
    StatusCode::NO_CONTENT
}
