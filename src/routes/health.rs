// src/routes/health.rs
//! Liveness and readiness endpoint for the raw data source service.
//!
//! `GET /health` answers `200 {"status":"ok","database":"ok"}` when the source
//! database responds to a trivial query, and `503` with `"database":"unreachable"`
//! otherwise, so orchestrators can tell a live process from a usable one.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

async fn health(State(pool): State<PgPool>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            warn!("Health check could not reach source database: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unreachable",
                }),
            )
        }
    }
}

/// Subrouter containing the `/health` route.
pub fn router() -> Router<PgPool> {
    Router::new().route("/health", get(health))
}
