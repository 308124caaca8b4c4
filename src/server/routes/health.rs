// Health check

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::server::ServerAppState;

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub checks: HealthChecks,
}

/// 200 when storage is usable, 503 otherwise
pub async fn health_handler(State(state): State<ServerAppState>) -> (StatusCode, Json<HealthReport>) {
    let healthy = state.evaluations.health_check().await;
    let (status_code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        log::error!("Health check failed: storage unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthReport {
            status,
            timestamp: Utc::now().to_rfc3339(),
            checks: HealthChecks { database: status },
        }),
    )
}
