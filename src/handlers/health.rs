//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Metrics emission status: "operational" or "degraded"
    pub emission_status: &'static str,
    /// Observations dropped since startup
    pub dropped_observations: u64,
}

/// Health check handler
///
/// Returns 200 OK with the emission status. The status is "degraded" once
/// any observation has been dropped (registration conflict or label-schema
/// mismatch), otherwise "operational". Dropped observations are lost
/// permanently, so degraded never clears on its own.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let dropped = state.collector().dropped_observations();
    let emission_status = if dropped > 0 { "degraded" } else { "operational" };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            emission_status,
            dropped_observations: dropped,
        }),
    )
}
