//! Health check and connectivity endpoints.
//!
//! Neither endpoint requires authentication.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "healthy",
    "database": "connected",
    "uptime_seconds": 42.5,
    "requests_served": 17,
    "timestamp": "2025-01-15T03:30:00.000000Z",
    "version": "0.1.0"
}))]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`.
    #[schema(example = "healthy")]
    pub status: String,

    /// `connected` or `disconnected`.
    #[schema(example = "connected")]
    pub database: String,

    /// Seconds since the server started.
    #[schema(example = 42.5)]
    pub uptime_seconds: f64,

    /// Requests handled so far, this one included.
    #[schema(example = 17)]
    pub requests_served: u64,

    /// Current time (UTC, RFC 3339).
    pub timestamp: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Connectivity check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiTestResponse {
    /// Always `true`.
    pub ok: bool,
    /// Banner text.
    #[schema(example = "Slack Events API Mock Server is running")]
    pub message: String,
    /// Service version.
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Current time (UTC, RFC 3339).
    pub timestamp: String,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Health check endpoint.
///
/// Reports database connectivity, uptime and the number of requests served.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns service status including database connectivity. Responds \
        with 503 when the database cannot be queried.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match state.store().health_check() {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "Database health check failed");
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database: if healthy { "connected" } else { "disconnected" }.to_string(),
            uptime_seconds: state.uptime().as_secs_f64(),
            requests_served: state.requests_served(),
            timestamp: now_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Connectivity banner.
#[utoipa::path(
    get,
    path = "/api/test",
    tag = "system",
    operation_id = "apiTest",
    summary = "Check API connectivity",
    responses(
        (status = 200, description = "Server is running", body = ApiTestResponse)
    )
)]
pub async fn api_test() -> Json<ApiTestResponse> {
    Json(ApiTestResponse {
        ok: true,
        message: "Slack Events API Mock Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            database: "connected".to_string(),
            uptime_seconds: 1.5,
            requests_served: 3,
            timestamp: now_rfc3339(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"requests_served\":3"));
    }
}
