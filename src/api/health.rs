use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use super::AppState;
use crate::postgres::health;
use crate::postgres::{HealthReport, HealthStatus};

/// `GET /health`: probes the cluster on every call.
///
/// A failed or timed-out probe is reported as `503`; the service keeps
/// running either way.
pub(crate) async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let status = match health::check(state.provider.clone(), state.health_timeout).await {
        Ok(status) => status,
        Err(e) => {
            error!("Health check failed: {}", e);
            HealthStatus::OutOfService
        }
    };

    let code = match status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::OutOfService => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(HealthReport::new(status)))
}
