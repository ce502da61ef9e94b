//! Health endpoint.

use super::SharedState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::time::Instant;

pub fn router() -> Router<SharedState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: &'static str,
    pub timestamp: String,
    pub database: ComponentHealth,
    pub storage: ComponentHealth,
}

fn component(start: Instant, result: Result<(), crate::PrintsError>) -> ComponentHealth {
    let latency_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            latency_ms,
            message: None,
        },
        Err(e) => {
            tracing::warn!("Health probe failed: {}", e);
            ComponentHealth {
                status: ComponentStatus::Down,
                latency_ms,
                message: Some("unreachable".to_string()),
            }
        }
    }
}

/// GET /api/health
///
/// 503 when the database is down; storage trouble alone still reports 200.
pub async fn health_check(
    State(state): State<SharedState>,
) -> (StatusCode, Json<HealthResponse>) {
    let start = Instant::now();
    let database = component(start, state.catalog.ping().await);

    let start = Instant::now();
    let storage = component(start, state.store.health_check().await);

    let (code, status) = match database.status {
        ComponentStatus::Up => (StatusCode::OK, ComponentStatus::Up),
        ComponentStatus::Down => (StatusCode::SERVICE_UNAVAILABLE, ComponentStatus::Down),
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
            database,
            storage,
        }),
    )
}
