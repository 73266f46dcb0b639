//! Health endpoint.
//!
//! Besides the bare heartbeat, the handler pings the database and names
//! the active AI backend, so monitoring can tell a live process from one
//! whose storage has gone away or that is silently running on the mock.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat plus dependency probes.
///
/// Always answers HTTP 200; `status` flips to `"degraded"` when the
/// database ping fails. `ia` names the responder backend in use
/// (`"openai"` or `"mock"`).
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Process is up; see body for dependency state", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            error!(error = %e, "health probe: database unreachable");
            "unreachable"
        }
    };
    let status = if database == "ok" { "ok" } else { "degraded" };
    let ia = if state.config.ai_use_mock {
        "mock"
    } else {
        "openai"
    };

    Json(json!({
        "status":   status,
        "version":  env!("CARGO_PKG_VERSION"),
        "database": database,
        "ia":       ia,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
