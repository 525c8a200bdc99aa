//! Liveness and readiness probes.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub database: &'static str,
    pub commerce: &'static str,
}

const fn status(ok: bool) -> &'static str {
    if ok { "ok" } else { "unavailable" }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the session database and the commerce backend. Returns 503
/// Service Unavailable if either is unreachable.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: database unavailable");
            false
        }
    };
    let commerce = match state.commerce().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: commerce backend unavailable");
            false
        }
    };

    let code = if database && commerce {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(Readiness {
            database: status(database),
            commerce: status(commerce),
        }),
    )
}
