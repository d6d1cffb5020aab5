use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use crate::{
    AppState,
    response::{Envelope, respond},
};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub service: &'static str,
    pub database: bool,
    pub cache: bool,
}

/// Liveness plus storage probes; 503 when a backend is down
pub async fn health_check(State(state): State<AppState>) -> Response {
    let database = state.snippets.health_check().await.unwrap_or_else(|e| {
        warn!(error = %e, "Database health probe failed");
        false
    });
    let cache = state.sessions.health_check().await.unwrap_or_else(|e| {
        warn!(error = %e, "Cache health probe failed");
        false
    });

    let report = HealthReport {
        service: "snipnet",
        database,
        cache,
    };

    if database && cache {
        respond(StatusCode::OK, "ok", report)
    } else {
        let body = Envelope::failure("degraded", Some(report));
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
