//! Liveness, readiness and metrics endpoints with real dependency checks.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_helpers::server::{
    HealthCheckFuture, HealthResponse, check_services, run_health_checks,
};

fn database_check(state: &AppState) -> HealthCheckFuture<'_> {
    Box::pin(async {
        database::postgres::check_health(&state.db)
            .await
            .map_err(|e| format!("Database ping failed: {}", e))
    })
}

fn users_check(state: &AppState) -> HealthCheckFuture<'_> {
    Box::pin(async {
        state
            .users
            .health_check()
            .await
            .map_err(|e| format!("User store probe failed: {}", e))
    })
}

/// Liveness through the user gateway's own probe: `ok`, or `degraded` with 503.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let services = check_services(vec![("database", users_check(&state))]).await;
    let response = HealthResponse::from_checks(&state.config.app, services);

    (response.status_code(), Json(response))
}

/// Readiness: Postgres, plus Redis when configured, checked concurrently.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let mut checks: Vec<(&str, HealthCheckFuture<'_>)> =
        vec![("database", database_check(&state))];

    if let Some(redis) = &state.redis {
        let mut conn = redis.clone();
        checks.push((
            "redis",
            Box::pin(async move {
                database::redis::check_health(&mut conn)
                    .await
                    .map_err(|e| format!("Redis ping failed: {}", e))
            }),
        ));
    }

    match run_health_checks(checks).await {
        Ok((status, json)) => (status, json).into_response(),
        Err((status, json)) => (status, json).into_response(),
    }
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        stream_worker::render_metrics(),
    )
}
