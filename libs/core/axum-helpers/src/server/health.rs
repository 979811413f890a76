use axum::{Json, http::StatusCode};
use core_config::AppInfo;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use utoipa::ToSchema;

/// Body of the `/health` endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` or `degraded`
    pub status: String,
    pub name: String,
    pub version: String,
    /// Per-dependency state, `connected` or `disconnected`
    pub services: BTreeMap<String, String>,
}

impl HealthResponse {
    pub fn from_checks(app: &AppInfo, services: BTreeMap<String, String>) -> Self {
        let healthy = services.values().all(|s| s == "connected");
        Self {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            name: app.name.clone(),
            version: app.version.clone(),
            services,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// A boxed future for health checks with a string error
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Run checks concurrently and report each as `connected`/`disconnected`.
pub async fn check_services(
    checks: Vec<(&str, HealthCheckFuture<'_>)>,
) -> BTreeMap<String, String> {
    let names: Vec<_> = checks.iter().map(|(name, _)| name.to_string()).collect();
    let futures: Vec<_> = checks.into_iter().map(|(_, check)| check).collect();
    let results = join_all(futures).await;

    names
        .into_iter()
        .zip(results)
        .map(|(name, result)| {
            let status = match result {
                Ok(()) => "connected",
                Err(e) => {
                    tracing::error!(service = %name, error = %e, "Health check failed");
                    "disconnected"
                }
            };
            (name, status.to_string())
        })
        .collect()
}

/// Readiness aggregation: `{"status": "ready"|"not ready", "<name>": "..."}`.
///
/// ```ignore
/// let checks: Vec<(&str, HealthCheckFuture)> = vec![
///     ("database", Box::pin(async { check_health(&db).await.map_err(|e| e.to_string()) })),
/// ];
/// run_health_checks(checks).await
/// ```
pub async fn run_health_checks(
    checks: Vec<(&str, HealthCheckFuture<'_>)>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    let services = check_services(checks).await;
    let all_healthy = services.values().all(|s| s == "connected");

    let mut response = serde_json::Map::new();
    response.insert(
        "status".to_string(),
        serde_json::json!(if all_healthy { "ready" } else { "not ready" }),
    );
    for (name, status) in services {
        response.insert(name, serde_json::json!(status));
    }

    let body = Json(serde_json::Value::Object(response));
    if all_healthy {
        Ok((StatusCode::OK, body))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, body))
    }
}
