use axum::{Router, routing::get};

pub mod health;
pub mod users;

/// Domain routes; `create_router` adds docs and middleware on top.
pub fn routes(state: &crate::state::AppState) -> Router {
    Router::new().nest("/users", users::router(state))
}

/// `/health`, `/ready` and `/metrics`, with state applied so the result can be
/// merged into the stateless app router.
pub fn ops_router(state: crate::state::AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        .route("/metrics", get(health::metrics_handler))
        .with_state(state)
}
