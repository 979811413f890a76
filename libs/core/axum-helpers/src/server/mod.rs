//! Server infrastructure: router assembly, health helpers and graceful shutdown.

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_production_app, create_router};
pub use health::{HealthCheckFuture, HealthResponse, check_services, run_health_checks};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
