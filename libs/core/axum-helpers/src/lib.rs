//! # Axum Helpers
//!
//! Shared HTTP plumbing for the API binaries.
//!
//! - **[`server`]**: router assembly, health/readiness helpers, graceful shutdown
//! - **[`errors`]**: the JSON error envelope and OpenAPI response components
//! - **[`extractors`]**: `ValidatedJson` and `UuidPath`
//!
//! ```ignore
//! use axum_helpers::server::{ShutdownCoordinator, create_production_app, create_router};
//!
//! let router = create_router::<ApiDoc>(api_routes, &config.server)?;
//! create_production_app(router, &config.server, ShutdownCoordinator::new(), async {}).await?;
//! ```

pub mod errors;
pub mod extractors;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse, error_response};
pub use extractors::{UuidPath, ValidatedJson};
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, check_services,
    create_production_app, create_router, run_health_checks, shutdown_signal,
};
