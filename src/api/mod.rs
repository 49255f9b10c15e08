pub mod middleware;
pub mod routes;

// Re-export public types and functions
pub use middleware::{log_request_errors, resolve_identity};
pub use routes::{DeliverParams, HealthResponse, deliver, get_entitlements, healthz};
