//! service-core: Shared infrastructure for the storefront services.
pub mod error;
pub mod middleware;

pub use axum;
pub use tracing;
pub use validator;
