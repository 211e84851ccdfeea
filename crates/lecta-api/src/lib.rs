//! Axum API server for the Lecta backend.
//!
//! The API is the trigger boundary of the pipeline: it persists uploads,
//! enqueues processing jobs, and serves the read-only status projection that
//! external pollers consume. It never runs a stage itself.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
