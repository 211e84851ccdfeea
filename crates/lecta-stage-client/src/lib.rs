//! HTTP client for the three compute-stage services.
//!
//! This crate provides:
//! - One typed dispatch operation per stage endpoint
//! - Failure classification (timeout / unreachable / handshake / protocol)
//! - At-most-once dispatch for the attachment-bearing stages
//!
//! The client never touches persisted state; it only talks to the network.

pub mod client;
pub mod error;
pub mod types;

pub use client::{StageClient, StageClientConfig};
pub use error::{StageClientError, StageClientResult};
pub use types::{HealthResponse, SynthesisRequest};
