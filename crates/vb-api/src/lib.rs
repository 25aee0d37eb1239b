//! vb-api: HTTP API for villa-gateway
//!
//! Exposes the availability check to the booking widget.
//! Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{AppState, app, start_server};
