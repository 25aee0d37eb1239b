//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{check_availability, health, method_not_allowed};
use crate::server::AppState;

/// Path the booking widget posts to
pub const CHECK_AVAILABILITY_PATH: &str = "/check-availability";

/// Path used by existing serverless deployments of the widget
pub const LEGACY_CHECK_AVAILABILITY_PATH: &str = "/.netlify/functions/check-availability";

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            CHECK_AVAILABILITY_PATH,
            post(check_availability).fallback(method_not_allowed),
        )
        .route(
            LEGACY_CHECK_AVAILABILITY_PATH,
            post(check_availability).fallback(method_not_allowed),
        )
}
