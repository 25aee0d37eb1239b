//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use axum::Router;
use http::{HeaderValue, Method, header};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use vb_calendar::AvailabilityAggregator;
use vb_core::{ApiConfig, Config};

use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<AvailabilityAggregator>,
}

/// Build the application router with middleware
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.api);

    Router::new()
        .merge(routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin unless `allowed_origins` is configured
fn cors_layer(api: &ApiConfig) -> CorsLayer {
    match &api.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE])
        }
        _ => CorsLayer::permissive(),
    }
}

/// Start the HTTP API server
///
/// Runs until Ctrl+C, then finishes in-flight requests before returning.
pub async fn start_server(
    config: Arc<Config>,
    aggregator: Arc<AvailabilityAggregator>,
) -> anyhow::Result<()> {
    let port = config.api.port;
    let app = app(AppState { config, aggregator });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
