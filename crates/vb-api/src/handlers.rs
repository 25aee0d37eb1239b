//! HTTP API handlers

use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vb_calendar::AvailabilityVerdict;

use crate::error::{ApiError, Result};
use crate::server::AppState;

/// Availability request payload
///
/// Both dates are optional here so a missing one is reported as
/// `Missing dates` rather than as a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityRequest {
    #[serde(default)]
    pub check_in: Option<String>,
    #[serde(default)]
    pub check_out: Option<String>,
}

/// Availability response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityResponse {
    pub available: bool,
    pub blocked_by: Vec<String>,
}

impl From<AvailabilityVerdict> for CheckAvailabilityResponse {
    fn from(verdict: AvailabilityVerdict) -> Self {
        Self {
            available: verdict.available,
            blocked_by: verdict.blocked_by,
        }
    }
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Check whether the requested stay is free on every calendar.
///
/// The body is read as JSON regardless of `Content-Type`, matching what the
/// booking widget sends.
pub async fn check_availability(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CheckAvailabilityResponse>> {
    let req: CheckAvailabilityRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {}", e)))?;
    debug!("Availability request: {:?}", req);

    let verdict = state
        .aggregator
        .check_availability(
            req.check_in.as_deref().unwrap_or_default(),
            req.check_out.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(verdict.into()))
}

/// Any method other than POST on the availability endpoint
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
