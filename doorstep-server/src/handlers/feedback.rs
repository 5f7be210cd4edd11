//! Feedback handlers
//!
//! Corrections relocate an entrance and become ground truth for the
//! place; confirmations affirm the currently shown entrance. Both append
//! to the durable log and evict the place's cached responses so the next
//! resolution reflects them.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use doorstep_core::{GeoPoint, PlaceId};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_coordinates, validate_fingerprint, validate_place_id};

/// Request to relocate a place's entrance.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    /// Place identifier from a previous resolution response.
    #[schema(example = "a3f9c2b8d4e5f601")]
    pub place_id: String,
    #[schema(example = 47.60012)]
    pub lat: f64,
    #[schema(example = -122.29987)]
    pub lon: f64,
    /// Whether the corrected entrance is step-free accessible.
    pub accessible: bool,
}

/// Acknowledgement for a recorded correction.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResponse {
    pub place_id: String,
    pub recorded_at: DateTime<Utc>,
}

/// Request to affirm a place's currently shown entrance.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    /// Place identifier from a previous resolution response.
    #[schema(example = "a3f9c2b8d4e5f601")]
    pub place_id: String,
    /// Advisory client fingerprint; deduplicates casual re-confirmation
    /// but is not a uniqueness constraint.
    #[serde(default)]
    pub fingerprint: String,
}

/// Updated social proof after a recorded confirmation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub place_id: String,
    pub verified_count: u64,
    pub last_verified_at: Option<DateTime<Utc>>,
}

/// Record an entrance correction.
///
/// The latest correction for a place supersedes both earlier
/// corrections and the heuristic; subsequent resolutions return it at
/// high confidence.
#[utoipa::path(
    post,
    path = "/feedback/correction",
    tag = "Feedback",
    request_body = CorrectionRequest,
    responses(
        (status = 200, description = "Correction recorded", body = CorrectionResponse),
        (status = 400, description = "Malformed payload (coordinates or placeId)"),
        (status = 500, description = "Feedback log unavailable")
    )
)]
pub async fn correction_handler(
    State(state): State<AppState>,
    Json(request): Json<CorrectionRequest>,
) -> Result<Json<CorrectionResponse>, ApiError> {
    validate_place_id(&request.place_id)?;
    validate_coordinates(request.lat, request.lon)?;

    let place_id = PlaceId::from_raw(request.place_id);
    let entrance = GeoPoint::new(request.lat, request.lon);

    let record = state
        .feedback
        .record_correction(&place_id, entrance, request.accessible)
        .await?;

    // Cached responses for the place are stale the moment a correction
    // lands.
    state.resolver.invalidate_place(&place_id);

    tracing::info!(place_id = %place_id, "Entrance correction recorded");

    Ok(Json(CorrectionResponse {
        place_id: place_id.to_string(),
        recorded_at: record.recorded_at,
    }))
}

/// Record an entrance confirmation.
#[utoipa::path(
    post,
    path = "/feedback/confirmation",
    tag = "Feedback",
    request_body = ConfirmationRequest,
    responses(
        (status = 200, description = "Confirmation recorded", body = ConfirmationResponse),
        (status = 400, description = "Malformed payload"),
        (status = 500, description = "Feedback log unavailable")
    )
)]
pub async fn confirmation_handler(
    State(state): State<AppState>,
    Json(request): Json<ConfirmationRequest>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    validate_place_id(&request.place_id)?;
    validate_fingerprint(&request.fingerprint)?;

    let place_id = PlaceId::from_raw(request.place_id);

    state
        .feedback
        .record_confirmation(&place_id, &request.fingerprint)
        .await?;
    let stats = state.feedback.confirmation_stats(&place_id).await?;

    // Evict cached responses so the refreshed count shows up on the
    // next resolution.
    state.resolver.invalidate_place(&place_id);

    tracing::debug!(place_id = %place_id, count = stats.count, "Confirmation recorded");

    Ok(Json(ConfirmationResponse {
        place_id: place_id.to_string(),
        verified_count: stats.count,
        last_verified_at: stats.last_confirmed_at,
    }))
}
