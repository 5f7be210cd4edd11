//! Entrance resolution handlers
//!
//! `GET /entrance` runs the full resolution pipeline; `GET /suggest`
//! returns ranked geocoder candidates for incomplete queries.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use doorstep_core::{EntranceResponse, GeoPoint};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_coordinates, validate_query};

/// Query parameters for entrance resolution.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EntranceQuery {
    /// Free-text address or place query.
    pub q: String,
    /// Optional bias latitude; requires `lon`.
    pub lat: Option<f64>,
    /// Optional bias longitude; requires `lat`.
    pub lon: Option<f64>,
}

/// Query parameters for geocoder suggestions.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestQuery {
    /// Free-text address or place query, possibly incomplete.
    pub q: String,
}

/// One ranked geocoder candidate.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestCandidate {
    /// Display name as returned by the geocoder.
    #[schema(example = "123 Example St, Seattle, WA")]
    pub name: String,
    #[schema(example = 47.6)]
    pub lat: f64,
    #[schema(example = -122.3)]
    pub lon: f64,
}

/// Response for a suggestion query.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestResponse {
    pub candidates: Vec<SuggestCandidate>,
}

/// Resolve the most plausible pedestrian entrance for a place query.
///
/// Fuses geocoded place data with nearby road/path geometry; the
/// `method` and `confidence` fields of the response record which
/// heuristic tier produced the entrance. A verified correction for the
/// place, when one exists, overrides the heuristic entirely.
#[utoipa::path(
    get,
    path = "/entrance",
    tag = "Resolution",
    params(EntranceQuery),
    responses(
        (status = 200, description = "Resolved entrance, drop-off point, and confidence tier"),
        (status = 400, description = "Missing or malformed query parameters"),
        (status = 404, description = "No geocoding match for the query"),
        (status = 429, description = "Courtesy rate limit toward the geocoder reached"),
        (status = 503, description = "Geocoding service unavailable")
    )
)]
pub async fn entrance_handler(
    State(state): State<AppState>,
    Query(params): Query<EntranceQuery>,
) -> Result<Json<EntranceResponse>, ApiError> {
    validate_query(&params.q)?;

    let near = match (params.lat, params.lon) {
        (Some(lat), Some(lon)) => {
            validate_coordinates(lat, lon)?;
            Some(GeoPoint::new(lat, lon))
        }
        (None, None) => None,
        _ => {
            return Err(ApiError::bad_request(
                "lat and lon must be provided together",
            ))
        }
    };

    let response = state.resolver.resolve(&params.q, near).await?;
    Ok(Json(response))
}

/// Ranked geocoder candidates for an incomplete query.
///
/// Unlike road/path lookups, a refused courtesy rate limit here is
/// surfaced to the caller as 429 rather than degraded silently.
#[utoipa::path(
    get,
    path = "/suggest",
    tag = "Resolution",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Ranked candidates", body = SuggestResponse),
        (status = 400, description = "Missing or empty query"),
        (status = 429, description = "Courtesy rate limit toward the geocoder reached"),
        (status = 503, description = "Geocoding service unavailable")
    )
)]
pub async fn suggest_handler(
    State(state): State<AppState>,
    Query(params): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>, ApiError> {
    validate_query(&params.q)?;

    let candidates = state
        .resolver
        .suggest(&params.q)
        .await?
        .into_iter()
        .map(|candidate| SuggestCandidate {
            name: candidate.display_name,
            lat: candidate.center.lat,
            lon: candidate.center.lon,
        })
        .collect();

    Ok(Json(SuggestResponse { candidates }))
}
