//! Payload validation module
//!
//! Feedback submissions are rejected here, before anything is written
//! to the append-only log.

use crate::error::ApiError;

/// Maximum accepted length for a place identifier.
const MAX_PLACE_ID_LEN: usize = 128;

/// Maximum accepted length for a client fingerprint.
const MAX_FINGERPRINT_LEN: usize = 128;

/// Validates a free-text search query
pub fn validate_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("Query must not be empty"));
    }
    Ok(())
}

/// Validates a WGS84 coordinate pair
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ApiError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::bad_request(format!(
            "Latitude {lat} out of range [-90, 90]"
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::bad_request(format!(
            "Longitude {lon} out of range [-180, 180]"
        )));
    }
    Ok(())
}

/// Validates a place identifier received back from a client
pub fn validate_place_id(place_id: &str) -> Result<(), ApiError> {
    if place_id.is_empty() {
        return Err(ApiError::bad_request("placeId must not be empty"));
    }
    if place_id.len() > MAX_PLACE_ID_LEN {
        return Err(ApiError::bad_request(format!(
            "placeId exceeds {MAX_PLACE_ID_LEN} characters"
        )));
    }
    if !place_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::bad_request("placeId must be alphanumeric"));
    }
    Ok(())
}

/// Validates a client fingerprint. The fingerprint is advisory, so only
/// its size is constrained.
pub fn validate_fingerprint(fingerprint: &str) -> Result<(), ApiError> {
    if fingerprint.len() > MAX_FINGERPRINT_LEN {
        return Err(ApiError::bad_request(format!(
            "fingerprint exceeds {MAX_FINGERPRINT_LEN} characters"
        )));
    }
    Ok(())
}
