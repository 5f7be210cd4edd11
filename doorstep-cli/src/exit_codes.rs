//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts a way to tell "no such place" apart from
//! "the upstream services were unreachable".

use doorstep_core::DoorstepError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// No geocoding match for the query.
/// Maps to EX_DATAERR from sysexits.h.
pub const NO_MATCH: i32 = 65;

/// Service unavailable (geocoder or road/path service).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// Map an error chain to its exit code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DoorstepError>() {
        Some(DoorstepError::NotFound(_)) => NO_MATCH,
        Some(DoorstepError::InvalidInput(_)) => USAGE_ERROR,
        Some(
            DoorstepError::Upstream { .. }
            | DoorstepError::RateLimited(_)
            | DoorstepError::HttpError(_),
        ) => NETWORK_ERROR,
        _ => GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let not_found = anyhow::Error::new(DoorstepError::NotFound("x".into()));
        assert_eq!(for_error(&not_found), NO_MATCH);

        let limited = anyhow::Error::new(DoorstepError::RateLimited("geocoding"));
        assert_eq!(for_error(&limited), NETWORK_ERROR);

        let usage = anyhow::Error::new(DoorstepError::InvalidInput("bad".into()));
        assert_eq!(for_error(&usage), USAGE_ERROR);

        let other = anyhow::anyhow!("something else");
        assert_eq!(for_error(&other), GENERAL_ERROR);
    }
}
