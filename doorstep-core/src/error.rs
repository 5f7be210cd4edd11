use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoorstepError {
    #[error("no geocoding match for \"{0}\"")]
    NotFound(String),

    #[error("{service} unavailable: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },

    #[error("local rate limit reached for {0}")]
    RateLimited(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("feedback store error: {0}")]
    Storage(String),

    #[cfg(feature = "network")]
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DoorstepError>;
