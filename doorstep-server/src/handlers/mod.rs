//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod entrance;
pub mod feedback;
pub mod health;

pub use entrance::{
    entrance_handler, suggest_handler, EntranceQuery, SuggestCandidate, SuggestQuery,
    SuggestResponse,
};
pub use feedback::{
    confirmation_handler, correction_handler, ConfirmationRequest, ConfirmationResponse,
    CorrectionRequest, CorrectionResponse,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
