//! Doorstep Server Library - REST API components for entrance resolution
//!
//! This library exposes the server components for use in integration
//! tests. The main binary uses these same components.

pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use config::Config;
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
pub use store::{feedback_store_from_env, PostgresFeedbackStore, StorageError};
