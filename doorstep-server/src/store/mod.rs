//! Durable feedback storage.
//!
//! Corrections and confirmations are persisted in PostgreSQL as
//! append-only tables. If `DATABASE_URL` is not set, falls back to the
//! in-memory store from doorstep-core (useful for development, but
//! feedback is lost on restart).

pub mod postgres;

pub use postgres::PostgresFeedbackStore;

use std::sync::Arc;

use doorstep_core::{FeedbackStore, MemoryFeedbackStore};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),
}

/// Create a feedback store from the environment.
///
/// Uses PostgreSQL if `DATABASE_URL` is set, otherwise falls back to
/// in-memory storage.
pub async fn feedback_store_from_env(
    max_connections: u32,
) -> Result<Arc<dyn FeedbackStore>, StorageError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => {
            tracing::info!("Using PostgreSQL feedback storage");
            Ok(Arc::new(
                PostgresFeedbackStore::new(&url, max_connections).await?,
            ))
        }
        _ => {
            tracing::warn!("DATABASE_URL not set, feedback will not survive restarts");
            Ok(Arc::new(MemoryFeedbackStore::new()))
        }
    }
}
