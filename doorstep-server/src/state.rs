//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use doorstep_core::{EntranceResolver, FeedbackStore};

/// Application state containing shared resources.
///
/// The resolver holds its own handle to the feedback store for reads
/// during resolution; the state keeps a second handle for the feedback
/// write endpoints.
#[derive(Clone)]
pub struct AppState {
    /// The entrance resolution pipeline
    pub resolver: Arc<EntranceResolver>,
    /// Feedback log for corrections and confirmations
    pub feedback: Arc<dyn FeedbackStore>,
}

impl AppState {
    pub fn new(resolver: Arc<EntranceResolver>, feedback: Arc<dyn FeedbackStore>) -> Self {
        Self { resolver, feedback }
    }
}
