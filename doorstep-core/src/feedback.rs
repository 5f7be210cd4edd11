//! Correction and confirmation store.
//!
//! Human feedback is the one thing that outlives a request: verified
//! entrance relocations (corrections) and affirmations of an existing
//! entrance (confirmations). Both are append-only logs keyed by
//! [`PlaceId`]; readers derive "latest correction wins" by ordering on
//! the recorded timestamp, never on log order.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[cfg(feature = "network")]
use async_trait::async_trait;

use crate::place::{GeoPoint, PlaceId};
#[cfg(feature = "network")]
use crate::error::Result;

/// A user-submitted entrance relocation. The latest record for a place
/// supersedes both earlier records and the heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub place_id: PlaceId,
    pub entrance: GeoPoint,
    pub accessible: bool,
    pub recorded_at: DateTime<Utc>,
}

/// An affirmation that the currently shown entrance is right.
///
/// The fingerprint is advisory: it discourages casual re-confirmation
/// but is not a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub place_id: PlaceId,
    pub fingerprint: String,
    pub recorded_at: DateTime<Utc>,
}

/// Social proof surfaced with every resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationStats {
    pub count: u64,
    pub last_confirmed_at: Option<DateTime<Utc>>,
}

/// Durable feedback log.
///
/// Writes append; reads scan per place. Implementations must not lose
/// concurrent appends, and readers must sort corrections by timestamp
/// rather than trusting insertion order.
#[cfg(feature = "network")]
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn record_correction(
        &self,
        place_id: &PlaceId,
        entrance: GeoPoint,
        accessible: bool,
    ) -> Result<Correction>;

    async fn record_confirmation(
        &self,
        place_id: &PlaceId,
        fingerprint: &str,
    ) -> Result<Confirmation>;

    async fn latest_correction(&self, place_id: &PlaceId) -> Result<Option<Correction>>;

    async fn confirmation_stats(&self, place_id: &PlaceId) -> Result<ConfirmationStats>;
}

/// In-memory feedback log for tests, the CLI, and the server's
/// no-database fallback. Records are lost on restart.
#[derive(Default)]
pub struct MemoryFeedbackStore {
    corrections: DashMap<PlaceId, Vec<Correction>>,
    confirmations: DashMap<PlaceId, Vec<Confirmation>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_correction_sync(
        &self,
        place_id: &PlaceId,
        entrance: GeoPoint,
        accessible: bool,
    ) -> Correction {
        let record = Correction {
            place_id: place_id.clone(),
            entrance,
            accessible,
            recorded_at: Utc::now(),
        };
        self.corrections
            .entry(place_id.clone())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn record_confirmation_sync(&self, place_id: &PlaceId, fingerprint: &str) -> Confirmation {
        let record = Confirmation {
            place_id: place_id.clone(),
            fingerprint: fingerprint.to_string(),
            recorded_at: Utc::now(),
        };
        self.confirmations
            .entry(place_id.clone())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn latest_correction_sync(&self, place_id: &PlaceId) -> Option<Correction> {
        self.corrections.get(place_id).and_then(|log| {
            // max_by keeps the later element on ties, so equal timestamps
            // still resolve to the most recent append.
            log.iter()
                .max_by(|a, b| a.recorded_at.cmp(&b.recorded_at))
                .cloned()
        })
    }

    pub fn confirmation_stats_sync(&self, place_id: &PlaceId) -> ConfirmationStats {
        self.confirmations
            .get(place_id)
            .map(|log| ConfirmationStats {
                count: log.len() as u64,
                last_confirmed_at: log.iter().map(|c| c.recorded_at).max(),
            })
            .unwrap_or_default()
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn record_correction(
        &self,
        place_id: &PlaceId,
        entrance: GeoPoint,
        accessible: bool,
    ) -> Result<Correction> {
        Ok(self.record_correction_sync(place_id, entrance, accessible))
    }

    async fn record_confirmation(
        &self,
        place_id: &PlaceId,
        fingerprint: &str,
    ) -> Result<Confirmation> {
        Ok(self.record_confirmation_sync(place_id, fingerprint))
    }

    async fn latest_correction(&self, place_id: &PlaceId) -> Result<Option<Correction>> {
        Ok(self.latest_correction_sync(place_id))
    }

    async fn confirmation_stats(&self, place_id: &PlaceId) -> Result<ConfirmationStats> {
        Ok(self.confirmation_stats_sync(place_id))
    }
}
