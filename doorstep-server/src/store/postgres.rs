//! PostgreSQL implementation of the feedback store.
//!
//! Both record types live in append-only tables; "latest correction
//! wins" is an ordered read (`recorded_at`, then id as tiebreaker),
//! never an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use doorstep_core::{
    Confirmation, ConfirmationStats, Correction, DoorstepError, FeedbackStore, GeoPoint, PlaceId,
    Result,
};

use super::StorageError;

/// PostgreSQL-backed feedback store.
#[derive(Clone)]
pub struct PostgresFeedbackStore {
    pool: PgPool,
}

/// Row type for correction queries.
#[derive(FromRow)]
struct CorrectionRow {
    place_id: String,
    lat: f64,
    lon: f64,
    accessible: bool,
    recorded_at: DateTime<Utc>,
}

impl From<CorrectionRow> for Correction {
    fn from(row: CorrectionRow) -> Self {
        Self {
            place_id: PlaceId::from_raw(row.place_id),
            entrance: GeoPoint::new(row.lat, row.lon),
            accessible: row.accessible,
            recorded_at: row.recorded_at,
        }
    }
}

/// Row type for confirmation stats.
#[derive(FromRow)]
struct StatsRow {
    count: i64,
    last_confirmed_at: Option<DateTime<Utc>>,
}

impl PostgresFeedbackStore {
    /// Create a new feedback store with the given database URL.
    ///
    /// Runs migrations automatically on connection.
    pub async fn new(database_url: &str, max_connections: u32) -> std::result::Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        tracing::info!("Feedback store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a feedback store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PostgresFeedbackStore {
    async fn record_correction(
        &self,
        place_id: &PlaceId,
        entrance: GeoPoint,
        accessible: bool,
    ) -> Result<Correction> {
        let (id, recorded_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO entrance_corrections (place_id, lat, lon, accessible)
            VALUES ($1, $2, $3, $4)
            RETURNING id, recorded_at
            "#,
        )
        .bind(place_id.as_str())
        .bind(entrance.lat)
        .bind(entrance.lon)
        .bind(accessible)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DoorstepError::Storage(e.to_string()))?;

        tracing::debug!(correction_id = %id, place_id = %place_id, "Appended correction");

        Ok(Correction {
            place_id: place_id.clone(),
            entrance,
            accessible,
            recorded_at,
        })
    }

    async fn record_confirmation(
        &self,
        place_id: &PlaceId,
        fingerprint: &str,
    ) -> Result<Confirmation> {
        let (id, recorded_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO entrance_confirmations (place_id, fingerprint)
            VALUES ($1, $2)
            RETURNING id, recorded_at
            "#,
        )
        .bind(place_id.as_str())
        .bind(fingerprint)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DoorstepError::Storage(e.to_string()))?;

        tracing::debug!(confirmation_id = %id, place_id = %place_id, "Appended confirmation");

        Ok(Confirmation {
            place_id: place_id.clone(),
            fingerprint: fingerprint.to_string(),
            recorded_at,
        })
    }

    async fn latest_correction(&self, place_id: &PlaceId) -> Result<Option<Correction>> {
        let row: Option<CorrectionRow> = sqlx::query_as(
            r#"
            SELECT place_id, lat, lon, accessible, recorded_at
            FROM entrance_corrections
            WHERE place_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(place_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DoorstepError::Storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn confirmation_stats(&self, place_id: &PlaceId) -> Result<ConfirmationStats> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS count, MAX(recorded_at) AS last_confirmed_at
            FROM entrance_confirmations
            WHERE place_id = $1
            "#,
        )
        .bind(place_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DoorstepError::Storage(e.to_string()))?;

        Ok(ConfirmationStats {
            count: row.count.max(0) as u64,
            last_confirmed_at: row.last_confirmed_at,
        })
    }
}
