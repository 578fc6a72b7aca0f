//! Narrative store trait and the `SQLite`-backed implementation.
//!
//! The trait is the seam between the report pipeline and persistence so
//! the pipeline's state machine can be exercised against in-memory
//! fakes. Narrative records are upsert-only: the cache is overwritten,
//! never deleted.

use std::sync::Arc;

use aqi_monitor_air_models::{CachedNarrative, NarrativeAnalysis, PollutantReading};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Durable store for ward narratives and pollutant snapshots.
#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Loads the cached narrative for a ward, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database operation fails.
    async fn get_narrative(&self, ward_id: &str) -> Result<Option<CachedNarrative>, DbError>;

    /// Inserts or overwrites the narrative for a ward.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database operation fails.
    async fn upsert_narrative(
        &self,
        ward_id: &str,
        analysis: &NarrativeAnalysis,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Upserts a batch of narratives, all stamped with the same
    /// timestamp. Every entry of the batch is applied before returning.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any database operation fails.
    async fn bulk_upsert_narratives(
        &self,
        entries: &[(String, NarrativeAnalysis)],
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Loads the latest stored pollutant snapshot for a ward.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database operation fails.
    async fn get_latest_pollutants(
        &self,
        ward_id: &str,
    ) -> Result<Option<PollutantReading>, DbError>;

    /// Inserts or overwrites the latest pollutant snapshot for a ward.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database operation fails.
    async fn upsert_pollutants(
        &self,
        ward_id: &str,
        reading: &PollutantReading,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError>;
}

/// `SQLite`-backed [`NarrativeStore`].
pub struct DbNarrativeStore {
    db: Arc<dyn Database>,
}

impl DbNarrativeStore {
    /// Wraps an open database connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NarrativeStore for DbNarrativeStore {
    async fn get_narrative(&self, ward_id: &str) -> Result<Option<CachedNarrative>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT ward_id, analysis, last_updated FROM ward_narratives
                 WHERE ward_id = $1",
                &[DatabaseValue::String(ward_id.to_string())],
            )
            .await
            .map_err(|e| DbError::Database(e.to_string()))?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let analysis_json: String = row.to_value("analysis").unwrap_or_default();
        let last_updated_raw: String = row.to_value("last_updated").unwrap_or_default();

        // A corrupted row is treated as a cache miss rather than a hard
        // failure; the pipeline will regenerate and overwrite it.
        let Ok(analysis) = serde_json::from_str::<NarrativeAnalysis>(&analysis_json) else {
            log::warn!("Discarding unreadable cached narrative for ward {ward_id}");
            return Ok(None);
        };
        let Ok(last_updated) = DateTime::parse_from_rfc3339(&last_updated_raw) else {
            log::warn!("Discarding cached narrative with bad timestamp for ward {ward_id}");
            return Ok(None);
        };

        Ok(Some(CachedNarrative {
            ward_id: ward_id.to_string(),
            analysis,
            last_updated: last_updated.with_timezone(&Utc),
        }))
    }

    async fn upsert_narrative(
        &self,
        ward_id: &str,
        analysis: &NarrativeAnalysis,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let analysis_json = serde_json::to_string(analysis)?;

        self.db
            .exec_raw_params(
                "INSERT INTO ward_narratives (ward_id, analysis, last_updated)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (ward_id) DO UPDATE SET
                   analysis = excluded.analysis,
                   last_updated = excluded.last_updated",
                &[
                    DatabaseValue::String(ward_id.to_string()),
                    DatabaseValue::String(analysis_json),
                    DatabaseValue::String(timestamp.to_rfc3339()),
                ],
            )
            .await
            .map_err(|e| DbError::Database(e.to_string()))?;

        Ok(())
    }

    async fn bulk_upsert_narratives(
        &self,
        entries: &[(String, NarrativeAnalysis)],
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError> {
        for (ward_id, analysis) in entries {
            self.upsert_narrative(ward_id, analysis, timestamp).await?;
        }
        Ok(())
    }

    async fn get_latest_pollutants(
        &self,
        ward_id: &str,
    ) -> Result<Option<PollutantReading>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT reading FROM ward_pollutants WHERE ward_id = $1",
                &[DatabaseValue::String(ward_id.to_string())],
            )
            .await
            .map_err(|e| DbError::Database(e.to_string()))?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let reading_json: String = row.to_value("reading").unwrap_or_default();
        match serde_json::from_str(&reading_json) {
            Ok(reading) => Ok(Some(reading)),
            Err(_) => {
                log::warn!("Discarding unreadable pollutant snapshot for ward {ward_id}");
                Ok(None)
            }
        }
    }

    async fn upsert_pollutants(
        &self,
        ward_id: &str,
        reading: &PollutantReading,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let reading_json = serde_json::to_string(reading)?;

        self.db
            .exec_raw_params(
                "INSERT INTO ward_pollutants (ward_id, reading, recorded_at)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (ward_id) DO UPDATE SET
                   reading = excluded.reading,
                   recorded_at = excluded.recorded_at",
                &[
                    DatabaseValue::String(ward_id.to_string()),
                    DatabaseValue::String(reading_json),
                    DatabaseValue::String(timestamp.to_rfc3339()),
                ],
            )
            .await
            .map_err(|e| DbError::Database(e.to_string()))?;

        Ok(())
    }
}
