#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The ward air-quality report pipeline.
//!
//! Ties the geometry registry, upstream gatherer, index calculator,
//! narrative cache, and durable store into the single-ward
//! request/response flow ([`service`]), with a bounded fast cache in
//! front ([`fast_cache`]) and a periodic batched narrative refresh
//! ([`refresh`]) behind.

pub mod fast_cache;
pub mod narrative;
pub mod refresh;
pub mod service;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub use service::{WardReport, WardReportService};

/// Errors surfaced to the transport layer by the report pipeline.
///
/// Partial upstream failures and narrative generation failures are
/// recovered internally and never appear here.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The ward identifier was missing or blank.
    #[error("Ward identifier must not be empty")]
    InvalidWard,

    /// The ward identifier has no geometry match.
    #[error("Unknown ward: {ward_id}")]
    WardNotFound {
        /// The requested identifier.
        ward_id: String,
    },

    /// The durable store failed.
    #[error("Store error: {0}")]
    Store(#[from] aqi_monitor_database::DbError),

    /// The batched narrative generation failed.
    #[error("Batch generation failed: {message}")]
    BatchGeneration {
        /// Description of what went wrong.
        message: String,
    },
}

/// How long a cached narrative stays fresh before a regeneration
/// attempt is triggered.
///
/// The per-request path and the bulk refresh schedule both derive from
/// this single policy value — the freshness window is deliberately not
/// duplicated per code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Maximum narrative age before regeneration.
    pub max_age: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(24),
        }
    }
}

impl FreshnessPolicy {
    /// `true` when a narrative generated at `last_updated` is still
    /// fresh at `now`.
    #[must_use]
    pub fn is_fresh(&self, last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_updated) < self.max_age
    }
}
