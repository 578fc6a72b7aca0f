#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Upstream air-quality data providers.
//!
//! Each provider implements a trait seam so the report pipeline can be
//! exercised against in-memory fakes. Production implementations talk
//! to the AQICN station feed ([`aqicn`]) and the `OpenWeather` air
//! pollution API ([`openweather`]). The [`gather`] module fans out to
//! all four upstream calls concurrently and settles every branch
//! independently — one provider failing never aborts the others.

pub mod aqicn;
pub mod gather;
pub mod openweather;

use aqi_monitor_air_models::PollutantReading;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during upstream fetches.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The per-branch deadline elapsed before the provider responded.
    #[error("Upstream call timed out")]
    Timeout,

    /// The provider returned a non-success HTTP status.
    #[error("Upstream returned HTTP {code}")]
    Status {
        /// The HTTP status code.
        code: u16,
    },

    /// The provider responded but the payload was not usable.
    #[error("Malformed upstream payload: {message}")]
    Malformed {
        /// Description of what was wrong.
        message: String,
    },
}

/// A live observation from the station-based feed provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveFeed {
    /// The provider's own pre-computed index, when present and numeric.
    pub aqi: Option<i64>,
    /// Reporting station name.
    pub station: Option<String>,
    /// Observation time as reported by the provider.
    pub observed_at: Option<String>,
    /// Per-pollutant station readings.
    pub reading: PollutantReading,
}

/// One timestamped sample from the pollutant provider's history or
/// forecast lists.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Unix timestamp, seconds.
    pub dt: i64,
    /// Pollutant concentrations at this timestamp.
    pub components: PollutantReading,
}

/// Station-based live-feed provider.
#[async_trait]
pub trait LiveFeedSource: Send + Sync {
    /// Fetches the live observation nearest to a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the request fails or the payload is
    /// malformed.
    async fn fetch(&self, lat: f64, lon: f64) -> Result<LiveFeed, UpstreamError>;
}

/// Pollutant-concentration provider (current, history, forecast).
#[async_trait]
pub trait PollutantSource: Send + Sync {
    /// Fetches the current pollutant concentrations at a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the request fails or the payload is
    /// malformed.
    async fn current(&self, lat: f64, lon: f64) -> Result<PollutantReading, UpstreamError>;

    /// Fetches hourly historical samples between two Unix timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the request fails or the payload is
    /// malformed.
    async fn history(
        &self,
        lat: f64,
        lon: f64,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawSample>, UpstreamError>;

    /// Fetches hourly forecast samples.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the request fails or the payload is
    /// malformed.
    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<RawSample>, UpstreamError>;
}
