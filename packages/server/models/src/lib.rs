#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the AQI monitor server.
//!
//! These types are serialized to JSON for the REST API. They are
//! separate from the internal report types to allow independent
//! evolution of the API contract.

use aqi_monitor_air_models::{
    AqiCategory, NarrativeAnalysis, PollutantReading, TimeSeriesPoint,
};
use aqi_monitor_report::WardReport;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// A ward analysis report as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiWardReport {
    /// Always `true` on this response shape.
    pub success: bool,
    /// Human-readable ward name.
    pub ward: String,
    /// Canonical ward identifier.
    pub ward_id: String,
    /// Resolved air quality index, or -1 when unavailable.
    pub current_aqi: i64,
    /// CPCB category band for the resolved index.
    pub aqi_category: AqiCategory,
    /// Equivalent daily cigarette exposure.
    pub cigarettes_count: f64,
    /// Latest per-pollutant concentrations.
    pub raw_pollutants: PollutantReading,
    /// Trailing 24-hour hourly series.
    pub history_24h: Vec<TimeSeriesPoint>,
    /// Next 24-hour hourly forecast series.
    pub forecast_24h: Vec<TimeSeriesPoint>,
    /// Narrative analysis for the ward.
    pub analysis: NarrativeAnalysis,
}

impl From<WardReport> for ApiWardReport {
    fn from(report: WardReport) -> Self {
        Self {
            success: true,
            ward: report.ward,
            ward_id: report.ward_id,
            current_aqi: report.current_aqi,
            aqi_category: report.aqi_category,
            cigarettes_count: report.cigarettes_count,
            raw_pollutants: report.raw_pollutants,
            history_24h: report.history_24h,
            forecast_24h: report.forecast_24h,
            analysis: report.analysis,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `false` on this response shape.
    pub success: bool,
    /// Human-readable error message.
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
