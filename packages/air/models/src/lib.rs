#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Pollutant taxonomy and air-quality domain types.
//!
//! This crate defines the canonical types shared across the entire
//! aqi-monitor system: pollutant readings as reported by upstream
//! providers, time-series points for the history/forecast views, ward
//! identities resolved from boundary data, and the structured narrative
//! analysis produced by the AI generation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The pollutants tracked by the system.
///
/// Serialized names match the component keys used by the pollutant
/// concentration provider (`pm2_5`, `pm10`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Pollutant {
    /// Fine particulate matter (≤ 2.5 µm), µg/m³.
    Pm2_5,
    /// Coarse particulate matter (≤ 10 µm), µg/m³.
    Pm10,
    /// Nitrogen dioxide, µg/m³.
    No2,
    /// Sulphur dioxide, µg/m³.
    So2,
    /// Carbon monoxide, provider-native units (mg/m³).
    Co,
    /// Ozone, µg/m³.
    O3,
}

impl Pollutant {
    /// All tracked pollutants, in canonical order.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Pm2_5,
            Self::Pm10,
            Self::No2,
            Self::So2,
            Self::Co,
            Self::O3,
        ]
    }
}

/// A set of pollutant concentrations from a single source at a single
/// point in time.
///
/// Every field is optional — upstream providers routinely omit
/// individual pollutants, and an absent value must never crash
/// downstream computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    /// PM2.5 concentration, µg/m³.
    #[serde(default)]
    pub pm2_5: Option<f64>,
    /// PM10 concentration, µg/m³.
    #[serde(default)]
    pub pm10: Option<f64>,
    /// NO2 concentration, µg/m³.
    #[serde(default)]
    pub no2: Option<f64>,
    /// SO2 concentration, µg/m³.
    #[serde(default)]
    pub so2: Option<f64>,
    /// CO concentration, provider-native units.
    #[serde(default)]
    pub co: Option<f64>,
    /// O3 concentration, µg/m³.
    #[serde(default)]
    pub o3: Option<f64>,
}

impl PollutantReading {
    /// Returns the concentration for a single pollutant.
    #[must_use]
    pub const fn get(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm2_5 => self.pm2_5,
            Pollutant::Pm10 => self.pm10,
            Pollutant::No2 => self.no2,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
            Pollutant::O3 => self.o3,
        }
    }

    /// `true` when no pollutant has a reported concentration.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pm2_5.is_none()
            && self.pm10.is_none()
            && self.no2.is_none()
            && self.so2.is_none()
            && self.co.is_none()
            && self.o3.is_none()
    }
}

/// A ward resolved to its canonical name and representative coordinate.
///
/// Produced once per request by the geometry registry; immutable for the
/// request's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardIdentity {
    /// Stable ward identifier (e.g. `"W042"`).
    pub ward_id: String,
    /// Human-readable ward name.
    pub ward_name: String,
    /// Centroid latitude.
    pub latitude: f64,
    /// Centroid longitude.
    pub longitude: f64,
}

/// One point of an hourly history or forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Local time-of-day label (e.g. `"14:00"`).
    pub time: String,
    /// Index computed from this point's own concentrations, when
    /// computable.
    pub aqi: Option<i64>,
    /// PM2.5 concentration at this point, µg/m³.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm2_5: Option<f64>,
    /// PM10 concentration at this point, µg/m³.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10: Option<f64>,
}

/// CPCB air-quality categories, banded from the prominent-pollutant
/// index.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AqiCategory {
    /// 0-50.
    Good,
    /// 51-100.
    Satisfactory,
    /// 101-200.
    Moderate,
    /// 201-300.
    Poor,
    /// 301-400.
    VeryPoor,
    /// Above 400.
    Severe,
    /// No index could be resolved.
    #[default]
    Unknown,
}

impl AqiCategory {
    /// Bands an index value into its CPCB category.
    ///
    /// Negative values are the "unavailable" sentinel and band to
    /// [`Self::Unknown`].
    #[must_use]
    pub const fn from_index(index: i64) -> Self {
        match index {
            i64::MIN..=-1 => Self::Unknown,
            0..=50 => Self::Good,
            51..=100 => Self::Satisfactory,
            101..=200 => Self::Moderate,
            201..=300 => Self::Poor,
            301..=400 => Self::VeryPoor,
            _ => Self::Severe,
        }
    }
}

/// One emission source's contribution within a narrative analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    /// Source name (e.g. "Vehicular traffic").
    #[serde(default)]
    pub source: String,
    /// Estimated contribution to the ward's pollution, percent.
    #[serde(default)]
    pub contribution_percent: f64,
    /// The pollutant this source mainly emits.
    #[serde(default)]
    pub major_pollutant: String,
    /// Expected effect if this source were removed.
    #[serde(default)]
    pub impact_if_removed: String,
    /// What citizens can do about this source.
    #[serde(default)]
    pub citizen_mitigation: String,
    /// What the administration can do about this source.
    #[serde(default)]
    pub govt_mitigation: String,
}

/// Estimated effects of a recommended policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyEffects {
    /// Effect on pollution levels.
    #[serde(default)]
    pub pollution: String,
    /// Socio-economic effect.
    #[serde(default)]
    pub socio_economic: String,
    /// Effect on workforce productivity.
    #[serde(default)]
    pub workforce_productivity: String,
}

/// A single policy recommendation within a narrative analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecommendation {
    /// Short policy name.
    #[serde(default)]
    pub policy_name: String,
    /// What the policy entails.
    #[serde(default)]
    pub description: String,
    /// Estimated effects of enacting the policy.
    #[serde(default)]
    pub estimated_effects: PolicyEffects,
}

/// Structured AI-generated narrative analysis for one ward.
///
/// Every field defaults so a partially-populated generator response
/// still parses; downstream renderers assume the fields always exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeAnalysis {
    /// Ordered breakdown of emission sources. Contribution percentages
    /// are intended (not enforced) to sum to 100.
    #[serde(default)]
    pub source_breakdown: Vec<SourceContribution>,
    /// Health and livability impact summary.
    #[serde(default)]
    pub impact_summary: String,
    /// Policies currently in force for this area.
    #[serde(default)]
    pub active_policies: String,
    /// Ordered policy recommendations.
    #[serde(default)]
    pub policy_recommendations: Vec<PolicyRecommendation>,
    /// Set to `true` when a stale cached analysis is served because
    /// regeneration failed.
    #[serde(rename = "isOfflineData", skip_serializing_if = "Option::is_none")]
    pub is_offline_data: Option<bool>,
    /// Set when the generator reported the analysis as unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A persisted narrative analysis for one ward.
///
/// Owned exclusively by the durable store; created or overwritten by a
/// successful per-request generation or the bulk refresh job, never
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedNarrative {
    /// The ward this analysis belongs to (unique key).
    pub ward_id: String,
    /// The stored analysis.
    pub analysis: NarrativeAnalysis,
    /// When the analysis was generated.
    pub last_updated: DateTime<Utc>,
}
