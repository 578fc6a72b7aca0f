#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ward boundary registry.
//!
//! Loads the ward-boundary `GeoJSON` file once at startup, computes a
//! representative centroid per ward, and provides id → [`WardIdentity`]
//! lookups for the report pipeline. Polygon geometry is treated as a
//! black box — only the centroid and the feature properties are
//! consumed.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use aqi_monitor_air_models::WardIdentity;
use geo::Centroid;
use geojson::GeoJson;
use thiserror::Error;

/// Errors that can occur while loading ward boundaries.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Boundary file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Boundary file is not valid `GeoJSON`.
    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Boundary file parsed but contained no usable ward features.
    #[error("No ward features found in boundary file")]
    Empty,
}

/// Property keys checked (in order) for the ward identifier.
const WARD_ID_KEYS: &[&str] = &["ward_id", "WARD_NO", "Ward_No", "wardId"];

/// Property keys checked (in order) for the ward name.
const WARD_NAME_KEYS: &[&str] = &["ward_name", "WARD_NAME", "Ward_Name", "wardName"];

/// In-memory registry of all wards, loaded once at process start.
///
/// Insertion order follows the boundary file and is stable, which the
/// bulk refresh job relies on to segment the ward list.
pub struct WardRegistry {
    wards: Vec<WardIdentity>,
    by_id: BTreeMap<String, usize>,
}

impl WardRegistry {
    /// Loads the registry from a ward-boundary `GeoJSON` file.
    ///
    /// Features with missing properties or degenerate geometry are
    /// skipped with a warning rather than failing the load.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be read, is not valid
    /// `GeoJSON`, or yields no usable ward features.
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let raw = std::fs::read_to_string(path)?;
        let registry = Self::from_geojson(&raw)?;
        log::info!(
            "Loaded {} wards from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Builds the registry from raw `GeoJSON` text.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the text is not valid `GeoJSON` or yields
    /// no usable ward features.
    pub fn from_geojson(raw: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = GeoJson::from_str(raw)? else {
            return Err(GeoError::Empty);
        };

        let mut wards = Vec::with_capacity(collection.features.len());
        let mut by_id = BTreeMap::new();

        for feature in collection.features {
            let Some(properties) = &feature.properties else {
                log::warn!("Skipping ward feature without properties");
                continue;
            };

            let Some(ward_id) = property_string(properties, WARD_ID_KEYS) else {
                log::warn!("Skipping ward feature without a ward id");
                continue;
            };

            let ward_name =
                property_string(properties, WARD_NAME_KEYS).unwrap_or_else(|| ward_id.clone());

            let Some(centroid) = feature
                .geometry
                .as_ref()
                .and_then(|g| geo::Geometry::<f64>::try_from(&g.value).ok())
                .and_then(|g| g.centroid())
            else {
                log::warn!("Skipping ward {ward_id}: no computable centroid");
                continue;
            };

            if by_id.contains_key(&ward_id) {
                log::warn!("Duplicate ward id {ward_id}, keeping first occurrence");
                continue;
            }

            by_id.insert(ward_id.clone(), wards.len());
            wards.push(WardIdentity {
                ward_id,
                ward_name,
                latitude: centroid.y(),
                longitude: centroid.x(),
            });
        }

        if wards.is_empty() {
            return Err(GeoError::Empty);
        }

        Ok(Self { wards, by_id })
    }

    /// Looks up a ward by its identifier.
    #[must_use]
    pub fn lookup(&self, ward_id: &str) -> Option<&WardIdentity> {
        self.by_id.get(ward_id).map(|&idx| &self.wards[idx])
    }

    /// All wards, in the stable order of the boundary file.
    #[must_use]
    pub fn all(&self) -> &[WardIdentity] {
        &self.wards
    }

    /// Number of wards in the registry.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.wards.len()
    }

    /// `true` when the registry holds no wards.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }
}

/// Reads the first present key from a feature's properties, accepting
/// both string and numeric values (boundary exports disagree on types).
fn property_string(
    properties: &serde_json::Map<String, serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    keys.iter().find_map(|key| match properties.get(*key) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
