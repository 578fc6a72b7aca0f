//! Scheduled bulk narrative refresh.
//!
//! The ward list is tiled into equal slots across the day; each tick
//! regenerates one slot's wards with a single batched generation call
//! so every narrative is rewritten roughly once per day regardless of
//! request traffic.

use aqi_monitor_ai::narrative::{build_batch_prompt, extract_json_array};
use aqi_monitor_ai::providers::TextGenerator;
use aqi_monitor_air_models::{NarrativeAnalysis, PollutantReading, WardIdentity};
use aqi_monitor_database::NarrativeStore;
use aqi_monitor_geometry::WardRegistry;
use chrono::Utc;
use serde::Deserialize;

use crate::ReportError;

/// One element of the batched generation response.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    ward_id: String,
    analysis: Option<NarrativeAnalysis>,
}

/// Computes the half-open ward range `(start, count)` owned by `slot`
/// out of `slots_per_day` when tiling `total` wards.
///
/// Remainder wards go to the earlier slots, so every slot differs from
/// its neighbors by at most one ward and the union of all slots covers
/// the full list exactly once.
#[must_use]
pub const fn segment_bounds(slot: usize, slots_per_day: usize, total: usize) -> (usize, usize) {
    if slots_per_day == 0 || total == 0 {
        return (0, 0);
    }
    let slot = slot % slots_per_day;
    let base = total / slots_per_day;
    let remainder = total % slots_per_day;

    let count = if slot < remainder { base + 1 } else { base };
    let start = if slot < remainder {
        slot * (base + 1)
    } else {
        remainder * (base + 1) + (slot - remainder) * base
    };
    (start, count)
}

/// Regenerates the narratives for `count` wards starting at `start` in
/// registry order, persisting them with a single timestamp.
///
/// Wards the generator omits (or returns without an analysis body) keep
/// their previous narrative; only returned entries matching a requested
/// ward are written. Returns how many narratives were stored.
///
/// # Errors
///
/// * `ReportError::BatchGeneration` when the generation call fails or
///   its response contains no JSON array.
/// * `ReportError::Store` when persisting the results fails.
pub async fn refresh_segment(
    store: &dyn NarrativeStore,
    generator: &dyn TextGenerator,
    registry: &WardRegistry,
    start: usize,
    count: usize,
) -> Result<usize, ReportError> {
    let wards: Vec<&WardIdentity> = registry.all().iter().skip(start).take(count).collect();
    if wards.is_empty() {
        return Ok(0);
    }

    let mut inputs: Vec<(WardIdentity, Option<PollutantReading>)> =
        Vec::with_capacity(wards.len());
    for ward in &wards {
        let reading = match store.get_latest_pollutants(&ward.ward_id).await {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("No pollutant snapshot for ward {}: {e}", ward.ward_id);
                None
            }
        };
        inputs.push(((*ward).clone(), reading));
    }

    let prompt = build_batch_prompt(&inputs);
    let response =
        generator
            .generate(&prompt)
            .await
            .map_err(|e| ReportError::BatchGeneration {
                message: e.to_string(),
            })?;

    let array = extract_json_array(&response).ok_or_else(|| ReportError::BatchGeneration {
        message: "response contains no JSON array".to_string(),
    })?;

    let entries: Vec<BatchEntry> =
        serde_json::from_str(array).map_err(|e| ReportError::BatchGeneration {
            message: format!("unparsable batch response: {e}"),
        })?;

    let requested: std::collections::BTreeSet<&str> =
        wards.iter().map(|w| w.ward_id.as_str()).collect();

    let updates: Vec<(String, NarrativeAnalysis)> = entries
        .into_iter()
        .filter(|entry| requested.contains(entry.ward_id.as_str()))
        .filter_map(|entry| entry.analysis.map(|analysis| (entry.ward_id, analysis)))
        .collect();

    if updates.len() < wards.len() {
        log::warn!(
            "Batch refresh returned {} of {} requested wards",
            updates.len(),
            wards.len()
        );
    }

    store.bulk_upsert_narratives(&updates, Utc::now()).await?;

    Ok(updates.len())
}
