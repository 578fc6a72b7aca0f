//! Narrative cache state machine.
//!
//! Evaluated per request: a fresh cached narrative is served directly;
//! a stale or missing one triggers a regeneration attempt, persisting
//! on success; any failure falls back to the stale copy (tagged as
//! offline data) or, with nothing cached, to the fixed placeholder.
//! This boundary never fails — every path produces a usable
//! [`NarrativeAnalysis`].

use aqi_monitor_ai::narrative::{mark_offline, parse_analysis, placeholder_analysis};
use aqi_monitor_ai::providers::TextGenerator;
use aqi_monitor_air_models::{NarrativeAnalysis, PollutantReading, WardIdentity};
use aqi_monitor_database::NarrativeStore;
use chrono::Utc;

use crate::FreshnessPolicy;

/// Resolves the narrative to serve for one ward request.
///
/// Two simultaneous requests for the same stale ward may both trigger
/// generation; last write wins in the store, which is acceptable for
/// advisory content.
pub async fn resolve_narrative(
    store: &dyn NarrativeStore,
    generator: &dyn TextGenerator,
    policy: FreshnessPolicy,
    ward: &WardIdentity,
    aqi: i64,
    reading: &PollutantReading,
) -> NarrativeAnalysis {
    let now = Utc::now();

    let cached = match store.get_narrative(&ward.ward_id).await {
        Ok(cached) => cached,
        Err(e) => {
            log::error!("Narrative lookup failed for ward {}: {e}", ward.ward_id);
            None
        }
    };

    if let Some(cached) = &cached
        && policy.is_fresh(cached.last_updated, now)
    {
        log::debug!("Serving fresh cached narrative for ward {}", ward.ward_id);
        return cached.analysis.clone();
    }

    let prompt = aqi_monitor_ai::narrative::build_ward_prompt(&ward.ward_name, aqi, reading);

    match generator.generate(&prompt).await {
        Ok(response) => match parse_analysis(&response) {
            Ok(analysis) => {
                if let Err(e) = store.upsert_narrative(&ward.ward_id, &analysis, now).await {
                    // Serving the fresh result still beats failing; the
                    // next request will just regenerate.
                    log::error!("Failed to persist narrative for ward {}: {e}", ward.ward_id);
                }
                analysis
            }
            Err(e) => {
                log::warn!(
                    "Unusable generation response for ward {}: {e}",
                    ward.ward_id
                );
                stale_or_placeholder(cached.as_ref().map(|c| &c.analysis))
            }
        },
        Err(e) => {
            log::warn!("Narrative generation failed for ward {}: {e}", ward.ward_id);
            stale_or_placeholder(cached.as_ref().map(|c| &c.analysis))
        }
    }
}

/// The fallback chain tail: a stale cached analysis tagged as offline
/// data, or the placeholder when nothing is cached.
fn stale_or_placeholder(cached: Option<&NarrativeAnalysis>) -> NarrativeAnalysis {
    cached.map_or_else(placeholder_analysis, mark_offline)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use aqi_monitor_ai::AiError;
    use aqi_monitor_air_models::CachedNarrative;
    use aqi_monitor_database::DbError;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};

    use super::*;

    /// In-memory store fake.
    #[derive(Default)]
    struct MemoryStore {
        narratives: Mutex<BTreeMap<String, CachedNarrative>>,
    }

    impl MemoryStore {
        fn with_narrative(ward_id: &str, age: Duration) -> Self {
            let store = Self::default();
            let analysis = NarrativeAnalysis {
                impact_summary: "cached summary".to_string(),
                ..Default::default()
            };
            store.narratives.lock().unwrap().insert(
                ward_id.to_string(),
                CachedNarrative {
                    ward_id: ward_id.to_string(),
                    analysis,
                    last_updated: Utc::now() - age,
                },
            );
            store
        }
    }

    #[async_trait]
    impl NarrativeStore for MemoryStore {
        async fn get_narrative(&self, ward_id: &str) -> Result<Option<CachedNarrative>, DbError> {
            Ok(self.narratives.lock().unwrap().get(ward_id).cloned())
        }

        async fn upsert_narrative(
            &self,
            ward_id: &str,
            analysis: &NarrativeAnalysis,
            timestamp: DateTime<Utc>,
        ) -> Result<(), DbError> {
            self.narratives.lock().unwrap().insert(
                ward_id.to_string(),
                CachedNarrative {
                    ward_id: ward_id.to_string(),
                    analysis: analysis.clone(),
                    last_updated: timestamp,
                },
            );
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
            _ward_id: &str,
        ) -> Result<Option<PollutantReading>, DbError> {
            Ok(None)
        }

        async fn upsert_pollutants(
            &self,
            _ward_id: &str,
            _reading: &PollutantReading,
            _timestamp: DateTime<Utc>,
        ) -> Result<(), DbError> {
            Ok(())
        }
    }

    /// Generator fake that counts calls and returns a canned response.
    struct CountingGenerator {
        calls: AtomicUsize,
        response: Result<String, ()>,
    }

    impl CountingGenerator {
        fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Ok(r#"{"impact_summary": "freshly generated"}"#.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Err(()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map_err(|()| AiError::Provider {
                    message: "simulated outage".to_string(),
                })
        }
    }

    fn ward() -> WardIdentity {
        WardIdentity {
            ward_id: "W1".to_string(),
            ward_name: "Dwarka".to_string(),
            latitude: 28.59,
            longitude: 77.05,
        }
    }

    #[tokio::test]
    async fn fresh_cache_skips_generation() {
        let store = MemoryStore::with_narrative("W1", Duration::hours(1));
        let generator = CountingGenerator::succeeding();

        let analysis = resolve_narrative(
            &store,
            &generator,
            FreshnessPolicy::default(),
            &ward(),
            117,
            &PollutantReading::default(),
        )
        .await;

        assert_eq!(generator.call_count(), 0);
        assert_eq!(analysis.impact_summary, "cached summary");
        assert!(analysis.is_offline_data.is_none());
    }

    #[tokio::test]
    async fn stale_cache_triggers_generation_and_persists() {
        let store = MemoryStore::with_narrative("W1", Duration::hours(25));
        let generator = CountingGenerator::succeeding();

        let analysis = resolve_narrative(
            &store,
            &generator,
            FreshnessPolicy::default(),
            &ward(),
            117,
            &PollutantReading::default(),
        )
        .await;

        assert_eq!(generator.call_count(), 1);
        assert_eq!(analysis.impact_summary, "freshly generated");

        let persisted = store.get_narrative("W1").await.unwrap().unwrap();
        assert_eq!(persisted.analysis.impact_summary, "freshly generated");
        assert!(FreshnessPolicy::default().is_fresh(persisted.last_updated, Utc::now()));
    }

    #[tokio::test]
    async fn failed_generation_serves_stale_tagged_offline() {
        let store = MemoryStore::with_narrative("W1", Duration::hours(25));
        let generator = CountingGenerator::failing();

        let analysis = resolve_narrative(
            &store,
            &generator,
            FreshnessPolicy::default(),
            &ward(),
            117,
            &PollutantReading::default(),
        )
        .await;

        assert_eq!(analysis.is_offline_data, Some(true));
        assert_eq!(analysis.impact_summary, "cached summary");

        // The stored record itself is not mutated by serving it.
        let stored = store.get_narrative("W1").await.unwrap().unwrap();
        assert!(stored.analysis.is_offline_data.is_none());
    }

    #[tokio::test]
    async fn failed_generation_without_cache_serves_placeholder() {
        let store = MemoryStore::default();
        let generator = CountingGenerator::failing();

        let analysis = resolve_narrative(
            &store,
            &generator,
            FreshnessPolicy::default(),
            &ward(),
            117,
            &PollutantReading::default(),
        )
        .await;

        assert!(!analysis.impact_summary.is_empty());
        assert!(!analysis.active_policies.is_empty());
        assert!(analysis.error.is_some());
    }

    #[tokio::test]
    async fn unparsable_response_falls_back() {
        let store = MemoryStore::with_narrative("W1", Duration::hours(25));
        let generator = CountingGenerator {
            calls: AtomicUsize::new(0),
            response: Ok("I'm sorry, I can't produce JSON today".to_string()),
        };

        let analysis = resolve_narrative(
            &store,
            &generator,
            FreshnessPolicy::default(),
            &ward(),
            117,
            &PollutantReading::default(),
        )
        .await;

        assert_eq!(analysis.is_offline_data, Some(true));
    }
}
